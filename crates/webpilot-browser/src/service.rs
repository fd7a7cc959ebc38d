use anyhow::Result;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::chromium::ChromiumLauncher;
use crate::config::BrowserConfig;
use crate::driver::{BrowserLauncher, PageDriver};

/// Owns the single browser session of a service instance.
pub struct BrowserService {
    config: BrowserConfig,
    launcher: Arc<dyn BrowserLauncher>,
    session: Mutex<Option<Box<dyn PageDriver>>>,
    initialized: AtomicBool,
}

/// Exclusive access to the live page; released on drop.
pub struct BrowserLease<'a> {
    page: MappedMutexGuard<'a, dyn PageDriver>,
}

impl Deref for BrowserLease<'_> {
    type Target = dyn PageDriver;

    fn deref(&self) -> &Self::Target {
        &*self.page
    }
}

impl BrowserService {
    pub fn new(config: BrowserConfig) -> Self {
        Self::with_launcher(config, Arc::new(ChromiumLauncher))
    }

    pub fn with_launcher(config: BrowserConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config,
            launcher,
            session: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Wait for exclusive access to the page, launching the browser first if
    /// no session is live. A failed launch leaves the service uninitialized
    /// so the next call retries.
    pub async fn acquire(&self) -> Result<BrowserLease<'_>> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            let driver = self.launcher.launch(&self.config).await?;
            *session = Some(driver);
            self.initialized.store(true, Ordering::Release);
        }

        match MutexGuard::try_map(session, |slot| slot.as_deref_mut()) {
            Ok(page) => Ok(BrowserLease { page }),
            Err(_) => anyhow::bail!("browser session unavailable"),
        }
    }

    /// Whether a browser session is currently live
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Close the live session, waiting for any lease holder to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.initialized.store(false, Ordering::Release);
        if let Some(mut driver) = session.take() {
            driver.close().await?;
        }
        Ok(())
    }
}
