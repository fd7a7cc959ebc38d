//! Deterministic in-process page driver for tests.

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::BrowserConfig;
use crate::driver::{BrowserLauncher, PageDriver};

/// Eight-byte PNG signature returned by mock screenshots.
pub const MOCK_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Observations shared between a mock driver and the test that built it.
#[derive(Default)]
pub struct MockPageState {
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    closed: AtomicBool,
}

impl MockPageState {
    /// Every driver call in order, formatted as `op:argument`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Highest number of driver calls observed in flight at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Scriptable page driver
#[derive(Clone, Default)]
pub struct MockPageDriver {
    state: Arc<MockPageState>,
    failing_selectors: HashSet<String>,
    texts: HashMap<String, Vec<String>>,
    fail_navigation: bool,
    delay: Duration,
}

impl MockPageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make click, fill and extract on `selector` fail
    pub fn with_failing_selector(mut self, selector: impl Into<String>) -> Self {
        self.failing_selectors.insert(selector.into());
        self
    }

    /// Text returned when extracting `selector`
    pub fn with_text(mut self, selector: impl Into<String>, texts: Vec<String>) -> Self {
        self.texts.insert(selector.into(), texts);
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Delay every call, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn state(&self) -> Arc<MockPageState> {
        self.state.clone()
    }

    async fn record(&self, call: String) {
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.state.calls.lock().push(call);
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_selector(&self, selector: &str) -> Result<()> {
        if self.failing_selectors.contains(selector) {
            bail!("no element matches '{selector}'");
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockPageDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}")).await;
        if self.fail_navigation {
            bail!("navigation to {url} failed");
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{selector}")).await;
        self.check_selector(selector)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("fill:{selector}={value}")).await;
        self.check_selector(selector)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.record("scroll".to_string()).await;
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.record(format!("screenshot:{full_page}")).await;
        Ok(MOCK_PNG.to_vec())
    }

    async fn extract_text(&self, selector: &str) -> Result<Vec<String>> {
        self.record(format!("extract:{selector}")).await;
        self.check_selector(selector)?;
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out clones of one mock driver
pub struct MockLauncher {
    driver: MockPageDriver,
    launches: AtomicUsize,
    failures_left: AtomicUsize,
}

impl MockLauncher {
    pub fn new(driver: MockPageDriver) -> Self {
        Self {
            driver,
            launches: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Fail the first `times` launches
    pub fn failing_times(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _config: &BrowserConfig) -> Result<Box<dyn PageDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            bail!("failed to launch browser: chrome not found");
        }
        Ok(Box::new(self.driver.clone()))
    }
}
