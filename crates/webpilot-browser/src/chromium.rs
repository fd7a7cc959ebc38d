//! Chromium page driver over the DevTools protocol.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::BrowserConfig;
use crate::driver::{BrowserLauncher, PageDriver};

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; }";
const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Launches a local Chrome/Chromium process
#[derive(Debug, Default, Clone)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &BrowserConfig) -> Result<Box<dyn PageDriver>> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .viewport(Viewport {
                width: config.window_width,
                height: config.window_height,
                ..Default::default()
            })
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }

        let chrome_config = builder
            .build()
            .map_err(|error| anyhow!("failed to build browser config: {error}"))?;

        tracing::info!(
            headless = config.headless,
            executable = ?config.executable_path,
            "launching chrome"
        );

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .context("failed to launch browser")?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        tracing::info!("browser launched");
        Ok(Box::new(ChromiumPage {
            browser: Mutex::new(browser),
            page,
            handler_task: Some(handler_task),
        }))
    }
}

/// A page in a browser process owned by this driver
pub struct ChromiumPage {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches '{selector}'"))?;
        element
            .click()
            .await
            .with_context(|| format!("click on '{selector}' failed"))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches '{selector}'"))?;
        element.call_js_fn(CLEAR_VALUE_JS, false).await?;
        element
            .click()
            .await?
            .type_str(value)
            .await
            .with_context(|| format!("typing into '{selector}' failed"))?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate(SCROLL_TO_BOTTOM_JS)
            .await
            .context("scroll failed")?;
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page.screenshot(params).await.context("screenshot failed")
    }

    async fn extract_text(&self, selector: &str) -> Result<Vec<String>> {
        let script = text_content_script(selector)?;
        self.page
            .evaluate(script)
            .await
            .with_context(|| format!("text extraction failed for '{selector}'"))?
            .into_value::<Vec<String>>()
            .context("text extraction returned a non-list value")
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.browser.get_mut().close().await;
        if let Some(handler_task) = self.handler_task.take() {
            handler_task.abort();
        }
        result.context("browser close returned error")?;
        tracing::info!("browser closed");
        Ok(())
    }
}

/// Script reading `textContent` of every element matching `selector`,
/// hidden ones included
fn text_content_script(selector: &str) -> Result<String> {
    let selector_literal = serde_json::to_string(selector)?;
    Ok(format!(
        "Array.from(document.querySelectorAll({selector_literal}), el => el.textContent ?? '')"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_script_quotes_selector() {
        let script = text_content_script(r#"a[title="x"], .price"#).unwrap();
        assert_eq!(
            script,
            r#"Array.from(document.querySelectorAll("a[title=\"x\"], .price"), el => el.textContent ?? '')"#
        );
    }
}
