use anyhow::Result;
use async_trait::async_trait;

use crate::config::BrowserConfig;

/// Operations on a single live browser page.
///
/// Selectors are CSS selectors; a comma-separated list matches the first
/// element any alternative selects.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Replace the value of an input with `value`
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Capture a PNG screenshot
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Text content of every element matching `selector`
    async fn extract_text(&self, selector: &str) -> Result<Vec<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Starts a browser and opens the page a session drives
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &BrowserConfig) -> Result<Box<dyn PageDriver>>;
}
