//! Browser session service.
//!
//! One [`BrowserService`] owns at most one live browser page. The page is
//! launched on first use and reused afterwards; callers obtain exclusive
//! access through a [`BrowserLease`], so only one task drives the page at a
//! time.

mod chromium;
mod config;
mod driver;
pub mod mock;
mod service;

pub use chromium::{ChromiumLauncher, ChromiumPage};
pub use config::BrowserConfig;
pub use driver::{BrowserLauncher, PageDriver};
pub use service::{BrowserLease, BrowserService};
