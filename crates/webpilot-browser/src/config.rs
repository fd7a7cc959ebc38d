use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Browser launch and timeout settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Upper bound for page navigations
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Upper bound for every other page operation
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// Chrome/Chromium binary; auto-detected when unset
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_action_timeout_ms() -> u64 {
    5_000
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            action_timeout_ms: default_action_timeout_ms(),
            executable_path: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
        }
    }
}
