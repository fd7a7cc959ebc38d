use anyhow::{Context, Result};
use std::path::PathBuf;

const WEBPILOT_DIR_ENV: &str = "WEBPILOT_DIR";
const WEBPILOT_DIR: &str = ".webpilot";
const DB_FILE: &str = "webpilot.db";

/// Data directory: `$WEBPILOT_DIR` if set, else `~/.webpilot`
pub fn resolve_webpilot_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(WEBPILOT_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join(WEBPILOT_DIR))
        .context("Failed to determine home directory")
}

/// Default database path inside the data directory
pub fn default_db_path() -> Result<PathBuf> {
    Ok(resolve_webpilot_dir()?.join(DB_FILE))
}
