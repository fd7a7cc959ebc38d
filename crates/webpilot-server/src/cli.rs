use clap::Parser;
use std::path::PathBuf;
use webpilot_core::config::AppConfig;

/// Browser automation task service
#[derive(Debug, Parser)]
#[command(name = "webpilot-server", version, about)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(short, long, env = "WEBPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database file
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long)]
    pub headed: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.db_path {
            config.storage.db_path = Some(path.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}
