use crate::AppCore;
use crate::config::ServerConfig;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::router;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl From<&ServerConfig> for HttpConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// HTTP front end of the task service
pub struct HttpServer {
    config: HttpConfig,
    core: Arc<AppCore>,
}

impl HttpServer {
    pub fn new(config: HttpConfig, core: Arc<AppCore>) -> Self {
        Self { config, core }
    }

    /// Serve until `shutdown` fires
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let app = router::build_router(self.core.clone(), &self.config);
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
