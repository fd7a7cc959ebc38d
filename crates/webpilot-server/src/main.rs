#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast;
use webpilot_core::AppCore;
use webpilot_core::config::AppConfig;
use webpilot_core::http::{HttpConfig, HttpServer};

use cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info,webpilot_core=debug,webpilot_server=debug";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("WEBPILOT_LOG_FORMAT").is_ok_and(|format| format == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true);
    if json {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        "Starting WebPilot server"
    );

    let http_config = HttpConfig::from(&config.server);
    let core = Arc::new(AppCore::new(config).await?);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C");
        }
        let _ = shutdown_tx.send(());
    });

    let served = HttpServer::new(http_config, core.clone()).run(shutdown_rx).await;
    core.shutdown().await?;
    served?;

    tracing::info!("WebPilot server stopped");
    Ok(())
}
