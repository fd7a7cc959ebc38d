use reqwest::Client;
use std::time::Duration;

const DISABLE_SYSTEM_PROXY_ENV: &str = "WEBPILOT_DISABLE_SYSTEM_PROXY";

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    let builder = Client::builder().timeout(timeout);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };

    builder.build().unwrap_or_else(|error| {
        tracing::warn!(%error, "Failed to build HTTP client, using defaults");
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
