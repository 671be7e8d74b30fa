use tracing_subscriber::EnvFilter;
use wisp_relay::{config::RelayConfig, server::RelayServer};

/// `LOG_LEVEL` (e.g. "debug", "info") takes precedence over the usual
/// `RUST_LOG` so operators have one knob alongside `HOST`/`PORT`.
fn env_filter() -> EnvFilter {
    match std::env::var("LOG_LEVEL") {
        Ok(level) => EnvFilter::new(level),
        Err(_) => EnvFilter::from_default_env(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();

    let config = RelayConfig::load()?;
    let server = RelayServer::new(config);
    server.run().await
}
