// Entry point for the pingcast API server

use pingcast::{Config, PingDispatcher, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Path to a JSON configuration file; defaults apply when unset
const ENV_CONFIG: &str = "PINGCAST_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pingcast=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match std::env::var(ENV_CONFIG) {
        Ok(path) => {
            tracing::info!(path = %path, "Loading configuration");
            Config::from_json_file(&path)?
        }
        Err(_) => Config::default(),
    };
    config.apply_env()?;

    tracing::info!(
        services = config.services.len(),
        public_url = %config.feed.public_base_url,
        "Configuration loaded"
    );

    // Validates the configuration before anything binds
    let dispatcher = Arc::new(PingDispatcher::new(&config)?);
    pingcast::api::start_api_server(dispatcher, Arc::new(config)).await
}
