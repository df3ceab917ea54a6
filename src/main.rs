use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::booter::Booter;
use crate::governor_conf::get_governor_conf;
use crate::server::router;
use crate::server::types::{AppConfig, AppState};

pub mod booter;
pub mod core;
pub mod governor_conf;
pub mod server;
pub mod utils;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let limiter = get_governor_conf(config.rate_limit_burst);
    let cleanup = limiter.clone();
    // drop rate-limit state for clients that went quiet
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup.retain_recent();
        }
    });

    let port = config.port;
    let state = Arc::new(AppState::new(config)?);
    let router = router(state, limiter)?;

    Booter::new(port).await?.start(router).await
}
