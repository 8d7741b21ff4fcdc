use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod config;
mod dashboard;
mod fpl;
mod proxy;

use config::Config;
use dashboard::AppState;
use fpl::{CandidateResolver, HttpUpstream, StatsCache, StatsResolver, SystemClock};
use proxy::{ImageRelay, Passthrough};

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env win over the shell environment
    let dotenv_path = dotenvy::dotenv_override().ok();

    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Some(path) = &dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::parse();
    config.validate()?;

    let token = config.token();
    info!("FD token length: {}", token.len());
    if token.is_empty() {
        warn!("FD_TOKEN is not set; football-data.org requests will be rejected upstream");
    }

    let timeout = Duration::from_secs(config.upstream_timeout_secs);

    // Fantasy stats: candidates tried in order, results cached in one slot
    let candidates = CandidateResolver::new(&config.fpl_url, &config.fpl_mirrors);
    let resolver = StatsResolver::new(
        Arc::new(HttpUpstream::new(timeout)?),
        candidates,
        StatsCache::new(Arc::new(SystemClock)),
        chrono::Duration::seconds(config.stats_ttl_secs as i64),
    );
    info!(
        "Fantasy stats: primary {} ({} mirror(s), ttl {}s)",
        config.fpl_url,
        config.fpl_mirrors.len(),
        config.stats_ttl_secs
    );

    let rapid = match config.rapid() {
        Some(settings) => {
            info!("RapidAPI passthrough enabled: {}", settings.base);
            Some(Passthrough::rapid(&settings, timeout)?)
        }
        None => None,
    };

    let state = AppState {
        resolver,
        football_data: Passthrough::football_data(&config.football_data_url, token, timeout)?,
        rapid,
        images: ImageRelay::new(&config.image_host_url, timeout)?,
        token_len: token.len(),
    };
    let app = dashboard::router(state, &config.static_dir);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Proxy + dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
