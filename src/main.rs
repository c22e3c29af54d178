use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bse_announcements::api::health::HealthState;
use bse_announcements::api::routes::{router, ApiState};
use bse_announcements::config::{Config, ParamSpace};
use bse_announcements::error::Result;
use bse_announcements::fetcher::AnnouncementFetcher;
use bse_announcements::session::HttpSession;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Portal session ---
    let session = HttpSession::new(&cfg.portal)?;
    let combos = ParamSpace::default().combinations(&cfg.portal.endpoints).len();
    info!(
        "Portal session ready: {} endpoints, {} parameter combinations, default start {}",
        cfg.portal.endpoints.len(),
        combos,
        cfg.default_start_date,
    );
    let fetcher = AnnouncementFetcher::new(session, cfg.portal.clone());

    // HTTP API server
    let api_state = ApiState {
        fetcher: Arc::new(Mutex::new(fetcher)),
        health: Arc::new(HealthState::new()),
        default_start: cfg.default_start_date,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
