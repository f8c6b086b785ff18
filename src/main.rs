//! RankAlert — Binary Entrypoint
//! Boots the background scheduler and the Axum HTTP surface.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rankalert::api::{create_router, AppState};
use rankalert::config::AppConfig;
use rankalert::ingest::ProviderRegistry;
use rankalert::metrics::Metrics;
use rankalert::notify::onesignal::OneSignalClient;
use rankalert::pipeline::Pipeline;
use rankalert::scheduler::spawn_scheduler;
use rankalert::store::Store;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rankalert=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;

    let metrics = Metrics::init();

    let store = Store::connect(&cfg.database_path).await?;
    store.init_schema().await?;

    let push = Arc::new(OneSignalClient::new(
        cfg.onesignal_app_id.clone(),
        cfg.onesignal_api_key.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(
        store,
        ProviderRegistry::builtin(),
        push,
        cfg.significance_threshold,
    ));

    spawn_scheduler(pipeline.clone(), cfg.check_interval_secs);

    let router = create_router(AppState { pipeline }).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "rankalert listening");
    axum::serve(listener, router).await?;
    Ok(())
}
