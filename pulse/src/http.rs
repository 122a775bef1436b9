use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::router::{ApiRoutes, MetricsRoutes};
use crate::app_state::SharedAppState;
use crate::stop_flag::StopFlag;

pub type ServerHandle = JoinHandle<anyhow::Result<()>>;

pub async fn setup_http_server(
    app_state: SharedAppState,
    bind_address: &str,
) -> anyhow::Result<ServerHandle> {
    let app = ApiRoutes::create(app_state.clone());

    let listener = TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind API server to {bind_address}"))?;
    info!("API server listening at {}", bind_address);

    Ok(spawn_server("API server", listener, app, app_state.stop_flag.clone()))
}

/// Start the scrape listener, `None` when scraping is disabled
pub async fn setup_scrape_server(app_state: SharedAppState) -> anyhow::Result<Option<ServerHandle>> {
    let scrape = &app_state.settings.metrics.scrape;
    if !scrape.enabled {
        info!("Metrics scrape endpoint is disabled");
        return Ok(None);
    }
    if !scrape.path.starts_with('/') {
        anyhow::bail!("metrics.scrape.path must start with '/', got '{}'", scrape.path);
    }

    let app = MetricsRoutes::create(app_state.clone());
    let listener = TcpListener::bind(&scrape.bind_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", scrape.bind_address))?;
    info!(
        "Metrics available at http://{}{}",
        scrape.bind_address, scrape.path
    );

    Ok(Some(spawn_server(
        "Metrics server",
        listener,
        app,
        app_state.stop_flag.clone(),
    )))
}

fn spawn_server(
    name: &'static str,
    listener: TcpListener,
    app: Router,
    stop_flag: StopFlag,
) -> ServerHandle {
    tokio::spawn(async move {
        info!("Starting {}", name);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_flag.wait().await;
                info!("Stop flag was set, shutting down {} gracefully", name);
            })
            .await
            .with_context(|| format!("{name} failed"))?;
        info!("{} is down", name);
        Ok(())
    })
}
