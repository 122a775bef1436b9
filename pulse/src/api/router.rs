use axum::routing::get;
use axum::Router;
use pulse_core::http::instrument;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::api::error::{handle_panic, not_found_handler};
use crate::api::handlers::health::health_checker_handler;
use crate::api::handlers::scrape::scrape_handler;
use crate::app_state::SharedAppState;

pub struct ApiRoutes;

impl ApiRoutes {
    pub fn create(state: SharedAppState) -> Router {
        Self::with_routes(state, Router::new())
    }

    /// Metered application router with `routes` merged next to the built-in ones
    ///
    /// Everything merged here, the 404 fallback included, passes the request
    /// metrics middleware. Panics are turned into 500 responses outside of it,
    /// so they are still observed as server errors.
    pub fn with_routes(state: SharedAppState, routes: Router<SharedAppState>) -> Router {
        let router = Router::new()
            .route("/health", get(health_checker_handler))
            .merge(routes)
            .fallback(not_found_handler)
            .with_state(state.clone());

        instrument(router, state.http_metrics.clone())
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
    }
}

pub struct MetricsRoutes;

impl MetricsRoutes {
    /// Scrape router, served on its own listener and not metered
    pub fn create(state: SharedAppState) -> Router {
        let path = state.settings.metrics.scrape.path.clone();
        Router::new()
            .route(&path, get(scrape_handler))
            .with_state(state)
    }
}
