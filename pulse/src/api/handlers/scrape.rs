use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use pulse_core::metrics::exposition;

use crate::app_state::SharedAppState;

/// Current registry contents in Prometheus text format
pub async fn scrape_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    let body = exposition::render(&state.registry.snapshot());
    ([(CONTENT_TYPE, exposition::CONTENT_TYPE)], body)
}
