use axum::{response::IntoResponse, Json};

pub async fn health_checker_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
