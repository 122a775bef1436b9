//! Per-request HTTP metrics for axum routers

mod body;
mod instruments;
mod middleware;
mod observation;
mod path;
mod status_class;

pub use body::ObservedBody;
pub use instruments::HttpMetrics;
pub use middleware::{http_metrics_middleware, instrument};
pub use observation::{ObservationState, Outcome, RequestObservation, ABORTED_STATUS};
pub use path::{normalize_path, UNMATCHED_ROUTE};
pub use status_class::StatusClass;
