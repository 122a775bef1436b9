//! pulse server library
//!
//! The binary wires these modules together. They are public so the
//! end-to-end tests can build the same routers.

pub mod api;
pub mod app_state;
pub mod http;
pub mod init_telemetry;
#[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
pub mod metrics;
pub mod settings;
pub mod stop_flag;

pub use app_state::AppState;
