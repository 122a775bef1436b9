//! In-process metric registry
//!
//! Counters and histograms keyed by name, each holding one series per label
//! combination. Updates are lock free on existing series and never block on
//! I/O.

mod counter;
mod error;
pub mod exposition;
mod histogram;
mod labels;
mod mirror;
#[cfg(feature = "otel")]
mod otel;
mod registry;

use tracing::{debug, warn};

pub use counter::Counter;
pub use error::MetricsError;
pub use histogram::{Histogram, HistogramSnapshot};
pub use labels::LabelSet;
pub use mirror::{CounterMirror, HistogramMirror, MetricsMirror};
pub use registry::{
    InstrumentData, InstrumentKind, InstrumentSnapshot, Registry, RegistryBuilder,
    RegistrySnapshot,
};

/// Log a dropped update. Invalid input is worth a warning, a closed registry is expected during shutdown.
pub(crate) fn report(err: &MetricsError) {
    match err {
        MetricsError::Closed(_) => debug!("{}", err),
        _ => warn!("Dropping metric update: {}", err),
    }
}
