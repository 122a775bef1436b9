//! Forwarding of registry updates to a second metrics backend

use super::LabelSet;

/// Backend that receives a copy of every update made through the registry
///
/// The registry asks the mirror for a matching instrument whenever it creates
/// one of its own. With the `otel` feature an OpenTelemetry `Meter` implements
/// this, so the same data is exported over OTLP.
pub trait MetricsMirror: Send + Sync {
    fn counter(&self, name: &str, description: &str) -> Box<dyn CounterMirror>;

    fn histogram(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        bounds: &[f64],
    ) -> Box<dyn HistogramMirror>;
}

pub trait CounterMirror: Send + Sync {
    fn add(&self, delta: u64, labels: &LabelSet);
}

pub trait HistogramMirror: Send + Sync {
    fn record(&self, value: f64, labels: &LabelSet);
}
