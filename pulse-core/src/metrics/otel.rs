//! OpenTelemetry mirror, enabled with the `otel` feature

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

use super::mirror::{CounterMirror, HistogramMirror, MetricsMirror};
use super::LabelSet;

fn key_values(labels: &LabelSet) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(key, value)| KeyValue::new(key.to_string(), value.to_string()))
        .collect()
}

impl MetricsMirror for Meter {
    fn counter(&self, name: &str, description: &str) -> Box<dyn CounterMirror> {
        Box::new(
            self.u64_counter(name.to_string())
                .with_description(description.to_string())
                .build(),
        )
    }

    fn histogram(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        bounds: &[f64],
    ) -> Box<dyn HistogramMirror> {
        Box::new(
            self.f64_histogram(name.to_string())
                .with_description(description.to_string())
                .with_unit(unit.to_string())
                .with_boundaries(bounds.to_vec())
                .build(),
        )
    }
}

impl CounterMirror for Counter<u64> {
    fn add(&self, delta: u64, labels: &LabelSet) {
        Counter::add(self, delta, &key_values(labels));
    }
}

impl HistogramMirror for Histogram<f64> {
    fn record(&self, value: f64, labels: &LabelSet) {
        Histogram::record(self, value, &key_values(labels));
    }
}
