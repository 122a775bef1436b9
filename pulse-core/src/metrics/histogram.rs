use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::mirror::HistogramMirror;
use super::registry::RegistryState;
use super::{report, LabelSet, MetricsError};

/// Bucketed distribution of `f64` observations, one per label combination
///
/// Buckets are upper-inclusive (`le`), with an implicit `+Inf` bucket at the end.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

struct HistogramInner {
    name: String,
    description: String,
    unit: String,
    bounds: Vec<f64>,
    series: DashMap<LabelSet, HistogramSeries>,
    state: Arc<RegistryState>,
    mirror: Option<Box<dyn HistogramMirror>>,
}

/// Per series accumulators. Bucket counts are not cumulative here.
struct HistogramSeries {
    buckets: Box<[AtomicU64]>,
    sum_bits: AtomicU64,
}

impl HistogramSeries {
    fn new(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count).map(|_| AtomicU64::new(0)).collect(),
            sum_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn observe(&self, bounds: &[f64], value: f64) {
        let index = bounds.partition_point(|bound| *bound < value);
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
        // fetch_update retries until no concurrent writer interfered
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    fn snapshot(&self, bounds: &[f64]) -> HistogramSnapshot {
        let mut cumulative = 0;
        let buckets = bounds
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .zip(self.buckets.iter())
            .map(|(bound, count)| {
                cumulative += count.load(Ordering::Relaxed);
                (bound, cumulative)
            })
            .collect();

        HistogramSnapshot {
            count: cumulative,
            sum: f64::from_bits(self.sum_bits.load(Ordering::Relaxed)),
            buckets,
        }
    }
}

/// Point-in-time view of one histogram series
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    /// `(upper bound, cumulative count)`, the last bound is `f64::INFINITY`
    pub buckets: Vec<(f64, u64)>,
}

impl HistogramSnapshot {
    /// Cumulative count of observations `<= le`, if `le` is a bucket bound
    pub fn bucket(&self, le: f64) -> Option<u64> {
        self.buckets
            .iter()
            .find(|(bound, _)| *bound == le)
            .map(|(_, count)| *count)
    }
}

impl Histogram {
    pub(crate) fn new(
        name: String,
        description: String,
        unit: String,
        bounds: Vec<f64>,
        state: Arc<RegistryState>,
        mirror: Option<Box<dyn HistogramMirror>>,
    ) -> Self {
        Self {
            inner: Arc::new(HistogramInner {
                name,
                description,
                unit,
                bounds,
                series: DashMap::new(),
                state,
                mirror,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn unit(&self) -> &str {
        &self.inner.unit
    }

    pub fn bounds(&self) -> &[f64] {
        &self.inner.bounds
    }

    /// Record `value` into the series of `labels`, logging and dropping it on error
    pub fn record(&self, value: f64, labels: &LabelSet) {
        if let Err(e) = self.try_record(value, labels) {
            report(&e);
        }
    }

    pub fn try_record(&self, value: f64, labels: &LabelSet) -> Result<(), MetricsError> {
        let inner = &self.inner;
        if inner.state.is_closed() {
            return Err(MetricsError::Closed(inner.name.clone()));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(MetricsError::InvalidValue {
                name: inner.name.clone(),
                value,
            });
        }

        if let Some(series) = inner.series.get(labels) {
            series.observe(&inner.bounds, value);
        } else {
            labels.validate()?;
            inner
                .series
                .entry(labels.clone())
                .or_insert_with(|| HistogramSeries::new(inner.bounds.len() + 1))
                .observe(&inner.bounds, value);
        }

        if let Some(mirror) = &inner.mirror {
            mirror.record(value, labels);
        }
        Ok(())
    }

    pub fn snapshot(&self, labels: &LabelSet) -> Option<HistogramSnapshot> {
        self.inner
            .series
            .get(labels)
            .map(|series| series.snapshot(&self.inner.bounds))
    }

    /// Number of observations over all series
    pub fn total_count(&self) -> u64 {
        self.inner
            .series
            .iter()
            .map(|entry| entry.value().snapshot(&self.inner.bounds).count)
            .sum()
    }

    /// All series sorted by labels
    pub fn series(&self) -> Vec<(LabelSet, HistogramSnapshot)> {
        let mut series: Vec<_> = self
            .inner
            .series
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().snapshot(&self.inner.bounds),
                )
            })
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("name", &self.inner.name)
            .field("unit", &self.inner.unit)
            .field("bounds", &self.inner.bounds)
            .field("series", &self.inner.series.len())
            .finish()
    }
}
