use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::labels::is_valid_metric_name;
use super::mirror::MetricsMirror;
use super::{Counter, Histogram, HistogramSnapshot, LabelSet, MetricsError};
use crate::settings::metrics::DEFAULT_BUCKETS;

/// State shared between the registry and every instrument it created
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    closed: AtomicBool,
}

impl RegistryState {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Histogram,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Counter => f.write_str("counter"),
            InstrumentKind::Histogram => f.write_str("histogram"),
        }
    }
}

#[derive(Clone)]
enum Instrument {
    Counter(Counter),
    Histogram(Histogram),
}

impl Instrument {
    fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::Counter(_) => InstrumentKind::Counter,
            Instrument::Histogram(_) => InstrumentKind::Histogram,
        }
    }
}

/// Owner of all metric instruments of the process
///
/// Create it once at startup and hand clones to whoever needs to register or
/// read instruments. Instruments are identified by name: asking for an
/// existing name returns the existing instrument, asking for it with another
/// kind fails with [`MetricsError::KindMismatch`].
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    instruments: DashMap<String, Instrument>,
    state: Arc<RegistryState>,
    default_buckets: Vec<f64>,
    mirror: Option<Box<dyn MetricsMirror>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    default_buckets: Option<Vec<f64>>,
    mirror: Option<Box<dyn MetricsMirror>>,
}

impl RegistryBuilder {
    /// Bounds used by [`Registry::histogram`]
    pub fn default_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.default_buckets = Some(buckets);
        self
    }

    /// Forward every update to `mirror` as well
    pub fn mirror(mut self, mirror: impl MetricsMirror + 'static) -> Self {
        self.mirror = Some(Box::new(mirror));
        self
    }

    /// Shorthand for mirroring into an OpenTelemetry meter
    #[cfg(feature = "otel")]
    pub fn with_meter(self, meter: opentelemetry::metrics::Meter) -> Self {
        self.mirror(meter)
    }

    pub fn build(self) -> Registry {
        Registry {
            inner: Arc::new(RegistryInner {
                instruments: DashMap::new(),
                state: Arc::new(RegistryState::default()),
                default_buckets: self
                    .default_buckets
                    .unwrap_or_else(|| DEFAULT_BUCKETS.to_vec()),
                mirror: self.mirror,
            }),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up or create the counter `name`
    pub fn counter(&self, name: &str, description: &str) -> Result<Counter, MetricsError> {
        validate_name(name)?;
        match self.inner.instruments.entry(name.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                Instrument::Counter(counter) => Ok(counter.clone()),
                other => Err(MetricsError::KindMismatch {
                    name: name.to_string(),
                    existing: other.kind(),
                    requested: InstrumentKind::Counter,
                }),
            },
            Entry::Vacant(entry) => {
                let mirror = self
                    .inner
                    .mirror
                    .as_ref()
                    .map(|mirror| mirror.counter(name, description));
                let counter = Counter::new(
                    name.to_string(),
                    description.to_string(),
                    self.inner.state.clone(),
                    mirror,
                );
                entry.insert(Instrument::Counter(counter.clone()));
                debug!("Registered counter {}", name);
                Ok(counter)
            }
        }
    }

    /// Look up or create the histogram `name` with the registry's default buckets
    pub fn histogram(
        &self,
        name: &str,
        description: &str,
        unit: &str,
    ) -> Result<Histogram, MetricsError> {
        self.histogram_with_buckets(name, description, unit, self.inner.default_buckets.clone())
    }

    /// Look up or create the histogram `name`
    ///
    /// When the histogram already exists it is returned unchanged, including
    /// the buckets it was created with.
    pub fn histogram_with_buckets(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        buckets: Vec<f64>,
    ) -> Result<Histogram, MetricsError> {
        validate_name(name)?;
        match self.inner.instruments.entry(name.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                Instrument::Histogram(histogram) => Ok(histogram.clone()),
                other => Err(MetricsError::KindMismatch {
                    name: name.to_string(),
                    existing: other.kind(),
                    requested: InstrumentKind::Histogram,
                }),
            },
            Entry::Vacant(entry) => {
                validate_buckets(name, &buckets)?;
                let mirror = self
                    .inner
                    .mirror
                    .as_ref()
                    .map(|mirror| mirror.histogram(name, description, unit, &buckets));
                let histogram = Histogram::new(
                    name.to_string(),
                    description.to_string(),
                    unit.to_string(),
                    buckets,
                    self.inner.state.clone(),
                    mirror,
                );
                entry.insert(Instrument::Histogram(histogram.clone()));
                debug!("Registered histogram {}", name);
                Ok(histogram)
            }
        }
    }

    pub fn get_counter(&self, name: &str) -> Option<Counter> {
        match self.inner.instruments.get(name)?.value() {
            Instrument::Counter(counter) => Some(counter.clone()),
            Instrument::Histogram(_) => None,
        }
    }

    pub fn get_histogram(&self, name: &str) -> Option<Histogram> {
        match self.inner.instruments.get(name)?.value() {
            Instrument::Histogram(histogram) => Some(histogram.clone()),
            Instrument::Counter(_) => None,
        }
    }

    /// Stop accepting updates. Values recorded so far stay readable.
    pub fn shutdown(&self) {
        if !self.inner.state.is_closed() {
            self.inner.state.close();
            info!(
                "Metric registry shut down with {} instruments",
                self.inner.instruments.len()
            );
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.is_closed()
    }

    /// Every instrument and series, instruments sorted by name
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut instruments: Vec<InstrumentSnapshot> = self
            .inner
            .instruments
            .iter()
            .map(|entry| match entry.value() {
                Instrument::Counter(counter) => InstrumentSnapshot {
                    name: counter.name().to_string(),
                    description: counter.description().to_string(),
                    unit: String::new(),
                    data: InstrumentData::Counter(counter.series()),
                },
                Instrument::Histogram(histogram) => InstrumentSnapshot {
                    name: histogram.name().to_string(),
                    description: histogram.description().to_string(),
                    unit: histogram.unit().to_string(),
                    data: InstrumentData::Histogram(histogram.series()),
                },
            })
            .collect();
        instruments.sort_by(|a, b| a.name.cmp(&b.name));
        RegistrySnapshot { instruments }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("instruments", &self.inner.instruments.len())
            .field("closed", &self.inner.state.is_closed())
            .field("mirrored", &self.inner.mirror.is_some())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<(), MetricsError> {
    if is_valid_metric_name(name) {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(name.to_string()))
    }
}

fn validate_buckets(name: &str, buckets: &[f64]) -> Result<(), MetricsError> {
    let reason = if buckets.is_empty() {
        Some("no bucket bounds given")
    } else if buckets.iter().any(|b| !b.is_finite()) {
        Some("bounds must be finite")
    } else if buckets.windows(2).any(|w| w[0] >= w[1]) {
        Some("bounds must be strictly increasing")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(MetricsError::InvalidBuckets {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub instruments: Vec<InstrumentSnapshot>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<&InstrumentSnapshot> {
        self.instruments.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentSnapshot {
    pub name: String,
    pub description: String,
    /// Empty for counters
    pub unit: String,
    pub data: InstrumentData,
}

#[derive(Debug, Clone)]
pub enum InstrumentData {
    Counter(Vec<(LabelSet, u64)>),
    Histogram(Vec<(LabelSet, HistogramSnapshot)>),
}
