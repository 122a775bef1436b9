use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::mirror::CounterMirror;
use super::registry::RegistryState;
use super::{report, LabelSet, MetricsError};

/// Monotonic counter, one `u64` per label combination
///
/// Cloning is cheap, all clones update the same series.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    name: String,
    description: String,
    series: DashMap<LabelSet, AtomicU64>,
    state: Arc<RegistryState>,
    mirror: Option<Box<dyn CounterMirror>>,
}

impl Counter {
    pub(crate) fn new(
        name: String,
        description: String,
        state: Arc<RegistryState>,
        mirror: Option<Box<dyn CounterMirror>>,
    ) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                name,
                description,
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

    /// Add `delta` to the series of `labels`, logging and dropping the update on error
    pub fn add(&self, delta: u64, labels: &LabelSet) {
        if let Err(e) = self.try_add(delta, labels) {
            report(&e);
        }
    }

    pub fn try_add(&self, delta: u64, labels: &LabelSet) -> Result<(), MetricsError> {
        let inner = &self.inner;
        if inner.state.is_closed() {
            return Err(MetricsError::Closed(inner.name.clone()));
        }

        // Fast path: series exists, so its labels were validated already
        if let Some(value) = inner.series.get(labels) {
            value.fetch_add(delta, Ordering::Relaxed);
        } else {
            labels.validate()?;
            inner
                .series
                .entry(labels.clone())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(delta, Ordering::Relaxed);
        }

        if let Some(mirror) = &inner.mirror {
            mirror.add(delta, labels);
        }
        Ok(())
    }

    /// Current value of one series, 0 if it was never touched
    pub fn value(&self, labels: &LabelSet) -> u64 {
        self.inner
            .series
            .get(labels)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over all series
    pub fn total(&self) -> u64 {
        self.inner
            .series
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum()
    }

    /// All series sorted by labels
    pub fn series(&self) -> Vec<(LabelSet, u64)> {
        let mut series: Vec<_> = self
            .inner
            .series
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.inner.name)
            .field("series", &self.inner.series.len())
            .finish()
    }
}
