use super::InstrumentKind;

/// Errors raised while creating instruments or recording into them
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// Instrument name does not match `[a-zA-Z_:][a-zA-Z0-9_:]*`
    #[error("Invalid metric name: {0:?}")]
    InvalidName(String),

    /// Label key does not match `[a-zA-Z_][a-zA-Z0-9_]*` or uses the reserved `__` prefix
    #[error("Invalid label key: {0:?}")]
    InvalidLabelKey(String),

    /// Observation is negative, NaN or infinite
    #[error("Invalid value {value} for {name}")]
    InvalidValue { name: String, value: f64 },

    /// Histogram bounds are empty, not finite or not strictly increasing
    #[error("Invalid buckets for {name}: {reason}")]
    InvalidBuckets { name: String, reason: &'static str },

    /// The name is already registered with another instrument kind
    #[error("Metric {name} is already registered as a {existing}, cannot register it as a {requested}")]
    KindMismatch {
        name: String,
        existing: InstrumentKind,
        requested: InstrumentKind,
    },

    /// The registry was shut down
    #[error("Metric registry is shut down, dropping update for {0}")]
    Closed(String),
}

impl MetricsError {
    /// Whether the error stems from bad input rather than registry state
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidName(_)
                | Self::InvalidLabelKey(_)
                | Self::InvalidValue { .. }
                | Self::InvalidBuckets { .. }
        )
    }
}
