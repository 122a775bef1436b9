use axum::http::StatusCode;
use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::time::Instant;
use tracing::trace;

use crate::metrics::LabelSet;

use super::{HttpMetrics, StatusClass};

/// `status_code` label of requests that ended without a response
pub const ABORTED_STATUS: &str = "aborted";

const NO_STATUS: u16 = 0;

/// Lifecycle of a [`RequestObservation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObservationState {
    Arrived = 0,
    Handling = 1,
    Completing = 2,
    Recorded = 3,
}

impl ObservationState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ObservationState::Arrived,
            1 => ObservationState::Handling,
            2 => ObservationState::Completing,
            _ => ObservationState::Recorded,
        }
    }
}

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response with this status was produced
    Responded(StatusCode),
    /// The handler panicked, observed as a 500
    HandlerFailed,
    /// The request went away before any response existed
    Aborted,
}

impl Outcome {
    fn status_label(&self) -> String {
        match self {
            Outcome::Responded(status) => status.as_u16().to_string(),
            Outcome::HandlerFailed => StatusCode::INTERNAL_SERVER_ERROR.as_u16().to_string(),
            Outcome::Aborted => ABORTED_STATUS.to_string(),
        }
    }

    fn status_class(&self) -> StatusClass {
        match self {
            Outcome::Responded(status) => StatusClass::from_code(status.as_u16()),
            Outcome::HandlerFailed => StatusClass::ServerError,
            Outcome::Aborted => StatusClass::Other,
        }
    }
}

/// Timing and labels of one in-flight request
///
/// [`RequestObservation::begin`] counts the request. The first call to
/// [`RequestObservation::complete`] or [`RequestObservation::finish`] records
/// duration and status, every later call is a no-op. Dropping an observation
/// that was never completed finishes it, so every request is recorded exactly
/// once however it ends.
#[derive(Debug)]
pub struct RequestObservation {
    metrics: HttpMetrics,
    method: String,
    path: String,
    started: Instant,
    status: AtomicU16,
    state: AtomicU8,
}

impl RequestObservation {
    /// Start timing a request and increment `requests_total{method, path}`
    pub fn begin(metrics: HttpMetrics, method: impl Into<String>, path: impl Into<String>) -> Self {
        let observation = Self {
            metrics,
            method: method.into(),
            path: path.into(),
            started: Instant::now(),
            status: AtomicU16::new(NO_STATUS),
            state: AtomicU8::new(ObservationState::Arrived as u8),
        };

        let labels = LabelSet::new()
            .with("method", observation.method.as_str())
            .with("path", observation.path.as_str());
        observation.metrics.requests_total.add(1, &labels);
        observation
            .state
            .store(ObservationState::Handling as u8, Ordering::Release);

        observation
    }

    pub fn state(&self) -> ObservationState {
        ObservationState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Remember the response status, used once the response completes
    pub fn respond(&self, status: StatusCode) {
        self.status.store(status.as_u16(), Ordering::Release);
    }

    /// Complete with the status given to [`Self::respond`], or as aborted without one
    pub fn finish(&self) -> bool {
        let outcome = match self.status.load(Ordering::Acquire) {
            NO_STATUS => Outcome::Aborted,
            code => StatusCode::from_u16(code)
                .map(Outcome::Responded)
                .unwrap_or(Outcome::Aborted),
        };
        self.complete(outcome)
    }

    /// Record duration and status once
    ///
    /// Returns whether this call did the recording. Only the call that moves
    /// the state from `Handling` to `Completing` records anything.
    pub fn complete(&self, outcome: Outcome) -> bool {
        if self
            .state
            .compare_exchange(
                ObservationState::Handling as u8,
                ObservationState::Completing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        let duration = self.started.elapsed().as_secs_f64();
        let status = outcome.status_label();
        let class = outcome.status_class();

        let labels = LabelSet::new()
            .with("method", self.method.as_str())
            .with("path", self.path.as_str())
            .with("status_code", status.as_str());
        self.metrics.response_time.record(duration, &labels);
        self.metrics.status_total.add(1, &labels);
        self.metrics
            .status_class(class)
            .add(1, &LabelSet::new().with("path", self.path.as_str()));

        self.state
            .store(ObservationState::Recorded as u8, Ordering::Release);
        trace!(
            method = %self.method,
            path = %self.path,
            status = %status,
            duration,
            "Recorded request"
        );
        true
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        self.finish();
    }
}
