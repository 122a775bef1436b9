use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

use super::RequestObservation;

/// Response body that finishes its observation when the body completes
///
/// End of stream and body errors finish the observation while the body is
/// polled. A body dropped half way (client went away) finishes it on drop.
pub struct ObservedBody {
    inner: Body,
    observation: RequestObservation,
}

impl ObservedBody {
    pub fn new(inner: Body, observation: RequestObservation) -> Self {
        Self { inner, observation }
    }
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.observation.finish();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMetrics, ObservationState};
    use crate::metrics::Registry;
    use crate::settings::metrics::MetricsSettings;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    fn observation() -> (HttpMetrics, RequestObservation) {
        let metrics = HttpMetrics::new(&Registry::new(), &MetricsSettings::default()).unwrap();
        let observation = RequestObservation::begin(metrics.clone(), "GET", "/");
        observation.respond(StatusCode::OK);
        (metrics, observation)
    }

    #[tokio::test]
    async fn test_end_of_stream_finishes_observation() {
        let (metrics, observation) = observation();
        let body = ObservedBody::new(Body::from("hello"), observation);

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");
        assert_eq!(metrics.response_time.total_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_body_is_not_finished() {
        let (metrics, observation) = observation();
        let body = ObservedBody::new(Body::from("hello"), observation);

        assert_eq!(body.observation.state(), ObservationState::Handling);
        assert_eq!(metrics.response_time.total_count(), 0);

        drop(body);
        assert_eq!(metrics.response_time.total_count(), 1);
    }

    #[tokio::test]
    async fn test_body_is_passed_through() {
        let (_metrics, observation) = observation();
        let body = ObservedBody::new(Body::empty(), observation);
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }
}
