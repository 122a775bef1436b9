use axum::{
    body::Body,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

use super::{HttpMetrics, ObservedBody, Outcome, RequestObservation};

/// HTTP metrics middleware tracking request counts, response times and status classes
///
/// The request is counted on arrival. Duration and status are recorded once
/// the response body has been sent, failed or was dropped, so the response is
/// handed back to the server without waiting for any bookkeeping. A panicking
/// handler is recorded as a 500 and the panic is resumed for outer layers to
/// handle.
pub async fn http_metrics_middleware(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let path = metrics.path_label().label_for(&request);
    let observation = RequestObservation::begin(metrics, request.method().as_str(), path);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            observation.respond(response.status());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(ObservedBody::new(body, observation)))
        }
        Err(panic) => {
            observation.complete(Outcome::HandlerFailed);
            std::panic::resume_unwind(panic)
        }
    }
}

/// Meter every route currently registered on `router`
///
/// Routes added after this call are not metered.
pub fn instrument<S>(router: Router<S>, metrics: HttpMetrics) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(
        metrics,
        http_metrics_middleware,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusClass;
    use crate::metrics::{LabelSet, Registry};
    use crate::settings::metrics::{MetricsSettings, PathLabel};
    use axum::{
        http::{header::LOCATION, StatusCode},
        response::IntoResponse,
        routing::get,
        Json,
    };
    use futures_util::future::join_all;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    fn test_metrics(settings: &MetricsSettings) -> HttpMetrics {
        HttpMetrics::new(&Registry::new(), settings).unwrap()
    }

    fn test_router(metrics: HttpMetrics) -> Router {
        let router = Router::new()
            .route("/api/hello", get(|| async { Json("Hello World!") }))
            .route(
                "/api/redirect",
                get(|| async { (StatusCode::FOUND, [(LOCATION, "/api/hello")]) }),
            )
            .route(
                "/api/not-found",
                get(|| async { (StatusCode::NOT_FOUND, "Not Found") }),
            )
            .route(
                "/api/error",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
            )
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    "done"
                }),
            )
            .route("/api/panic", get(|| async {
            #[allow(unreachable_code)]
            {
                panic!("handler failed");
                ()
            }
        }))
            .route(
                "/users/{id}",
                get(|| async { StatusCode::NO_CONTENT.into_response() }),
            );
        instrument(router, metrics).layer(CatchPanicLayer::new())
    }

    async fn call(router: &Router, uri: &str) -> (StatusCode, Response) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        (response.status(), response)
    }

    /// Send a request and read the whole body, completing the observation
    async fn get_status(router: &Router, uri: &str) -> StatusCode {
        let (status, response) = call(router, uri).await;
        response.into_body().collect().await.unwrap();
        status
    }

    fn request_labels(path: &str) -> LabelSet {
        LabelSet::from([("method", "GET"), ("path", path)])
    }

    fn status_labels(path: &str, status: &str) -> LabelSet {
        request_labels(path).with("status_code", status)
    }

    fn path_labels(path: &str) -> LabelSet {
        LabelSet::from([("path", path)])
    }

    #[tokio::test]
    async fn test_success_is_counted_once() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        assert_eq!(get_status(&router, "/api/hello").await, StatusCode::OK);

        assert_eq!(metrics.requests_total.value(&request_labels("/api/hello")), 1);
        let snapshot = metrics
            .response_time
            .snapshot(&status_labels("/api/hello", "200"))
            .unwrap();
        assert_eq!(snapshot.count, 1);
        assert!(snapshot.sum >= 0.0);
        assert_eq!(
            metrics
                .status_class(StatusClass::Success)
                .value(&path_labels("/api/hello")),
            1
        );
        for class in [
            StatusClass::Redirection,
            StatusClass::ClientError,
            StatusClass::ServerError,
            StatusClass::Other,
        ] {
            assert_eq!(metrics.status_class(class).total(), 0, "{class}");
        }
    }

    #[tokio::test]
    async fn test_not_found_route() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        assert_eq!(
            get_status(&router, "/api/not-found").await,
            StatusCode::NOT_FOUND
        );

        assert_eq!(
            metrics.requests_total.value(&request_labels("/api/not-found")),
            1
        );
        assert_eq!(
            metrics
                .response_time
                .snapshot(&status_labels("/api/not-found", "404"))
                .unwrap()
                .count,
            1
        );
        assert_eq!(
            metrics
                .status_class(StatusClass::ClientError)
                .value(&path_labels("/api/not-found")),
            1
        );
        assert_eq!(metrics.status_class(StatusClass::Success).total(), 0);
    }

    #[tokio::test]
    async fn test_redirect_route() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        let (status, response) = call(&router, "/api/redirect").await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/api/hello");
        response.into_body().collect().await.unwrap();

        assert_eq!(
            metrics
                .status_total
                .value(&status_labels("/api/redirect", "302")),
            1
        );
        assert_eq!(
            metrics
                .status_class(StatusClass::Redirection)
                .value(&path_labels("/api/redirect")),
            1
        );
        assert_eq!(metrics.status_class(StatusClass::Success).total(), 0);
    }

    #[tokio::test]
    async fn test_server_error_route() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        assert_eq!(
            get_status(&router, "/api/error").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            metrics
                .status_class(StatusClass::ServerError)
                .value(&path_labels("/api/error")),
            1
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_is_observed_as_server_error() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        assert_eq!(
            get_status(&router, "/api/panic").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        assert_eq!(metrics.requests_total.value(&request_labels("/api/panic")), 1);
        assert_eq!(
            metrics
                .response_time
                .snapshot(&status_labels("/api/panic", "500"))
                .unwrap()
                .count,
            1
        );
        assert_eq!(metrics.status_class(StatusClass::ServerError).total(), 1);
    }

    #[tokio::test]
    async fn test_recording_waits_for_the_body() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        let (status, response) = call(&router, "/api/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metrics.requests_total.total(), 1);
        assert_eq!(metrics.response_time.total_count(), 0);

        response.into_body().collect().await.unwrap();
        assert_eq!(metrics.response_time.total_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_response_is_recorded_with_its_status() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        let (_, response) = call(&router, "/api/hello").await;
        drop(response);

        assert_eq!(
            metrics
                .response_time
                .snapshot(&status_labels("/api/hello", "200"))
                .unwrap()
                .count,
            1
        );
    }

    #[tokio::test]
    async fn test_duration_covers_handler_time() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        get_status(&router, "/api/slow").await;

        let snapshot = metrics
            .response_time
            .snapshot(&status_labels("/api/slow", "200"))
            .unwrap();
        assert_eq!(snapshot.count, 1);
        assert!(snapshot.sum >= 0.100, "duration was {}", snapshot.sum);
        assert_eq!(snapshot.bucket(0.05), Some(0));
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_not_lost() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        let statuses = join_all((0..100).map(|_| get_status(&router, "/api/hello"))).await;
        assert!(statuses.iter().all(|s| *s == StatusCode::OK));

        assert_eq!(
            metrics.requests_total.value(&request_labels("/api/hello")),
            100
        );
        assert_eq!(metrics.response_time.total_count(), 100);
        assert_eq!(metrics.status_class(StatusClass::Success).total(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_across_threads() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let router = router.clone();
                tokio::spawn(async move { get_status(&router, "/api/not-found").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::NOT_FOUND);
        }

        assert_eq!(metrics.requests_total.total(), 100);
        assert_eq!(
            metrics
                .status_class(StatusClass::ClientError)
                .value(&path_labels("/api/not-found")),
            100
        );
    }

    #[tokio::test]
    async fn test_route_template_is_used_as_path() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics.clone());

        get_status(&router, "/users/1").await;
        get_status(&router, "/users/2").await;

        assert_eq!(metrics.requests_total.value(&request_labels("/users/{id}")), 2);
        assert_eq!(metrics.requests_total.series().len(), 1);
    }

    #[tokio::test]
    async fn test_raw_path_label() {
        let metrics = test_metrics(&MetricsSettings::with_path_label(PathLabel::Raw));
        let router = test_router(metrics.clone());

        get_status(&router, "/users/1").await;
        get_status(&router, "/users/2").await;

        assert_eq!(metrics.requests_total.value(&request_labels("/users/1")), 1);
        assert_eq!(metrics.requests_total.value(&request_labels("/users/2")), 1);
    }

    #[tokio::test]
    async fn test_unmatched_requests_share_one_series() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = instrument(
            Router::new()
                .route("/api/hello", get(|| async { "hello" }))
                .fallback(|| async { StatusCode::NOT_FOUND }),
            metrics.clone(),
        );

        get_status(&router, "/does/not/exist").await;
        get_status(&router, "/neither/does/this").await;

        assert_eq!(metrics.requests_total.value(&request_labels("unmatched")), 2);
        assert_eq!(
            metrics
                .status_class(StatusClass::ClientError)
                .value(&path_labels("unmatched")),
            2
        );
    }

    #[tokio::test]
    async fn test_response_is_unchanged() {
        let metrics = test_metrics(&MetricsSettings::default());
        let router = test_router(metrics);

        let (status, response) = call(&router, "/api/hello").await;
        assert_eq!(status, StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"\"Hello World!\"");
    }

    #[tokio::test]
    async fn test_closed_registry_does_not_affect_responses() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry, &MetricsSettings::default()).unwrap();
        let router = test_router(metrics.clone());
        registry.shutdown();

        assert_eq!(get_status(&router, "/api/hello").await, StatusCode::OK);
        assert_eq!(metrics.requests_total.total(), 0);
    }
}
