use crate::metrics::{Counter, Histogram, MetricsError, Registry};
use crate::settings::metrics::{MetricsSettings, PathLabel};

use super::StatusClass;

/// HTTP metric instruments
///
/// Created once from the process registry and injected into
/// [`super::http_metrics_middleware`] as state. Names below carry the
/// configured namespace, `http` by default:
/// - `http_requests_total` (Counter): requests by method and path
/// - `http_response_time_seconds` (Histogram): response time by method, path and status_code
/// - `http_status_total` (Counter): responses by method, path and status_code
/// - `http_status_{2xx,3xx,4xx,5xx,other}_total` (Counter): responses per status class by path
#[derive(Clone, Debug)]
pub struct HttpMetrics {
    pub requests_total: Counter,
    pub response_time: Histogram,
    pub status_total: Counter,
    status_classes: [Counter; 5],
    path_label: PathLabel,
}

impl HttpMetrics {
    pub fn new(registry: &Registry, settings: &MetricsSettings) -> Result<Self, MetricsError> {
        let requests_total = registry.counter(
            &settings.metric_name("requests_total"),
            "Total number of HTTP requests",
        )?;
        let response_time = registry.histogram_with_buckets(
            &settings.metric_name("response_time_seconds"),
            "HTTP response time in seconds",
            "s",
            settings.buckets.clone(),
        )?;
        let status_total = registry.counter(
            &settings.metric_name("status_total"),
            "Total number of HTTP status codes",
        )?;

        let class_counter = |class: StatusClass| {
            registry.counter(
                &settings.metric_name(&class.counter_base_name()),
                &format!("Total number of {class} responses"),
            )
        };
        let status_classes = [
            class_counter(StatusClass::Success)?,
            class_counter(StatusClass::Redirection)?,
            class_counter(StatusClass::ClientError)?,
            class_counter(StatusClass::ServerError)?,
            class_counter(StatusClass::Other)?,
        ];

        Ok(Self {
            requests_total,
            response_time,
            status_total,
            status_classes,
            path_label: settings.path_label,
        })
    }

    pub fn status_class(&self, class: StatusClass) -> &Counter {
        &self.status_classes[class.index()]
    }

    pub fn path_label(&self) -> PathLabel {
        self.path_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InstrumentKind;

    #[test]
    fn test_registers_all_instruments() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry, &MetricsSettings::default()).unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .instruments
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "http_requests_total",
                "http_response_time_seconds",
                "http_status_2xx_total",
                "http_status_3xx_total",
                "http_status_4xx_total",
                "http_status_5xx_total",
                "http_status_other_total",
                "http_status_total",
            ]
        );
        assert_eq!(metrics.response_time.unit(), "s");
        assert_eq!(
            metrics.status_class(StatusClass::ClientError).name(),
            "http_status_4xx_total"
        );
    }

    #[test]
    fn test_empty_namespace_uses_bare_names() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry, &MetricsSettings::with_namespace("")).unwrap();
        assert_eq!(metrics.requests_total.name(), "requests_total");
        assert_eq!(metrics.response_time.name(), "response_time_seconds");
        assert_eq!(
            metrics.status_class(StatusClass::Success).name(),
            "status_2xx_total"
        );
    }

    #[test]
    fn test_creating_twice_reuses_instruments() {
        let registry = Registry::new();
        let settings = MetricsSettings::default();
        let first = HttpMetrics::new(&registry, &settings).unwrap();
        let second = HttpMetrics::new(&registry, &settings).unwrap();

        first.requests_total.add(1, &Default::default());
        assert_eq!(second.requests_total.total(), 1);
    }

    #[test]
    fn test_conflicting_registration_fails() {
        let registry = Registry::new();
        registry
            .histogram("http_requests_total", "", "s")
            .unwrap();

        let err = HttpMetrics::new(&registry, &MetricsSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::KindMismatch {
                existing: InstrumentKind::Histogram,
                requested: InstrumentKind::Counter,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_namespace_fails() {
        let registry = Registry::new();
        let err = HttpMetrics::new(&registry, &MetricsSettings::with_namespace("my-app"))
            .unwrap_err();
        assert!(matches!(err, MetricsError::InvalidName(_)));
    }
}
