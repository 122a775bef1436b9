use serde::Deserialize;
use std::fmt;

/// OTLP transport used for metric export
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtlpProtocol {
    #[serde(rename = "grpc")]
    #[default]
    Grpc,
    #[serde(rename = "http")]
    Http,
}

impl OtlpProtocol {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            OtlpProtocol::Grpc => "http://otel-collector:4317",
            OtlpProtocol::Http => "http://otel-collector:4318/v1/metrics",
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtlpProtocol::Grpc => f.write_str("grpc"),
            OtlpProtocol::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct TelemetrySettings {
    /// Push metrics to an OTLP collector
    #[serde(default)]
    pub metrics: bool,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    pub endpoint: Option<String>,
    #[serde(default = "default_export_interval_secs")]
    pub export_interval_secs: u64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_export_interval_secs() -> u64 {
    10
}

fn default_service_name() -> String {
    "sample-app".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            metrics: false,
            protocol: OtlpProtocol::default(),
            endpoint: None,
            export_interval_secs: default_export_interval_secs(),
            service_name: default_service_name(),
        }
    }
}

impl TelemetrySettings {
    /// Collector endpoint: configured, then `OTEL_EXPORTER_OTLP_ENDPOINT`, then the protocol default
    pub fn resolve_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .or_else(|| std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok())
            .unwrap_or_else(|| self.protocol.default_endpoint().to_string())
    }

    pub(crate) fn clear_endpoint(&mut self) {
        self.endpoint = None;
    }
}
