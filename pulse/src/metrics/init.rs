use anyhow::Result;
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    Resource,
};
use std::time::Duration;
use tracing::info;

use crate::settings::telemetry::{OtlpProtocol, TelemetrySettings};

fn build_exporter(protocol: OtlpProtocol, endpoint: String) -> Result<MetricExporter> {
    match protocol {
        #[cfg(feature = "telemetry-grpc")]
        OtlpProtocol::Grpc => Ok(MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?),
        #[cfg(feature = "telemetry-http")]
        OtlpProtocol::Http => Ok(MetricExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?),
        #[allow(unreachable_patterns)]
        protocol => anyhow::bail!("OTLP protocol {} is not enabled in this build", protocol),
    }
}

/// Initialize OpenTelemetry metrics with an OTLP exporter
///
/// Installs the global MeterProvider and returns it together with the
/// meter the registry mirrors into. The provider has to be shut down on exit
/// to flush the last export.
pub fn init_meter_provider(settings: &TelemetrySettings) -> Result<(SdkMeterProvider, Meter)> {
    let endpoint = settings.resolve_endpoint();
    info!(
        "Exporting metrics via OTLP/{} to {} every {}s",
        settings.protocol, endpoint, settings.export_interval_secs
    );

    let exporter = build_exporter(settings.protocol, endpoint)?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(settings.export_interval_secs))
        .build();

    let resource = Resource::builder()
        .with_service_name(settings.service_name.clone())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build();

    global::set_meter_provider(provider.clone());

    let meter = provider.meter(env!("CARGO_PKG_NAME"));
    Ok((provider, meter))
}
