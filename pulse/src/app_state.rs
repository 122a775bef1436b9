use std::sync::Arc;

use pulse_core::http::HttpMetrics;
use pulse_core::metrics::Registry;
use tracing::info;

use crate::settings::config::Settings;
use crate::stop_flag;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub stop_flag: stop_flag::StopFlag,
    pub registry: Registry,
    pub http_metrics: HttpMetrics,
    #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
    pub meter_provider: Option<opentelemetry_sdk::metrics::SdkMeterProvider>,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    /// Build the registry and HTTP instruments for `settings`
    ///
    /// Fails when the metrics settings produce invalid instrument names or
    /// buckets. A failing OTLP setup only disables the export.
    pub fn new(settings: Settings) -> anyhow::Result<SharedAppState> {
        let builder = Registry::builder().default_buckets(settings.metrics.buckets.clone());

        #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
        let (builder, meter_provider) = Self::attach_otlp_export(builder, &settings);
        #[cfg(not(any(feature = "telemetry-grpc", feature = "telemetry-http")))]
        Self::warn_if_export_unavailable(&settings);

        let registry = builder.build();
        let http_metrics = HttpMetrics::new(&registry, &settings.metrics)?;
        info!(
            "Registered HTTP metrics with namespace '{}'",
            settings.metrics.namespace
        );

        Ok(Arc::new(AppState {
            settings,
            stop_flag: stop_flag::StopFlag::new(),
            registry,
            http_metrics,
            #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
            meter_provider,
        }))
    }

    #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
    fn attach_otlp_export(
        builder: pulse_core::metrics::RegistryBuilder,
        settings: &Settings,
    ) -> (
        pulse_core::metrics::RegistryBuilder,
        Option<opentelemetry_sdk::metrics::SdkMeterProvider>,
    ) {
        if !settings.telemetry.metrics {
            return (builder, None);
        }

        match crate::metrics::init_meter_provider(&settings.telemetry) {
            Ok((provider, meter)) => {
                info!("OpenTelemetry metrics initialized successfully");
                (builder.with_meter(meter), Some(provider))
            }
            Err(e) => {
                tracing::warn!("Failed to initialize metrics: {}", e);
                (builder, None)
            }
        }
    }

    #[cfg(not(any(feature = "telemetry-grpc", feature = "telemetry-http")))]
    fn warn_if_export_unavailable(settings: &Settings) {
        if settings.telemetry.metrics {
            tracing::warn!("telemetry.metrics is set, but this build has no OTLP support");
        }
    }

    /// Stop recording and flush the OTLP export
    pub fn shutdown(&self) {
        self.registry.shutdown();

        #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
        if let Some(provider) = &self.meter_provider {
            match provider.shutdown() {
                Ok(()) => info!("SDK shut down successfully"),
                Err(e) => tracing::error!("Error shutting down SDK: {}", e),
            }
        }
    }
}
