use config::{Config, ConfigError, Environment, File};
use pulse_core::settings::metrics::MetricsSettings;
use serde::Deserialize;
use std::env;

use super::telemetry::TelemetrySettings;

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct ApiServer {
    pub bind_address: String,
}

impl Default for ApiServer {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[allow(unused)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    pub api: ApiServer,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("PULSE")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("metrics.buckets")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("PULSE_RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("api.bind_address", "0.0.0.0:3000")?
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Self::get_environment());

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        // An endpoint of "false", "no" or "0" switches back to the fallback
        // chain, so the environment can undo an endpoint from a config file
        if settings
            .telemetry
            .endpoint
            .as_deref()
            .is_some_and(is_disabled)
        {
            settings.telemetry.clear_endpoint();
        }

        Ok(settings)
    }
}

fn is_disabled(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "no" | "false" | "0")
}
