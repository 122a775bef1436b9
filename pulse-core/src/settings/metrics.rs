use serde::Deserialize;

/// Prometheus client default buckets, in seconds.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// How the `path` label is derived from a request
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathLabel {
    /// Route template of the matched axum route, `unmatched` otherwise
    #[serde(rename = "matched_route")]
    #[default]
    MatchedRoute,
    /// Raw path with id-like segments replaced by `:id`
    #[serde(rename = "normalized")]
    Normalized,
    /// Raw request path. Only safe for small, fixed route sets.
    #[serde(rename = "raw")]
    Raw,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct ScrapeSettings {
    #[serde(default = "default_scrape_enabled")]
    pub enabled: bool,
    #[serde(default = "default_scrape_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_scrape_path")]
    pub path: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            enabled: default_scrape_enabled(),
            bind_address: default_scrape_bind_address(),
            path: default_scrape_path(),
        }
    }
}

fn default_scrape_enabled() -> bool {
    true
}

fn default_scrape_bind_address() -> String {
    "0.0.0.0:9464".to_string()
}

fn default_scrape_path() -> String {
    "/metrics".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct MetricsSettings {
    /// Prefix joined with `_` in front of every instrument name
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub path_label: PathLabel,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
    #[serde(default)]
    pub scrape: ScrapeSettings,
}

fn default_namespace() -> String {
    "http".to_string()
}

fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            path_label: PathLabel::default(),
            buckets: default_buckets(),
            scrape: ScrapeSettings::default(),
        }
    }
}

impl MetricsSettings {
    /// Settings with a different namespace, everything else default
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Settings with a different path label strategy, everything else default
    pub fn with_path_label(path_label: PathLabel) -> Self {
        Self {
            path_label,
            ..Default::default()
        }
    }

    /// Full instrument name for `base`, e.g. `http_requests_total`
    pub fn metric_name(&self, base: &str) -> String {
        if self.namespace.is_empty() {
            base.to_string()
        } else {
            format!("{}_{}", self.namespace, base)
        }
    }
}
