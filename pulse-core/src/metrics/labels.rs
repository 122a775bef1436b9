use std::collections::BTreeMap;
use std::fmt;

use super::MetricsError;

/// Key/value tags identifying one series of an instrument
///
/// Keys are kept sorted, so two sets holding the same pairs address the same
/// series no matter in which order the pairs were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check every key against the Prometheus label name rules
    pub fn validate(&self) -> Result<(), MetricsError> {
        match self.0.keys().find(|key| !is_valid_label_key(key)) {
            Some(key) => Err(MetricsError::InvalidLabelKey(key.clone())),
            None => Ok(()),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Formats as `{key="value",...}`, empty sets format as nothing
impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}=\"{}\"", escape_label_value(value))?;
        }
        f.write_str("}")
    }
}

pub(crate) fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn is_valid_label_key(key: &str) -> bool {
    let mut chars = key.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    valid_start && !key.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Metric names additionally allow `:`
pub(crate) fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start =
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':');
    valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = LabelSet::new().with("method", "GET").with("path", "/api");
        let b = LabelSet::new().with("path", "/api").with("method", "GET");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{method=\"GET\",path=\"/api\"}");
    }

    #[test]
    fn test_from_array() {
        let labels = LabelSet::from([("path", "/health")]);
        assert_eq!(labels.get("path"), Some("/health"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(LabelSet::from([("status_code", "200")]).validate().is_ok());
        assert!(LabelSet::from([("_private", "x")]).validate().is_ok());
        assert_eq!(
            LabelSet::from([("0day", "x")]).validate(),
            Err(MetricsError::InvalidLabelKey("0day".to_string()))
        );
        assert!(LabelSet::from([("status-code", "x")]).validate().is_err());
        assert!(LabelSet::from([("__name__", "x")]).validate().is_err());
        assert!(LabelSet::from([("", "x")]).validate().is_err());
    }

    #[test]
    fn test_escaping() {
        let labels = LabelSet::from([("path", "a\"b\\c\nd")]);
        assert_eq!(labels.to_string(), "{path=\"a\\\"b\\\\c\\nd\"}");
    }

    #[test]
    fn test_empty_display() {
        assert_eq!(LabelSet::new().to_string(), "");
    }

    #[test]
    fn test_metric_names() {
        assert!(is_valid_metric_name("http_requests_total"));
        assert!(is_valid_metric_name("ns:requests"));
        assert!(!is_valid_metric_name("http.requests"));
        assert!(!is_valid_metric_name("1requests"));
        assert!(!is_valid_metric_name(""));
    }
}
