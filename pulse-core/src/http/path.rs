use axum::extract::{MatchedPath, Request};

use crate::settings::metrics::PathLabel;

/// `path` label for requests that matched no route
pub const UNMATCHED_ROUTE: &str = "unmatched";

impl PathLabel {
    /// Resolve the `path` label value of `request`
    pub fn label_for(&self, request: &Request) -> String {
        match self {
            PathLabel::MatchedRoute => request
                .extensions()
                .get::<MatchedPath>()
                .map(|matched| matched.as_str().to_string())
                .unwrap_or_else(|| UNMATCHED_ROUTE.to_string()),
            PathLabel::Normalized => normalize_path(request.uri().path()),
            PathLabel::Raw => request.uri().path().to_string(),
        }
    }
}

/// Replace UUID and all-digit segments with `:id` and drop a trailing slash
pub fn normalize_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return "/".to_string();
    }

    path.split('/')
        .map(|segment| {
            if is_uuid(segment) || is_numeric(segment) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let parts: Vec<&str> = s.split('-').collect();
    s.len() == 36
        && parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
