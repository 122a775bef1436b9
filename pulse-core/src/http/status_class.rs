use std::fmt;

/// Hundreds-digit class of an HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Redirection,
    ClientError,
    ServerError,
    /// Anything outside 200-599, including informational codes and aborted requests
    Other,
}

impl StatusClass {
    pub const ALL: [StatusClass; 5] = [
        StatusClass::Success,
        StatusClass::Redirection,
        StatusClass::ClientError,
        StatusClass::ServerError,
        StatusClass::Other,
    ];

    pub fn from_code(code: u16) -> Self {
        match code / 100 {
            2 => StatusClass::Success,
            3 => StatusClass::Redirection,
            4 => StatusClass::ClientError,
            5 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
            StatusClass::Other => "other",
        }
    }

    /// Base name of the per class counter, e.g. `status_4xx_total`
    pub fn counter_base_name(&self) -> String {
        format!("status_{}_total", self.as_str())
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            StatusClass::Success => 0,
            StatusClass::Redirection => 1,
            StatusClass::ClientError => 2,
            StatusClass::ServerError => 3,
            StatusClass::Other => 4,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
