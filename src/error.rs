use std::fmt;

/// Why a status query produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Connection failure, timeout or a non-success HTTP status.
    Transport(String),
    /// The body was not a JSON object with a boolean `online` field.
    Malformed(String),
    /// Well-formed JSON, but required fields were missing or mistyped.
    Incomplete(String),
    /// The query cannot be carried as a URL path segment (`.` or `..`).
    Unaddressable(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Transport(e) => write!(f, "request failed: {}", e),
            QueryError::Malformed(e) => write!(f, "malformed response: {}", e),
            QueryError::Incomplete(e) => write!(f, "incomplete server record: {}", e),
            QueryError::Unaddressable(q) => write!(f, "{:?} is not a server address", q),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            QueryError::Transport("timed out".to_string())
        } else {
            QueryError::Transport(e.to_string())
        }
    }
}
