//! Error types for registry operations.
//!
//! Errors are categorized so callers can tell a flaky connection from a
//! request the registry will keep rejecting.

use std::fmt;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// Client id or secret rejected.
    Auth,
    /// The registry understood the request and refused it.
    Rejected,
    /// Response could not be decoded.
    Format,
    /// Caller passed something the registry cannot act on.
    Usage,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Registry credentials rejected",
            Self::Rejected => "Registry rejected the request",
            Self::Format => "Unexpected registry response",
            Self::Usage => "Invalid registry request",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the registry URL and your connection",
            Self::Auth => "Check client_id and client_secret in the [registry] config section",
            Self::Rejected => "Check the registry's error messages for the offending field",
            Self::Format => "The registry schema may have changed",
            Self::Usage => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The response carried GraphQL errors.
    #[error("{operation} failed: {}", messages.join("; "))]
    GraphQl {
        operation: String,
        messages: Vec<String>,
    },

    /// The response had neither data nor errors.
    #[error("{0} returned no data")]
    MissingData(String),

    /// Invalid response body.
    #[error("invalid registry response: {0}")]
    InvalidResponse(String),

    /// A write needs a registry id the member does not have yet.
    #[error("{0} has no registry id")]
    Unregistered(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http {
                status: Some(401 | 403),
                ..
            } => ErrorCategory::Auth,
            Self::Http { .. } => ErrorCategory::Network,
            Self::GraphQl { .. } => ErrorCategory::Rejected,
            Self::MissingData(_) | Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Unregistered(_) => ErrorCategory::Usage,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_categories() {
        assert_eq!(Error::http("bad gateway", Some(502)).category(), ErrorCategory::Network);
        assert_eq!(Error::http("timeout", None).category(), ErrorCategory::Network);
        assert_eq!(Error::http("HTTP 401", Some(401)).category(), ErrorCategory::Auth);
        assert_eq!(Error::http("HTTP 403", Some(403)).category(), ErrorCategory::Auth);
        assert!(Error::http("timeout", None).is_retryable());
        assert!(!Error::http("HTTP 401", Some(401)).is_retryable());
    }

    #[test]
    fn test_graphql_error_display() {
        let err = Error::GraphQl {
            operation: "CreateTeacher".into(),
            messages: vec!["name required".into(), "bad pronouns".into()],
        };
        assert_eq!(err.to_string(), "CreateTeacher failed: name required; bad pronouns");
        assert_eq!(err.category(), ErrorCategory::Rejected);
    }

    #[test]
    fn test_from_serde_error() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_advice_present() {
        for category in [
            ErrorCategory::Network,
            ErrorCategory::Auth,
            ErrorCategory::Rejected,
            ErrorCategory::Format,
            ErrorCategory::Usage,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }
}
