//! Error types for sheet reads.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for sheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of sheet errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// Stored credentials are missing, malformed or revoked.
    Credentials,
    /// The spreadsheet or range does not exist or is not shared.
    NotFound,
    /// Response could not be decoded.
    Format,
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
            Self::Credentials => "Sheet credentials unusable",
            Self::NotFound => "Spreadsheet not reachable",
            Self::Format => "Unexpected Sheets API response",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Credentials => {
                "Re-authorize and save an authorized_user token.json at [sheet].token_path"
            }
            Self::NotFound => "Check spreadsheet_id and range, and that the sheet is shared",
            Self::Format => "The Sheets API response changed shape; check the range",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reading a sheet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Token file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Token file or refresh response is unusable.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// No spreadsheet to read.
    #[error("no spreadsheet id configured and none supplied by the registry")]
    NoSpreadsheet,

    /// Invalid response body.
    #[error("invalid Sheets response: {0}")]
    InvalidResponse(String),
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
                status: Some(400 | 401 | 403),
                ..
            } => ErrorCategory::Credentials,
            Self::Http {
                status: Some(404), ..
            } => ErrorCategory::NotFound,
            Self::Http { .. } => ErrorCategory::Network,
            Self::NoSpreadsheet => ErrorCategory::NotFound,
            Self::TokenFile { .. } | Self::Credentials(_) => ErrorCategory::Credentials,
            Self::InvalidResponse(_) => ErrorCategory::Format,
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
