//! Error types for reconciliation passes.
//!
//! Data-quality problems (an unparseable row, a member with no matching row)
//! are not errors: they are logged and skipped. The variants here abort a
//! whole pass.

use thiserror::Error;

/// Categories of pass errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A collaborator could not be reached or returned garbage
    Pull,
    /// Internal bookkeeping is inconsistent (a bug, not bad data)
    Invariant,
    /// Orchestrator could not set up its worker pool
    Runtime,
}

impl ErrorCategory {
    /// Whether the next scheduled pass can be expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Pull)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pull => "Could not pull data",
            Self::Invariant => "Internal state inconsistent",
            Self::Runtime => "Runtime failure",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Pull => "Check connectivity and credentials; the next pass will retry",
            Self::Invariant => "Restart the process to rebuild the roster from the registry",
            Self::Runtime => "Check system resources and the configured job count",
        }
    }
}

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum Error {
    /// Pulling sheet rows failed
    #[error("failed to pull sheet data: {0:#}")]
    SheetPull(anyhow::Error),

    /// Pulling registry members or report-to failed
    #[error("failed to pull registry data: {0:#}")]
    RegistryPull(anyhow::Error),

    /// Internal invariant violated during resolution
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Thread pool construction failed
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

impl Error {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SheetPull(_) | Self::RegistryPull(_) => ErrorCategory::Pull,
            Self::Invariant(_) => ErrorCategory::Invariant,
            Self::ThreadPool(_) => ErrorCategory::Runtime,
        }
    }
}

/// Result type for reconciliation passes.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = Error::SheetPull(anyhow::anyhow!("timeout"));
        assert_eq!(err.category(), ErrorCategory::Pull);
        assert!(err.category().is_transient());

        let err = Error::invariant("pending member missing");
        assert_eq!(err.category(), ErrorCategory::Invariant);
        assert!(!err.category().is_transient());
        assert!(err.to_string().contains("pending member missing"));
    }

    #[test]
    fn test_advice_present() {
        for category in [
            ErrorCategory::Pull,
            ErrorCategory::Invariant,
            ErrorCategory::Runtime,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }
}
