//! Error types for the configuration vault.

use registry::TenantId;
use std::fmt;
use thiserror::Error;

/// Step of a repository operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Clone,
    Checkout,
    Pull,
    Commit,
    Push,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Checkout => "checkout",
            Self::Pull => "pull",
            Self::Commit => "commit",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while versioning configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// A git step against the tenant's mirror or remote failed
    #[error("{stage} failed for tenant {tenant}: {message}")]
    Sync {
        tenant: TenantId,
        stage: SyncStage,
        message: String,
    },

    /// Hostname cannot be used as a file name
    #[error("invalid hostname '{0}'")]
    InvalidHostname(String),

    /// git is not installed
    #[error("git not found in PATH")]
    GitNotFound,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn sync(tenant: TenantId, stage: SyncStage, message: impl Into<String>) -> Self {
        Self::Sync {
            tenant,
            stage,
            message: message.into(),
        }
    }

    /// Stage that failed, for sync errors.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::Sync { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = Error::sync(7, SyncStage::Push, "remote rejected");
        assert_eq!(err.to_string(), "push failed for tenant 7: remote rejected");
        assert_eq!(err.stage(), Some(SyncStage::Push));
        assert_eq!(Error::GitNotFound.stage(), None);
    }
}
