//! Error types for the registry crate

use std::fmt;
use thiserror::Error;

/// Kind of record a lookup was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Tenant,
    Site,
    Device,
    Credential,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tenant => "tenant",
            Self::Site => "site",
            Self::Device => "device",
            Self::Credential => "credential",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reading records or writing the audit trail
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding of audit details failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced record does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },

    /// A record is present but unusable as stored
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Shorthand for a missing record
    pub fn not_found(kind: RecordKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Whether this error means the referenced record is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;
