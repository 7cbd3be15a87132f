//! Error types for fleet operations.
//!
//! Failures on a single host are categorized so the dispatcher can decide
//! whether to retry opening a session and so callers can branch on the kind
//! of fault instead of matching on message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories of transport errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable)
    Network,
    /// Connection or command exceeded its time limit
    Timeout,
    /// Login rejected by the device
    Authentication,
    /// Host key missing or changed
    HostKey,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Timeout => "Timed out",
            Self::Authentication => "Authentication failed",
            Self::HostKey => "Host key verification failed",
            Self::Other => "Unexpected error",
        }
    }

    /// Classify the stderr of a transport program.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::Timeout;
        }

        if lower.contains("could not resolve")
            || lower.contains("connection refused")
            || lower.contains("no route to host")
            || lower.contains("network is unreachable")
            || lower.contains("connection reset")
            || lower.contains("connection closed")
            || lower.contains("broken pipe")
            || lower.contains("temporary failure")
        {
            return Self::Network;
        }

        if lower.contains("host key verification failed")
            || lower.contains("remote host identification has changed")
        {
            return Self::HostKey;
        }

        if lower.contains("permission denied")
            || lower.contains("authentication failed")
            || lower.contains("too many authentication failures")
        {
            return Self::Authentication;
        }

        Self::Other
    }
}

/// Kind of per-host fault recorded in a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Session could not be opened or a command could not be delivered
    Connectivity,
    /// The requested mode is forbidden for the host's strategy
    PolicyViolation,
    /// The device answered with an error marker
    Rejected,
    /// The host task itself failed (panic, bad parameters)
    Internal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::PolicyViolation => "policy_violation",
            Self::Rejected => "rejected",
            Self::Internal => "internal",
        }
    }
}

/// Errors that can occur during fleet operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session could not be opened
    #[error("cannot connect to {host}: {message}")]
    Connect {
        host: String,
        category: ErrorCategory,
        message: String,
    },

    /// A command could not be delivered over an open session
    #[error("command failed on {host}: {message}")]
    Command {
        host: String,
        category: ErrorCategory,
        message: String,
    },

    /// The device reported an error in its output
    #[error("{host} rejected the change: {message}")]
    Rejected { host: String, message: String },

    /// Dry-run requested on a strategy that cannot preview
    #[error("dry-run not supported for platform {platform} via incremental strategy")]
    DryRunUnsupported { platform: String },

    /// Atomic configuration requested on a platform without transactions
    #[error("atomic configuration not supported for platform {platform}")]
    AtomicUnsupported { platform: String },

    /// Missing or invalid parameter, rejected before dispatch
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A required executable is not installed
    #[error("{0} not found in PATH")]
    ExecutableNotFound(String),

    /// Record store failure while building inventory
    #[error(transparent)]
    Registry(#[from] registry::Error),

    /// Worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    WorkerPool(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Connect { category, .. } | Error::Command { category, .. } => *category,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Kind of fault this error becomes in a per-host result.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Error::Connect { .. } | Error::Command { .. } | Error::ExecutableNotFound(_) => {
                FaultKind::Connectivity
            }
            Error::Rejected { .. } => FaultKind::Rejected,
            Error::DryRunUnsupported { .. } | Error::AtomicUnsupported { .. } => {
                FaultKind::PolicyViolation
            }
            _ => FaultKind::Internal,
        }
    }

    /// Create a connect error from transport stderr.
    pub fn connect(host: &str, stderr: &str) -> Self {
        Error::Connect {
            host: host.to_string(),
            category: ErrorCategory::from_stderr(stderr),
            message: first_line(stderr),
        }
    }

    /// Create a command error from transport stderr.
    pub fn command(host: &str, stderr: &str) -> Self {
        Error::Command {
            host: host.to_string(),
            category: ErrorCategory::from_stderr(stderr),
            message: first_line(stderr),
        }
    }
}

fn first_line(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output");
    line.to_string()
}

/// Result type for fleet operations.
pub type Result<T> = std::result::Result<T, Error>;
