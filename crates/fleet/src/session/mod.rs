//! Device session abstraction.
//!
//! A [`Connector`] opens one [`DeviceSession`] per host per task. Sessions
//! are never shared between hosts. Callers hold them through a
//! [`SessionGuard`], which closes the session on every exit path, including
//! unwinding.
//!
//! Implementations:
//! - [`ssh::SshConnector`]: OpenSSH with a per-session control master
//! - `mock::ScriptedConnector`: in-memory, records every call (tests and the
//!   `testing` feature only)

#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod script;
pub mod ssh;

use crate::error::{Error, Result};
use crate::types::HostDescriptor;
use regex::Regex;
use std::ops::{Deref, DerefMut};
use std::sync::LazyLock;

/// An open management session to one device.
pub trait DeviceSession: Send {
    /// Run one exec-mode command and return its output.
    fn send_command(&mut self, command: &str) -> Result<String>;

    /// Enter configuration mode, apply the lines in order, leave.
    fn send_config_set(&mut self, lines: &[String]) -> Result<String>;

    /// Stage `content` as one transaction and commit it, or only preview
    /// the resulting diff when `dry_run` is set.
    fn configure_atomic(&mut self, content: &str, replace: bool, dry_run: bool) -> Result<String>;

    /// Release the connection. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

/// Opens sessions to hosts.
pub trait Connector: Send + Sync {
    fn open(&self, host: &HostDescriptor) -> Result<Box<dyn DeviceSession>>;
}

/// Owns a session and closes it when dropped.
pub struct SessionGuard {
    host: String,
    session: Box<dyn DeviceSession>,
    closed: bool,
}

impl SessionGuard {
    pub fn new(host: &HostDescriptor, session: Box<dyn DeviceSession>) -> Self {
        Self {
            host: host.name.clone(),
            session,
            closed: false,
        }
    }

    /// Close now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.session.close()
    }
}

impl Deref for SessionGuard {
    type Target = dyn DeviceSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.session.close() {
            log::warn!("Failed to close session to {}: {}", self.host, e);
        }
    }
}

static REJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^\s*(%\s*(invalid input|incomplete command|ambiguous command|unknown command|error).*|syntax error.*|error: .*|error:\s*unrecognized command.*)$",
    )
    .expect("rejection pattern is valid")
});

/// First line of `output` that a device uses to signal a refused command.
pub fn detect_rejection(output: &str) -> Option<&str> {
    REJECTION.find(output).map(|m| m.as_str().trim())
}

/// Turn device output carrying an error marker into [`Error::Rejected`].
pub fn check_output(host: &str, output: String) -> Result<String> {
    match detect_rejection(&output) {
        Some(line) => Err(Error::Rejected {
            host: host.to_string(),
            message: line.to_string(),
        }),
        None => Ok(output),
    }
}
