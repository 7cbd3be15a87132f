//! # fleet
//!
//! Inventory, platform-aware transport selection and parallel fan-out across
//! network devices.
//!
//! This crate provides:
//! - Building a per-run host list from registry records ([`inventory`])
//! - Normalizing vendor strings into a [`PlatformTag`] and choosing an
//!   atomic or incremental [`Strategy`]
//! - Running an operation on many hosts at once with per-host failure
//!   isolation ([`Dispatcher`])
//! - OpenSSH-backed device sessions and a scripted connector for tests
//!
//! ## Example
//!
//! ```no_run
//! use fleet::session::ssh::{SshConnector, SshOptions};
//! use fleet::{Dispatcher, NoProgress, inventory};
//! use registry::{DeviceFilter, Registry};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let registry = Registry::open(Path::new("registry.db"))?;
//! let hosts = inventory::build(&registry, &DeviceFilter::tenant(1))?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(SshConnector::new(SshOptions::default())?));
//! for result in dispatcher.deploy(&hosts, "ntp server 10.0.0.5", false, &NoProgress)? {
//!     println!("{}: failed={}", result.host, result.failed());
//! }
//! # Ok::<(), fleet::Error>(())
//! ```

pub mod dispatch;
pub mod error;
pub mod inventory;
pub mod platform;
pub mod retry;
pub mod session;
pub mod snippets;
pub mod types;

pub use dispatch::{Dispatcher, NoProgress, ProgressCallback};
pub use error::{Error, ErrorCategory, FaultKind, Result};
pub use platform::{PlatformTag, Strategy};
pub use session::{Connector, DeviceSession, SessionGuard};
pub use types::{DeployReport, HostDescriptor, HostFault, HostReport, HostResult, RetryConfig};
