//! Core types for fleet orchestration.

use crate::error::{Error, FaultKind};
use crate::platform::PlatformTag;
use registry::{DeviceId, SiteId, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Connection-ready description of one device for a single run.
#[derive(Clone, Serialize)]
pub struct HostDescriptor {
    /// Unique within one run
    pub name: String,
    /// Hostname as recorded in the registry; keys the version store
    pub hostname: String,
    /// Management address
    pub address: String,
    pub port: u16,
    pub platform: PlatformTag,
    pub username: String,
    #[serde(skip)]
    pub secret: String,
    pub tenant_id: TenantId,
    pub site_id: SiteId,
    pub device_id: DeviceId,
}

impl fmt::Debug for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDescriptor")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("site_id", &self.site_id)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Structured failure of one host's task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFault {
    pub kind: FaultKind,
    pub message: String,
}

impl HostFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&Error> for HostFault {
    fn from(err: &Error) -> Self {
        Self::new(err.fault_kind(), err.to_string())
    }
}

impl From<Error> for HostFault {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for HostFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.as_str())
    }
}

/// Outcome of one host's task. Written exactly once per host per run.
#[derive(Debug, Clone)]
pub struct HostResult {
    pub host: String,
    pub address: String,
    pub device_id: DeviceId,
    pub outcome: std::result::Result<String, HostFault>,
}

impl HostResult {
    pub fn new(host: &HostDescriptor, outcome: std::result::Result<String, HostFault>) -> Self {
        Self {
            host: host.name.clone(),
            address: host.address.clone(),
            device_id: host.device_id,
            outcome,
        }
    }

    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn output(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn fault(&self) -> Option<&HostFault> {
        self.outcome.as_ref().err()
    }

    pub fn to_report(&self) -> HostReport {
        let (result, fault) = match &self.outcome {
            Ok(output) => (output.clone(), None),
            Err(fault) => (fault.message.clone(), Some(fault.kind)),
        };
        HostReport {
            hostname: self.host.clone(),
            ip: self.address.clone(),
            failed: self.failed(),
            result,
            fault,
        }
    }
}

/// One entry of a produced report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostReport {
    pub hostname: String,
    pub ip: String,
    pub failed: bool,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
}

/// Aggregated report of a fan-out run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub status: String,
    pub dry_run: bool,
    pub details: Vec<HostReport>,
}

impl DeployReport {
    pub fn from_results(results: &[HostResult], dry_run: bool) -> Self {
        Self {
            status: "completed".to_string(),
            dry_run,
            details: results.iter().map(HostResult::to_report).collect(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.details.iter().filter(|d| d.failed).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.details.len() - self.failed_count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Configuration for retrying session opening.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostDescriptor {
        HostDescriptor {
            name: "r1".into(),
            hostname: "r1".into(),
            address: "10.0.0.1".into(),
            port: 22,
            platform: PlatformTag::Ios,
            username: "admin".into(),
            secret: "hunter2".into(),
            tenant_id: 1,
            site_id: 10,
            device_id: 100,
        }
    }

    #[test]
    fn test_host_descriptor_hides_secret() {
        let host = host();
        assert!(!format!("{host:?}").contains("hunter2"));
        let json = serde_json::to_string(&host).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"platform\":\"ios\""));
    }

    #[test]
    fn test_report_shape() {
        let host = host();
        let results = vec![
            HostResult::new(&host, Ok("done".into())),
            HostResult::new(
                &host,
                Err(HostFault::new(FaultKind::Connectivity, "Connection refused")),
            ),
        ];

        let report = DeployReport::from_results(&results, true);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded_count(), 1);
        assert!(!report.is_success());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["details"][0]["hostname"], "r1");
        assert_eq!(json["details"][0]["ip"], "10.0.0.1");
        assert_eq!(json["details"][0]["failed"], false);
        assert!(json["details"][0].get("fault").is_none());
        assert_eq!(json["details"][1]["fault"], "connectivity");
    }

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::new(5, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));
    }
}
