//! Record types shared by the registry and its consumers

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TenantId = i64;
pub type SiteId = i64;
pub type DeviceId = i64;
pub type CredentialId = i64;

/// A customer owning sites, devices and an optional configuration repository
#[derive(Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// HTTPS remote holding the tenant's configuration history
    #[serde(default)]
    pub git_repo_url: Option<String>,
    #[serde(default = "default_branch")]
    pub git_branch: String,
    #[serde(default, skip_serializing)]
    pub git_token: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Tenant {
    pub fn new(id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            git_repo_url: None,
            git_branch: default_branch(),
            git_token: None,
        }
    }

    /// Attach a configuration repository remote
    pub fn with_repository(mut self, url: impl Into<String>, branch: impl Into<String>) -> Self {
        self.git_repo_url = Some(url.into());
        self.git_branch = branch.into();
        self
    }

    /// Whether backups of this tenant's devices are versioned
    pub fn has_version_store(&self) -> bool {
        self.git_repo_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("git_repo_url", &self.git_repo_url)
            .field("git_branch", &self.git_branch)
            .field("git_token", &self.git_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// How a device is reached for management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMethod {
    #[default]
    Ssh,
    Snmp,
}

impl ConnectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Snmp => "snmp",
        }
    }
}

impl FromStr for ConnectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "snmp" => Ok(Self::Snmp),
            other => Err(Error::Configuration(format!(
                "invalid connection method '{other}'"
            ))),
        }
    }
}

/// A managed router or switch
///
/// `tenant_id` is the tenant of the device's site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub tenant_id: TenantId,
    pub site_id: SiteId,
    #[serde(default)]
    pub credential_id: Option<CredentialId>,
    pub hostname: String,
    pub ip_address: String,
    /// Free-text vendor, e.g. "cisco_ios" or "Juniper MX"
    pub vendor: String,
    #[serde(default)]
    pub connection_method: ConnectionMethod,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub snmp_community: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_port() -> u16 {
    22
}

fn default_status() -> String {
    "active".to_string()
}

impl Device {
    pub fn new(
        id: DeviceId,
        tenant_id: TenantId,
        site_id: SiteId,
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            site_id,
            credential_id: None,
            hostname: hostname.into(),
            ip_address: ip_address.into(),
            vendor: vendor.into(),
            connection_method: ConnectionMethod::Ssh,
            port: default_port(),
            snmp_community: None,
            status: default_status(),
        }
    }

    pub fn with_credential(mut self, credential_id: CredentialId) -> Self {
        self.credential_id = Some(credential_id);
        self
    }

    /// Check that the parameters required by the connection method are present
    pub fn validate(&self) -> Result<()> {
        match self.connection_method {
            ConnectionMethod::Ssh if self.credential_id.is_none() => Err(Error::Configuration(
                format!("device {} uses SSH but has no credential profile", self.hostname),
            )),
            ConnectionMethod::Snmp
                if self
                    .snmp_community
                    .as_deref()
                    .is_none_or(|c| c.trim().is_empty()) =>
            {
                Err(Error::Configuration(format!(
                    "device {} uses SNMP but has no community string",
                    self.hostname
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Login used to open device sessions
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub tenant_id: TenantId,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub secret: String,
}

impl Credential {
    pub fn new(
        id: CredentialId,
        tenant_id: TenantId,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            id,
            tenant_id,
            name: format!("{username}@{tenant_id}"),
            username,
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Device selection for one query
///
/// Both criteria are conjunctive. `device_ids: Some(vec![])` selects nothing.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub tenant_id: Option<TenantId>,
    pub device_ids: Option<Vec<DeviceId>>,
}

impl DeviceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            device_ids: None,
        }
    }

    pub fn with_devices(mut self, ids: impl IntoIterator<Item = DeviceId>) -> Self {
        self.device_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn matches(&self, device: &Device) -> bool {
        if let Some(tenant_id) = self.tenant_id {
            if device.tenant_id != tenant_id {
                return false;
            }
        }
        match &self.device_ids {
            Some(ids) => ids.contains(&device.id),
            None => true,
        }
    }
}

/// Outcome recorded for an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Fail,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Fail }
    }
}

impl FromStr for AuditStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "fail" => Ok(Self::Fail),
            other => Err(Error::Configuration(format!("invalid audit status '{other}'"))),
        }
    }
}

/// An audit entry about to be written
#[derive(Debug, Clone, Serialize)]
pub struct NewAuditEntry {
    pub tenant_id: TenantId,
    pub device_id: Option<DeviceId>,
    /// e.g. "deploy_config", "backup_config"
    pub action: String,
    pub status: AuditStatus,
    pub details: serde_json::Value,
}

/// A stored audit entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub tenant_id: TenantId,
    pub device_id: Option<DeviceId>,
    pub action: String,
    pub status: AuditStatus,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
