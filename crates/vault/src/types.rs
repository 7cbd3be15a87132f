//! Repository and history types.

use chrono::{DateTime, Utc};
use registry::{Tenant, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One commit that touched a device's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl CommitRecord {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }
}

/// A tenant's remote configuration repository.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantRepository {
    pub tenant_id: TenantId,
    pub url: String,
    pub branch: String,
    pub token: Option<String>,
}

impl TenantRepository {
    pub fn new(tenant_id: TenantId, url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            tenant_id,
            url: url.into(),
            branch: branch.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Repository of `tenant`, if it has a remote configured.
    pub fn from_tenant(tenant: &Tenant) -> Option<Self> {
        let url = tenant.git_repo_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            tenant_id: tenant.id,
            url: url.to_string(),
            branch: tenant.git_branch.clone(),
            token: tenant.git_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// URL used for clone and push, with the token embedded for HTTPS remotes.
    pub fn authenticated_url(&self) -> String {
        match &self.token {
            Some(token) if self.url.contains("https://") => {
                self.url.replacen("https://", &format!("https://oauth2:{token}@"), 1)
            }
            _ => self.url.clone(),
        }
    }

    /// Remove the token from text that may echo the remote URL.
    pub(crate) fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), "<redacted>"),
            None => text.to_string(),
        }
    }
}

impl fmt::Debug for TenantRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRepository")
            .field("tenant_id", &self.tenant_id)
            .field("url", &self.url)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Identity recorded on snapshot commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "netfleet".to_string(),
            email: "netfleet@localhost".to_string(),
        }
    }
}
