//! In-memory record store

use crate::error::Result;
use crate::types::{
    AuditEntry, Credential, CredentialId, Device, DeviceFilter, DeviceId, NewAuditEntry, Site,
    SiteId, Tenant, TenantId,
};
use crate::{AuditSink, RecordStore};
use chrono::Utc;
use std::sync::{Mutex, PoisonError};

/// A record store held entirely in memory
///
/// Built with the `with_*` methods. Audit entries written to it are kept
/// and can be inspected with [`MemoryRecordStore::audit_entries`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tenants: Vec<Tenant>,
    sites: Vec<Site>,
    devices: Vec<Device>,
    credentials: Vec<Credential>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenants.retain(|t| t.id != tenant.id);
        self.tenants.push(tenant);
        self
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.sites.retain(|s| s.id != site.id);
        self.sites.push(site);
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.retain(|d| d.id != device.id);
        self.devices.push(device);
        self.devices.sort_by_key(|d| d.id);
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.retain(|c| c.id != credential.id);
        self.credentials.push(credential);
        self
    }

    /// Audit entries recorded so far, oldest first
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecordStore for MemoryRecordStore {
    fn tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        Ok(self.tenants.iter().find(|t| t.id == id).cloned())
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>> {
        Ok(self.sites.iter().find(|s| s.id == id).cloned())
    }

    fn device(&self, id: DeviceId) -> Result<Option<Device>> {
        Ok(self.devices.iter().find(|d| d.id == id).cloned())
    }

    fn credential(&self, id: CredentialId) -> Result<Option<Credential>> {
        Ok(self.credentials.iter().find(|c| c.id == id).cloned())
    }

    fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }
}

impl AuditSink for MemoryRecordStore {
    fn record(&self, entry: &NewAuditEntry) -> Result<()> {
        let mut audit = self.audit.lock().unwrap_or_else(PoisonError::into_inner);
        let id = i64::try_from(audit.len()).unwrap_or(i64::MAX) + 1;
        audit.push(AuditEntry {
            id,
            tenant_id: entry.tenant_id,
            device_id: entry.device_id,
            action: entry.action.clone(),
            status: entry.status,
            details: entry.details.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuditStatus;

    #[test]
    fn test_memory_store_lookup_and_filter() {
        let store = MemoryRecordStore::new()
            .with_tenant(Tenant::new(1, "acme"))
            .with_device(Device::new(2, 1, 10, "r2", "10.0.0.2", "cisco"))
            .with_device(Device::new(1, 1, 10, "r1", "10.0.0.1", "cisco"))
            .with_credential(Credential::new(5, 1, "admin", "pw"));

        assert!(store.tenant(1).unwrap().is_some());
        assert!(store.tenant(2).unwrap().is_none());
        assert_eq!(store.credential(5).unwrap().unwrap().username, "admin");

        let ids: Vec<_> = store
            .devices(&DeviceFilter::tenant(1))
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_memory_store_records_audit() {
        let store = MemoryRecordStore::new();
        store
            .record(&NewAuditEntry {
                tenant_id: 1,
                device_id: None,
                action: "deploy_config".into(),
                status: AuditStatus::Success,
                details: serde_json::Value::Null,
            })
            .unwrap();

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }
}
