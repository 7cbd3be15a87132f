//! Where tenant mirrors live on disk, and who may touch them.

use registry::TenantId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Maps tenants to their local mirror directories.
#[derive(Debug, Clone)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/tenant_<id>`
    pub fn mirror_path(&self, tenant_id: TenantId) -> PathBuf {
        self.root.join(format!("tenant_{tenant_id}"))
    }
}

/// One mutex per tenant, created on first use.
#[derive(Debug, Default)]
pub(crate) struct TenantLocks {
    locks: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    pub(crate) fn get(&self, tenant_id: TenantId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(tenant_id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_paths_are_partitioned() {
        let layout = MirrorLayout::new("/srv/backups");
        assert_eq!(layout.mirror_path(999), PathBuf::from("/srv/backups/tenant_999"));
        assert_ne!(layout.mirror_path(1), layout.mirror_path(2));
    }

    #[test]
    fn test_same_tenant_shares_lock() {
        let locks = TenantLocks::default();
        assert!(Arc::ptr_eq(&locks.get(1), &locks.get(1)));
        assert!(!Arc::ptr_eq(&locks.get(1), &locks.get(2)));
    }
}
