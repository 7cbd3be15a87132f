//! Inventory building.
//!
//! Turns persisted device and credential records into the host list for one
//! run. Nothing here is cached; every run reads the store afresh.

use crate::error::Result;
use crate::platform::PlatformTag;
use crate::types::HostDescriptor;
use registry::{Credential, Device, DeviceFilter, RecordStore};
use std::collections::HashSet;

/// Build the host list for the devices matching `filter`.
///
/// Devices without a resolvable credential are left out. Hosts come back in
/// device id order with unique names: when two devices share a hostname the
/// later one is renamed `<hostname>#<device id>` (plus `.N` if that is taken
/// too). `hostname` always keeps the recorded name.
pub fn build(store: &dyn RecordStore, filter: &DeviceFilter) -> Result<Vec<HostDescriptor>> {
    let devices = store.devices(filter)?;
    let mut hosts = Vec::with_capacity(devices.len());
    let mut names = HashSet::new();

    for device in devices {
        let Some(credential_id) = device.credential_id else {
            log::debug!("Skipping {} (id {}): no credential", device.hostname, device.id);
            continue;
        };
        let Some(credential) = store.credential(credential_id)? else {
            log::debug!(
                "Skipping {} (id {}): credential {} not found",
                device.hostname,
                device.id,
                credential_id
            );
            continue;
        };

        let mut host = host_descriptor(&device, &credential);
        if !names.insert(host.name.clone()) {
            let mut unique = format!("{}#{}", host.hostname, device.id);
            let mut attempt = 1;
            while !names.insert(unique.clone()) {
                attempt += 1;
                unique = format!("{}#{}.{}", host.hostname, device.id, attempt);
            }
            log::warn!("Duplicate hostname {} in inventory, using {}", host.hostname, unique);
            host.name = unique;
        }
        hosts.push(host);
    }

    log::debug!("Inventory built with {} hosts", hosts.len());
    Ok(hosts)
}

/// Describe one device reached with `credential`.
pub fn host_descriptor(device: &Device, credential: &Credential) -> HostDescriptor {
    HostDescriptor {
        name: device.hostname.clone(),
        hostname: device.hostname.clone(),
        address: device.ip_address.clone(),
        port: device.port,
        platform: PlatformTag::from_vendor(&device.vendor),
        username: credential.username.clone(),
        secret: credential.secret.clone(),
        tenant_id: device.tenant_id,
        site_id: device.site_id,
        device_id: device.id,
    }
}
