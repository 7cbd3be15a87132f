//! # Registry
//!
//! Read-only access to the tenant, site, device and credential records the
//! fleet is built from, plus an append-only audit trail.
//!
//! The records themselves are owned by an external CRUD service; this crate
//! only queries them. Two stores are provided:
//!
//! - [`Registry`]: the SQLite database shared with the record service
//! - [`MemoryRecordStore`]: an in-memory store for tests and fixtures
//!
//! ## Example
//!
//! ```no_run
//! use registry::{DeviceFilter, RecordStore, Registry};
//! use std::path::Path;
//!
//! let registry = Registry::open(Path::new("/var/lib/netfleet/registry.db"))?;
//! for device in registry.devices(&DeviceFilter::tenant(1))? {
//!     println!("{} ({})", device.hostname, device.vendor);
//! }
//! # Ok::<(), registry::Error>(())
//! ```

mod error;
mod memory;
mod types;

pub use error::{Error, RecordKind, Result};
pub use memory::MemoryRecordStore;
pub use types::{
    AuditEntry, AuditStatus, ConnectionMethod, Credential, CredentialId, Device, DeviceFilter,
    DeviceId, NewAuditEntry, Site, SiteId, Tenant, TenantId,
};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Read-only queries against the record store
pub trait RecordStore: Send + Sync {
    fn tenant(&self, id: TenantId) -> Result<Option<Tenant>>;

    fn site(&self, id: SiteId) -> Result<Option<Site>>;

    fn device(&self, id: DeviceId) -> Result<Option<Device>>;

    fn credential(&self, id: CredentialId) -> Result<Option<Credential>>;

    /// Devices matching the filter, ordered by id
    fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>>;

    fn require_tenant(&self, id: TenantId) -> Result<Tenant> {
        self.tenant(id)?
            .ok_or_else(|| Error::not_found(RecordKind::Tenant, id))
    }

    fn require_device(&self, id: DeviceId) -> Result<Device> {
        self.device(id)?
            .ok_or_else(|| Error::not_found(RecordKind::Device, id))
    }

    fn require_credential(&self, id: CredentialId) -> Result<Credential> {
        self.credential(id)?
            .ok_or_else(|| Error::not_found(RecordKind::Credential, id))
    }
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &NewAuditEntry) -> Result<()>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tenants (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        git_repo_url TEXT,
        git_branch TEXT NOT NULL DEFAULT 'main',
        git_token TEXT
    );

    CREATE TABLE IF NOT EXISTS sites (
        id INTEGER PRIMARY KEY,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id),
        name TEXT NOT NULL,
        location TEXT
    );

    CREATE TABLE IF NOT EXISTS credential_profiles (
        id INTEGER PRIMARY KEY,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id),
        name TEXT NOT NULL,
        username TEXT NOT NULL,
        encrypted_password TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS devices (
        id INTEGER PRIMARY KEY,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        credential_id INTEGER REFERENCES credential_profiles(id),
        hostname TEXT NOT NULL,
        ip_address TEXT NOT NULL,
        vendor TEXT NOT NULL,
        connection_method TEXT NOT NULL DEFAULT 'ssh',
        port INTEGER NOT NULL DEFAULT 22,
        snmp_community TEXT,
        status TEXT NOT NULL DEFAULT 'active'
    );

    CREATE TABLE IF NOT EXISTS audit_logs (
        id INTEGER PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        device_id INTEGER,
        action TEXT NOT NULL,
        status TEXT NOT NULL,
        details TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_devices_site ON devices(site_id);
    CREATE INDEX IF NOT EXISTS idx_audit_tenant ON audit_logs(tenant_id);
";

const DEVICE_COLUMNS: &str = "d.id, s.tenant_id, d.site_id, d.credential_id, d.hostname, \
     d.ip_address, d.vendor, d.connection_method, d.port, d.snmp_community, d.status";

/// The SQLite-backed record store
pub struct Registry {
    conn: Mutex<Connection>,
}

impl Registry {
    /// Open the registry database at the given path
    ///
    /// Creates the database file and any missing tables.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        log::debug!("Opened registry at {}", db_path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory registry
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run raw SQL against the database (fixtures, migrations)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn().execute_batch(sql)?;
        Ok(())
    }

    /// Most recent audit entries, optionally limited to one tenant
    pub fn audit_trail(&self, tenant_id: Option<TenantId>, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, device_id, action, status, details, created_at
             FROM audit_logs
             WHERE (?1 IS NULL OR tenant_id = ?1)
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![tenant_id, limit], audit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }
}

impl RecordStore for Registry {
    fn tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        let tenant = self
            .conn()
            .query_row(
                "SELECT id, name, description, git_repo_url, git_branch, git_token
                 FROM tenants WHERE id = ?1",
                [id],
                |row| {
                    Ok(Tenant {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        git_repo_url: row.get(3)?,
                        git_branch: row.get(4)?,
                        git_token: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(tenant)
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>> {
        let site = self
            .conn()
            .query_row(
                "SELECT id, tenant_id, name, location FROM sites WHERE id = ?1",
                [id],
                |row| {
                    Ok(Site {
                        id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        name: row.get(2)?,
                        location: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(site)
    }

    fn device(&self, id: DeviceId) -> Result<Option<Device>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM devices d JOIN sites s ON s.id = d.site_id WHERE d.id = ?1"
        );
        let device = self.conn().query_row(&sql, [id], device_from_row).optional()?;
        Ok(device)
    }

    fn credential(&self, id: CredentialId) -> Result<Option<Credential>> {
        let credential = self
            .conn()
            .query_row(
                "SELECT id, tenant_id, name, username, encrypted_password
                 FROM credential_profiles WHERE id = ?1",
                [id],
                |row| {
                    Ok(Credential {
                        id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        name: row.get(2)?,
                        username: row.get(3)?,
                        secret: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        let mut sql = format!("SELECT {DEVICE_COLUMNS} FROM devices d JOIN sites s ON s.id = d.site_id");
        let mut clauses = Vec::new();
        let mut values: Vec<i64> = Vec::new();

        if let Some(tenant_id) = filter.tenant_id {
            clauses.push("s.tenant_id = ?".to_string());
            values.push(tenant_id);
        }

        if let Some(ids) = &filter.device_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            clauses.push(format!("d.id IN ({placeholders})"));
            values.extend(ids);
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY d.id");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let devices = stmt
            .query_map(params_from_iter(values), device_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(devices)
    }
}

impl AuditSink for Registry {
    fn record(&self, entry: &NewAuditEntry) -> Result<()> {
        let details = serde_json::to_string(&entry.details)?;
        self.conn().execute(
            "INSERT INTO audit_logs (tenant_id, device_id, action, status, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.tenant_id,
                entry.device_id,
                entry.action,
                entry.status.as_str(),
                details,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    let method: String = row.get(7)?;
    Ok(Device {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        site_id: row.get(2)?,
        credential_id: row.get(3)?,
        hostname: row.get(4)?,
        ip_address: row.get(5)?,
        vendor: row.get(6)?,
        connection_method: method.parse().map_err(|e| conversion_error(7, e))?,
        port: row.get(8)?,
        snmp_community: row.get(9)?,
        status: row.get(10)?,
    })
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let status: String = row.get(4)?;
    let details: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    let details = match details {
        Some(text) => serde_json::from_str(&text).map_err(|e| conversion_error(5, e))?,
        None => serde_json::Value::Null,
    };
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(6, e))?
        .with_timezone(&Utc);

    Ok(AuditEntry {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        device_id: row.get(2)?,
        action: row.get(3)?,
        status: status.parse().map_err(|e| conversion_error(4, e))?,
        details,
        created_at,
    })
}
