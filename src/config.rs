//! `netfleet.toml` settings.

use crate::paths;
use anyhow::{Context, Result};
use fleet::RetryConfig;
use fleet::session::ssh::SshOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vault::CommitAuthor;

/// Top-level settings. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite registry shared with the record service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Root of the per-tenant git mirrors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<String>,

    /// Hosts worked on at once during a fan-out
    pub jobs: usize,

    /// Background jobs run at once
    pub workers: usize,

    pub retry: RetrySettings,
    pub ssh: SshSettings,
    pub commit: CommitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry: None,
            mirror_dir: None,
            jobs: fleet::dispatch::DEFAULT_JOBS,
            workers: 4,
            retry: RetrySettings::default(),
            ssh: SshSettings::default(),
            commit: CommitSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub binary: String,
    pub connect_timeout_secs: u64,
    pub keepalive_secs: u64,
    pub strict_host_key_checking: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            connect_timeout_secs: 10,
            keepalive_secs: 15,
            strict_host_key_checking: "accept-new".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSettings {
    pub author_name: String,
    pub author_email: String,
}

impl Default for CommitSettings {
    fn default() -> Self {
        let author = CommitAuthor::default();
        Self {
            author_name: author.name,
            author_email: author.email,
        }
    }
}

impl Settings {
    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn registry_path(&self) -> Result<PathBuf> {
        match &self.registry {
            Some(path) => Ok(paths::expand(path)),
            None => Ok(paths::state_dir()?.join("registry.db")),
        }
    }

    pub fn mirror_path(&self) -> Result<PathBuf> {
        match &self.mirror_dir {
            Some(path) => Ok(paths::expand(path)),
            None => Ok(paths::state_dir()?.join("config_backups")),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            backoff_factor: self.retry.backoff_factor,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            binary: self.ssh.binary.clone(),
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            keepalive_interval: Duration::from_secs(self.ssh.keepalive_secs),
            strict_host_key_checking: self.ssh.strict_host_key_checking.clone(),
            ..SshOptions::default()
        }
    }

    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.commit.author_name.clone(),
            email: self.commit.author_email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("netfleet.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.jobs, 8);
        assert_eq!(settings.workers, 4);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netfleet.toml");
        std::fs::write(
            &path,
            r#"
registry = "/srv/netfleet/registry.db"
jobs = 32

[retry]
max_attempts = 5

[ssh]
strict_host_key_checking = "yes"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.jobs, 32);
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.registry_path().unwrap(), PathBuf::from("/srv/netfleet/registry.db"));
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 2000);
        assert_eq!(settings.ssh.binary, "ssh");
        assert_eq!(settings.ssh_options().strict_host_key_checking, "yes");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netfleet.toml");
        std::fs::write(&path, "jobs = \"many\"").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("netfleet.toml");
        let settings = Settings {
            mirror_dir: Some("/srv/mirrors".into()),
            workers: 2,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("mirror_dir = \"/srv/mirrors\""));
        assert!(!content.contains("registry ="));
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_retry_conversion() {
        let settings = Settings {
            retry: RetrySettings {
                max_attempts: 0,
                base_delay_ms: 500,
                backoff_factor: 3.0,
                max_delay_ms: 4000,
            },
            ..Settings::default()
        };
        let retry = settings.retry_config();
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(retry.delay_for_attempt(5), Duration::from_secs(4));
    }

    #[test]
    fn test_author() {
        let author = Settings::default().author();
        assert_eq!(author, CommitAuthor::default());
    }
}
