//! # vault
//!
//! Version-controlled storage for device configuration snapshots.
//!
//! Each tenant with a configured remote gets a local mirror of that git
//! repository under `<mirror root>/tenant_<id>`, holding one
//! `<hostname>.conf` file per device. A snapshot is committed and pushed
//! only when its content differs from what is already stored, so repeated
//! backups of an unchanged device leave the history untouched.
//!
//! Every operation takes the tenant's lock and brings the mirror up to date
//! with the remote before doing anything else. Operations on different
//! tenants never wait on each other.
//!
//! ## Example
//!
//! ```no_run
//! use vault::{ConfigVault, MirrorLayout, TenantRepository};
//!
//! let vault = ConfigVault::new(MirrorLayout::new("/var/lib/netfleet/config_backups"))?;
//! let repo = TenantRepository::new(1, "https://git.example.com/acme/configs.git", "main")
//!     .with_token("glpat-example");
//!
//! if vault.commit(&repo, "core-sw-01", "hostname core-sw-01\n", "Automated config backup")? {
//!     for record in vault.history(&repo, "core-sw-01", 10) {
//!         println!("{} {} {}", record.short_hash(), record.timestamp, record.message);
//!     }
//! }
//! # Ok::<(), vault::Error>(())
//! ```

mod error;
mod git;
mod layout;
mod types;

pub use error::{Error, Result, SyncStage};
pub use layout::MirrorLayout;
pub use types::{CommitAuthor, CommitRecord, TenantRepository};

use chrono::{DateTime, Utc};
use git::Git;
use layout::TenantLocks;
use regex::Regex;
use similar::TextDiff;
use std::fs;
use std::path::PathBuf;
use std::sync::{LazyLock, PoisonError};

const DEFAULT_MESSAGE: &str = "Automated config backup";

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._#-]*$").expect("hostname pattern is valid")
});

static COMMIT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{4,64}$").expect("hash pattern is valid"));

/// A tenant mirror that is cloned, on the configured branch and current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub path: PathBuf,
    pub branch: String,
}

/// Per-tenant configuration history backed by git.
#[derive(Debug)]
pub struct ConfigVault {
    layout: MirrorLayout,
    author: CommitAuthor,
    git: PathBuf,
    locks: TenantLocks,
}

impl ConfigVault {
    /// Create a vault storing mirrors according to `layout`.
    ///
    /// Fails if git is not installed.
    pub fn new(layout: MirrorLayout) -> Result<Self> {
        Ok(Self {
            layout,
            author: CommitAuthor::default(),
            git: git::find_git()?,
            locks: TenantLocks::default(),
        })
    }

    pub fn with_author(mut self, author: CommitAuthor) -> Self {
        self.author = author;
        self
    }

    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Clone the tenant's mirror if needed and bring it up to date.
    pub fn ensure_ready(&self, repo: &TenantRepository) -> Result<Mirror> {
        let lock = self.locks.get(repo.tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.sync(repo)
    }

    /// Store `content` as the configuration of `hostname`.
    ///
    /// Returns `Ok(false)` when the stored content is already identical and
    /// nothing was committed. A failed push leaves the local commit in place;
    /// it is pushed with the next successful commit.
    pub fn commit(
        &self,
        repo: &TenantRepository,
        hostname: &str,
        content: &str,
        message: &str,
    ) -> Result<bool> {
        let file = config_file(hostname)?;
        let lock = self.locks.get(repo.tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mirror = self.sync(repo)?;
        fs::write(mirror.path.join(&file), content)?;

        let git = Git::new(&self.git, &mirror.path, repo);
        git.run(SyncStage::Commit, ["add", "--", file.as_str()])?;

        let status = git.run(SyncStage::Commit, ["status", "--porcelain", "--", file.as_str()])?;
        if status.trim().is_empty() {
            log::info!("No configuration changes detected for {hostname}, skipping commit");
            return Ok(false);
        }

        let message = if message.trim().is_empty() {
            DEFAULT_MESSAGE
        } else {
            message
        };
        let name = format!("user.name={}", self.author.name);
        let email = format!("user.email={}", self.author.email);
        git.run(
            SyncStage::Commit,
            [
                "-c",
                name.as_str(),
                "-c",
                email.as_str(),
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                "--no-verify",
                "-m",
                message,
                "--",
                file.as_str(),
            ],
        )?;

        let target = format!("HEAD:refs/heads/{}", mirror.branch);
        if let Err(e) = git.run(SyncStage::Push, ["push", "--quiet", "origin", target.as_str()]) {
            log::error!("Committed {hostname} locally but push failed: {e}");
            return Err(e);
        }

        log::info!("Backed up configuration for {hostname} (tenant {})", repo.tenant_id);
        Ok(true)
    }

    /// Up to `limit` most recent commits touching `hostname`, newest first.
    ///
    /// Empty when there is no history or the mirror cannot be synced.
    pub fn history(&self, repo: &TenantRepository, hostname: &str, limit: usize) -> Vec<CommitRecord> {
        let file = match config_file(hostname) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("{e}");
                return Vec::new();
            }
        };
        if limit == 0 {
            return Vec::new();
        }

        let lock = self.locks.get(repo.tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mirror = match self.sync(repo) {
            Ok(mirror) => mirror,
            Err(e) => {
                log::error!("Failed to get history for {hostname}: {e}");
                return Vec::new();
            }
        };

        let git = Git::new(&self.git, &mirror.path, repo);
        if !git.succeeds(["rev-parse", "--verify", "--quiet", "HEAD"]) {
            return Vec::new();
        }

        let count = format!("--max-count={limit}");
        let output = match git.output([
            "log",
            count.as_str(),
            "--format=%H%x1f%an%x1f%cI%x1f%B%x1e",
            "--",
            file.as_str(),
        ]) {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                log::error!(
                    "Failed to get history for {hostname}: {}",
                    git.failure(SyncStage::Pull, &output)
                );
                return Vec::new();
            }
            Err(e) => {
                log::error!("Failed to get history for {hostname}: {e}");
                return Vec::new();
            }
        };

        parse_log(&String::from_utf8_lossy(&output.stdout))
    }

    /// Exact content of `hostname`'s file at commit `hash`.
    ///
    /// `None` when the commit or the file at that commit does not exist, or
    /// the mirror cannot be synced. An empty file is `Some("")`.
    pub fn content_at(&self, repo: &TenantRepository, hostname: &str, hash: &str) -> Option<String> {
        let file = checked_lookup(hostname, &[hash])?;
        let lock = self.locks.get(repo.tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mirror = self.synced_for_read(repo, hostname)?;
        let git = Git::new(&self.git, &mirror.path, repo);
        read_at(&git, hash, &file)
    }

    /// Unified diff of `hostname`'s file between two commits.
    ///
    /// `None` when either side cannot be read.
    pub fn diff(&self, repo: &TenantRepository, hostname: &str, from: &str, to: &str) -> Option<String> {
        let file = checked_lookup(hostname, &[from, to])?;
        let lock = self.locks.get(repo.tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mirror = self.synced_for_read(repo, hostname)?;
        let git = Git::new(&self.git, &mirror.path, repo);

        let old = read_at(&git, from, &file)?;
        let new = read_at(&git, to, &file)?;
        let old_header = format!("{file}@{}", short(from));
        let new_header = format!("{file}@{}", short(to));

        Some(
            TextDiff::from_lines(&old, &new)
                .unified_diff()
                .context_radius(3)
                .header(&old_header, &new_header)
                .to_string(),
        )
    }

    fn synced_for_read(&self, repo: &TenantRepository, hostname: &str) -> Option<Mirror> {
        match self.sync(repo) {
            Ok(mirror) => Some(mirror),
            Err(e) => {
                log::error!("Failed to read configuration of {hostname}: {e}");
                None
            }
        }
    }

    /// Clone or fast-forward the mirror. Caller holds the tenant lock.
    fn sync(&self, repo: &TenantRepository) -> Result<Mirror> {
        let path = self.layout.mirror_path(repo.tenant_id);

        if path.join(".git").exists() {
            let git = Git::new(&self.git, &path, repo);
            let url = repo.authenticated_url();
            git.run(SyncStage::Pull, ["remote", "set-url", "origin", url.as_str()])?;
            git.run(SyncStage::Pull, ["fetch", "--quiet", "origin"])?;

            let current = git
                .output(["symbolic-ref", "--short", "HEAD"])
                .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
                .unwrap_or_default();
            if current != repo.branch {
                checkout(&git, repo)?;
            }

            let upstream = format!("origin/{}", repo.branch);
            if remote_branch_exists(&git, &repo.branch) {
                git.run(SyncStage::Pull, ["merge", "--ff-only", "--quiet", upstream.as_str()])?;
            }
            log::debug!("Mirror for tenant {} is up to date", repo.tenant_id);
        } else {
            fs::create_dir_all(self.layout.root())?;
            log::info!(
                "Cloning repository for tenant {} into {}",
                repo.tenant_id,
                path.display()
            );
            git::clone(&self.git, repo, &path)?;
            checkout(&Git::new(&self.git, &path, repo), repo)?;
        }

        Ok(Mirror {
            path,
            branch: repo.branch.clone(),
        })
    }
}

/// Put the mirror on the configured branch, creating it when needed.
fn checkout(git: &Git<'_>, repo: &TenantRepository) -> Result<()> {
    let branch = repo.branch.as_str();
    git.run(SyncStage::Checkout, ["check-ref-format", "--branch", branch])?;

    let local = format!("refs/heads/{branch}");
    if remote_branch_exists(git, branch) {
        let upstream = format!("origin/{branch}");
        if git.succeeds(["rev-parse", "--verify", "--quiet", local.as_str()]) {
            git.run(SyncStage::Checkout, ["checkout", "--quiet", branch])?;
        } else {
            git.run(
                SyncStage::Checkout,
                ["checkout", "--quiet", "-b", branch, upstream.as_str()],
            )?;
        }
    } else if !git.succeeds(["rev-parse", "--verify", "--quiet", "HEAD"]) {
        // Empty remote: the first commit creates the branch.
        git.run(SyncStage::Checkout, ["symbolic-ref", "HEAD", local.as_str()])?;
    } else if git.succeeds(["rev-parse", "--verify", "--quiet", local.as_str()]) {
        git.run(SyncStage::Checkout, ["checkout", "--quiet", branch])?;
    } else {
        git.run(SyncStage::Checkout, ["checkout", "--quiet", "-b", branch])?;
    }
    Ok(())
}

fn remote_branch_exists(git: &Git<'_>, branch: &str) -> bool {
    let remote = format!("refs/remotes/origin/{branch}");
    git.succeeds(["rev-parse", "--verify", "--quiet", remote.as_str()])
}

fn read_at(git: &Git<'_>, hash: &str, file: &str) -> Option<String> {
    let commit = format!("{hash}^{{commit}}");
    if !git.succeeds(["cat-file", "-e", commit.as_str()]) {
        log::warn!("Commit {hash} not found");
        return None;
    }

    let object = format!("{hash}:{file}");
    let output = git.output(["cat-file", "blob", object.as_str()]).ok()?;
    if !output.status.success() {
        log::warn!("{file} does not exist at commit {hash}");
        return None;
    }

    Some(String::from_utf8(output.stdout).unwrap_or_else(|e| {
        log::warn!("{file} at {hash} is not valid UTF-8");
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    }))
}

/// File name holding `hostname`'s configuration.
fn config_file(hostname: &str) -> Result<String> {
    if !HOSTNAME.is_match(hostname) || hostname.contains("..") {
        return Err(Error::InvalidHostname(hostname.to_string()));
    }
    Ok(format!("{hostname}.conf"))
}

fn checked_lookup(hostname: &str, hashes: &[&str]) -> Option<String> {
    let file = match config_file(hostname) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("{e}");
            return None;
        }
    };
    if let Some(bad) = hashes.iter().find(|h| !COMMIT_HASH.is_match(h)) {
        log::warn!("'{bad}' is not a commit hash");
        return None;
    }
    Some(file)
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Parse `git log` output written with unit and record separators.
fn parse_log(raw: &str) -> Vec<CommitRecord> {
    raw.split('\u{1e}')
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(4, '\u{1f}');
            let hash = fields.next()?.trim();
            let author = fields.next()?;
            let date = fields.next()?;
            let message = fields.next().unwrap_or_default();

            let timestamp = match DateTime::parse_from_rfc3339(date.trim()) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    log::warn!("Unparseable date '{date}' on commit {hash}: {e}");
                    return None;
                }
            };

            Some(CommitRecord {
                hash: hash.to_string(),
                author: author.to_string(),
                timestamp,
                message: message.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn git_available() -> bool {
        which::which("git").is_ok()
    }

    /// Bare repository with `main` as its default branch, and no commits.
    fn bare_remote(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        let status = Command::new("git")
            .args(["init", "--bare", "--quiet"])
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        let status = Command::new("git")
            .arg("-C")
            .arg(&path)
            .args(["symbolic-ref", "HEAD", "refs/heads/main"])
            .status()
            .unwrap();
        assert!(status.success());
        path.to_string_lossy().into_owned()
    }

    fn vault_in(dir: &Path, name: &str) -> ConfigVault {
        ConfigVault::new(MirrorLayout::new(dir.join(name))).unwrap()
    }

    const FIRST: &str = "hostname SW-TEST-01\ninterface GigabitEthernet0/1\n description uplink\n";
    const SECOND: &str = "hostname SW-TEST-01\ninterface GigabitEthernet0/1\n description uplink\n shutdown\n";

    #[test]
    fn test_backup_history_scenario() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(999, remote, "main");

        assert!(vault.commit(&repo, "SW-TEST-01", FIRST, "Initial backup").unwrap());
        assert!(!vault.commit(&repo, "SW-TEST-01", FIRST, "Same again").unwrap());
        assert!(vault.commit(&repo, "SW-TEST-01", SECOND, "Interface shut").unwrap());

        let history = vault.history(&repo, "SW-TEST-01", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "Interface shut");
        assert_eq!(history[1].message, "Initial backup");
        assert_eq!(history[0].author, "netfleet");
        assert_eq!(
            vault.content_at(&repo, "SW-TEST-01", &history[1].hash).as_deref(),
            Some(FIRST)
        );
        assert_eq!(
            vault.content_at(&repo, "SW-TEST-01", &history[0].hash).as_deref(),
            Some(SECOND)
        );
        assert_eq!(vault.history(&repo, "SW-TEST-01", 1).len(), 1);
        assert!(tmp.path().join("mirrors/tenant_999/SW-TEST-01.conf").exists());
    }

    #[test]
    fn test_commits_reach_the_remote() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let repo = TenantRepository::new(1, remote, "main");

        let a = vault_in(tmp.path(), "a");
        let b = vault_in(tmp.path(), "b");

        assert!(a.commit(&repo, "r1", "v1\n", "one").unwrap());
        assert_eq!(b.history(&repo, "r1", 10).len(), 1);
        assert!(b.commit(&repo, "r1", "v2\n", "two").unwrap());
        // a has to fast-forward over b's commit before pushing
        assert!(a.commit(&repo, "r1", "v3\n", "three").unwrap());

        let messages: Vec<_> = b
            .history(&repo, "r1", 10)
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_empty_file_versus_not_found() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(1, remote, "main");

        assert!(vault.commit(&repo, "EMPTY-01", "", "empty").unwrap());
        let hash = vault.history(&repo, "EMPTY-01", 1)[0].hash.clone();

        assert_eq!(vault.content_at(&repo, "EMPTY-01", &hash).as_deref(), Some(""));
        assert_eq!(vault.content_at(&repo, "OTHER-01", &hash), None);
        assert_eq!(vault.content_at(&repo, "EMPTY-01", "deadbeef"), None);
        assert_eq!(vault.content_at(&repo, "EMPTY-01", "HEAD~1"), None);
    }

    #[test]
    fn test_history_of_unknown_device_is_empty() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(1, remote, "main");

        assert!(vault.history(&repo, "NOPE", 10).is_empty());
        vault.commit(&repo, "r1", "x\n", "one").unwrap();
        assert!(vault.history(&repo, "NOPE", 10).is_empty());
    }

    #[test]
    fn test_invalid_hostnames_are_rejected() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(1, remote, "main");

        for bad in ["../escape", "a/b", "", "-rf", "sw..1"] {
            let err = vault.commit(&repo, bad, "x", "m").unwrap_err();
            assert!(matches!(err, Error::InvalidHostname(_)), "{bad}");
            assert!(vault.history(&repo, bad, 10).is_empty());
        }
    }

    #[test]
    fn test_tenants_are_partitioned() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(tmp.path(), "mirrors");
        let one = TenantRepository::new(1, bare_remote(tmp.path(), "one.git"), "main");
        let two = TenantRepository::new(2, bare_remote(tmp.path(), "two.git"), "main");

        vault.commit(&one, "edge", "tenant one\n", "backup").unwrap();
        vault.commit(&two, "edge", "tenant two\n", "backup").unwrap();

        let h1 = vault.history(&one, "edge", 10);
        let h2 = vault.history(&two, "edge", 10);
        assert_eq!(h1.len(), 1);
        assert_eq!(h2.len(), 1);
        assert_eq!(vault.content_at(&one, "edge", &h1[0].hash).as_deref(), Some("tenant one\n"));
        assert_eq!(vault.content_at(&two, "edge", &h2[0].hash).as_deref(), Some("tenant two\n"));
        assert_eq!(vault.content_at(&one, "edge", &h2[0].hash), None);
    }

    #[test]
    fn test_concurrent_commits_for_one_tenant() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = Arc::new(vault_in(tmp.path(), "mirrors"));
        let repo = TenantRepository::new(5, remote, "main");

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let vault = Arc::clone(&vault);
                let repo = repo.clone();
                std::thread::spawn(move || {
                    vault.commit(&repo, &format!("sw-{i}"), &format!("hostname sw-{i}\n"), "backup")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().unwrap());
        }
        for i in 0..4 {
            assert_eq!(vault.history(&repo, &format!("sw-{i}"), 10).len(), 1);
        }
    }

    #[test]
    fn test_clone_failure_is_a_sync_error() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(tmp.path(), "mirrors");
        let missing = tmp.path().join("missing.git").to_string_lossy().into_owned();
        let repo = TenantRepository::new(1, missing, "main");

        let err = vault.commit(&repo, "r1", "x", "m").unwrap_err();
        assert_eq!(err.stage(), Some(SyncStage::Clone));
        assert!(vault.history(&repo, "r1", 10).is_empty());
        assert_eq!(vault.content_at(&repo, "r1", "abcdef12"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_push_failure_keeps_local_commit() {
        use std::os::unix::fs::PermissionsExt;

        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(1, remote.clone(), "main");

        assert!(vault.commit(&repo, "r1", "v1\n", "one").unwrap());

        let hook = Path::new(&remote).join("hooks/pre-receive");
        fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();

        let err = vault.commit(&repo, "r1", "v2\n", "two").unwrap_err();
        assert_eq!(err.stage(), Some(SyncStage::Push));

        let history = vault.history(&repo, "r1", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "two");
    }

    #[test]
    fn test_diff_between_snapshots() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), "remote.git");
        let vault = vault_in(tmp.path(), "mirrors");
        let repo = TenantRepository::new(1, remote, "main");

        vault.commit(&repo, "r1", FIRST, "one").unwrap();
        vault.commit(&repo, "r1", SECOND, "two").unwrap();
        let history = vault.history(&repo, "r1", 10);

        let diff = vault
            .diff(&repo, "r1", &history[1].hash, &history[0].hash)
            .unwrap();
        assert!(diff.contains("+ shutdown"));
        assert!(diff.contains(&format!("r1.conf@{}", &history[1].hash[..8])));
        assert_eq!(vault.diff(&repo, "r1", "deadbeef", &history[0].hash), None);
    }

    #[test]
    fn test_parse_log() {
        let raw = "abc123\u{1f}netfleet\u{1f}2025-01-02T03:04:05+00:00\u{1f}Initial backup\n\n\u{1e}\n\
                   def456\u{1f}ops\u{1f}2025-01-01T00:00:00-05:00\u{1f}multi\nline\n\u{1e}\n";
        let records = parse_log(raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "abc123");
        assert_eq!(records[0].message, "Initial backup");
        assert_eq!(records[1].message, "multi\nline");
        assert_eq!(records[1].timestamp.to_rfc3339(), "2025-01-01T05:00:00+00:00");
    }

    #[test]
    fn test_config_file_validation() {
        assert_eq!(config_file("SW-TEST-01").unwrap(), "SW-TEST-01.conf");
        assert_eq!(config_file("edge.lab_1").unwrap(), "edge.lab_1.conf");
        assert!(config_file("a/b").is_err());
        assert!(config_file("..").is_err());
        assert!(config_file(" spaced").is_err());
    }
}
