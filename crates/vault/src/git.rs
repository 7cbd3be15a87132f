//! Thin wrapper over the git executable.

use crate::error::{Error, Result, SyncStage};
use crate::types::TenantRepository;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// git invocations bound to one working tree.
pub(crate) struct Git<'a> {
    binary: &'a Path,
    dir: &'a Path,
    repo: &'a TenantRepository,
}

impl<'a> Git<'a> {
    pub(crate) fn new(binary: &'a Path, dir: &'a Path, repo: &'a TenantRepository) -> Self {
        Self { binary, dir, repo }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.binary);
        cmd.arg("-C")
            .arg(self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");
        cmd
    }

    /// Run and return the raw output, whatever the exit status.
    pub(crate) fn output<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Ok(self.command().args(args).output()?)
    }

    /// Run and return stdout, failing with `stage` on a non-zero exit.
    pub(crate) fn run<I, S>(&self, stage: SyncStage, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(self.failure(stage, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether the command exits successfully.
    pub(crate) fn succeeds<I, S>(&self, args: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.output(args).is_ok_and(|o| o.status.success())
    }

    pub(crate) fn failure(&self, stage: SyncStage, output: &Output) -> Error {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Error::sync(self.repo.tenant_id, stage, self.repo.redact(last_line(&stderr)))
    }
}

/// Locate the git executable.
pub(crate) fn find_git() -> Result<PathBuf> {
    which::which("git").map_err(|_| Error::GitNotFound)
}

/// Clone `repo` into `dest`, which must not exist yet.
pub(crate) fn clone(binary: &Path, repo: &TenantRepository, dest: &Path) -> Result<()> {
    let output = Command::new(binary)
        .args(["clone", "--quiet"])
        .arg(repo.authenticated_url())
        .arg(dest)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::sync(repo.tenant_id, SyncStage::Clone, repo.redact(last_line(&stderr))));
    }
    Ok(())
}

/// git prints the fatal reason last.
fn last_line(stderr: &str) -> &str {
    stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}
