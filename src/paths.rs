//! Path resolution for netfleet
//!
//! # Environment Variables
//!
//! - `NETFLEET_CONFIG_DIR` - Override config directory
//! - `NETFLEET_STATE_DIR` - Override state directory (registry, mirrors)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `NETFLEET_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/netfleet` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\netfleet`
//!    - macOS/Linux: `~/.config/netfleet`
//!
//! For state_dir():
//! 1. `NETFLEET_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/netfleet` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\netfleet`
//!    - macOS/Linux: `~/.local/state/netfleet`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "NETFLEET_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "NETFLEET_STATE_DIR";

const APP: &str = "netfleet";

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "netfleet.toml";

/// Get the netfleet config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the netfleet state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// `<config dir>/netfleet.toml`
pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, PoisonError};

    /// Serializes tests that touch the directory variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        let _env = env_lock();
        with_env_var(ENV_CONFIG_DIR, "/custom/netfleet/config", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/netfleet/config"));
            assert_eq!(
                settings_file().unwrap(),
                PathBuf::from("/custom/netfleet/config/netfleet.toml")
            );
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let _env = env_lock();
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, "~/netfleet-tilde-test", || {
            assert_eq!(config_dir().unwrap(), home.join("netfleet-tilde-test"));
        });
    }

    #[test]
    fn test_state_dir_env_override() {
        let _env = env_lock();
        with_env_var(ENV_STATE_DIR, "/custom/netfleet/state", || {
            assert_eq!(state_dir().unwrap(), PathBuf::from("/custom/netfleet/state"));
        });
    }

    #[test]
    fn test_xdg_config_home() {
        let _env = env_lock();
        without_env_var(ENV_CONFIG_DIR, || {
            with_env_var("XDG_CONFIG_HOME", "/tmp/xdg-config-test", || {
                assert_eq!(config_dir().unwrap(), PathBuf::from("/tmp/xdg-config-test/netfleet"));
            });
        });
    }

    #[test]
    fn test_xdg_state_home() {
        let _env = env_lock();
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg-state-test/netfleet"));
            });
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_default_state_dir_unix() {
        let _env = env_lock();
        without_env_var(ENV_STATE_DIR, || {
            without_env_var("XDG_STATE_HOME", || {
                let home = dirs::home_dir().unwrap();
                assert_eq!(
                    state_dir().unwrap(),
                    home.join(".local").join("state").join("netfleet")
                );
            });
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/backups/registry.db"), home.join("backups").join("registry.db"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("NETFLEET_TEST_VAR", "acme", || {
            assert_eq!(expand("/srv/$NETFLEET_TEST_VAR/db"), PathBuf::from("/srv/acme/db"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        assert_eq!(
            expand("/path/$NONEXISTENT_VAR_12345/file"),
            PathBuf::from("/path/$NONEXISTENT_VAR_12345/file")
        );
    }
}
