//! Platform classification and transport strategy selection.
//!
//! A device's free-text vendor string is normalized into a closed
//! [`PlatformTag`], and the tag alone decides which [`Strategy`] is used to
//! push configuration to it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized device platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PlatformTag {
    Ios,
    IosXr,
    Junos,
    Eos,
    Huawei,
    /// Unrecognized platform, kept in its lowercased form
    Other(String),
}

impl PlatformTag {
    /// Normalize a vendor string.
    ///
    /// Substring rules on the lowercased vendor, in order: "cisco" → ios,
    /// "juniper" → junos, "huawei" → huawei. Anything else passes through
    /// lowercased and is parsed as a tag.
    pub fn from_vendor(vendor: &str) -> Self {
        let lower = vendor.trim().to_lowercase();

        if lower.contains("cisco") {
            Self::Ios
        } else if lower.contains("juniper") {
            Self::Junos
        } else if lower.contains("huawei") {
            Self::Huawei
        } else {
            Self::from_tag(&lower)
        }
    }

    /// Parse an already-normalized tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ios" => Self::Ios,
            "iosxr" => Self::IosXr,
            "junos" => Self::Junos,
            "eos" => Self::Eos,
            "huawei" => Self::Huawei,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ios => "ios",
            Self::IosXr => "iosxr",
            Self::Junos => "junos",
            Self::Eos => "eos",
            Self::Huawei => "huawei",
            Self::Other(tag) => tag,
        }
    }

    /// Strategy used to push configuration to this platform.
    pub fn strategy(&self) -> Strategy {
        Strategy::for_platform(self)
    }

    /// Command that prints the running configuration.
    pub fn running_config_command(&self) -> &'static str {
        match self {
            Self::Ios | Self::IosXr | Self::Eos | Self::Huawei => "show running-config",
            Self::Other(tag) if tag.contains("ruijie") => "show running-config",
            Self::Junos | Self::Other(_) => "show configuration",
        }
    }

    /// Commands entering and leaving line-by-line configuration mode.
    pub fn config_mode(&self) -> (&'static str, &'static str) {
        match self {
            Self::Huawei => ("system-view", "return"),
            Self::Junos => ("configure", "commit and-quit"),
            _ => ("configure terminal", "end"),
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PlatformTag {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<PlatformTag> for String {
    fn from(tag: PlatformTag) -> Self {
        tag.as_str().to_string()
    }
}

/// How configuration is pushed to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Whole-change transaction with optional dry-run preview
    Atomic,
    /// Discrete command lines, no rollback, no preview
    Incremental,
}

impl Strategy {
    /// Fixed policy table: junos, iosxr and eos are transactional.
    pub fn for_platform(platform: &PlatformTag) -> Self {
        match platform {
            PlatformTag::Junos | PlatformTag::IosXr | PlatformTag::Eos => Self::Atomic,
            _ => Self::Incremental,
        }
    }

    pub fn supports_dry_run(&self) -> bool {
        matches!(self, Self::Atomic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Incremental => "incremental",
        }
    }
}
