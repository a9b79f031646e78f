//! Domain types for envboot tool configuration.
//!
//! Pure types only. No I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.envboot/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EnvbootConfig {
    /// External tool binaries.
    pub tools: ToolsConfig,
    /// Template locations.
    pub templates: TemplatesConfig,
    /// Process timeouts.
    pub timeouts: TimeoutsConfig,
}

/// Names or paths of the external binaries envboot drives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub terraform: String,
    pub bosh: String,
    pub aws: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            terraform: "terraform".to_string(),
            bosh: "bosh".to_string(),
            aws: "aws".to_string(),
        }
    }
}

/// Where infrastructure and director templates live.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of `*.tf` files copied into the terraform working directory.
    pub terraform: Option<PathBuf>,
    /// Directory holding `jumpbox.yml` and `bosh.yml`.
    pub director: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Upper bound for a single external command, in seconds.
    pub command_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self { command_secs: 3600 }
    }
}

impl TimeoutsConfig {
    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
