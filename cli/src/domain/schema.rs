//! State schema compatibility registry and version gate.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use std::collections::BTreeMap;

use envboot_common::{EnvState, MIN_SUPPORTED_SCHEMA, STATE_SCHEMA};

use crate::domain::error::SchemaError;

/// Tool version reported for schema versions with no recorded release.
pub const DEV_TOOL_VERSION: &str = "dev";

/// Earliest tool release that wrote each historical schema version.
const SCHEMA_RELEASES: &[(u32, &str)] = &[
    (3, "3.0.0"),
    (5, "4.0.0"),
    (6, "4.0.0"),
    (7, "4.0.0"),
    (8, "4.0.0"),
    (9, "4.4.0"),
    (10, "4.6.0"),
    (11, "5.1.0"),
    (12, "5.1.0"),
    (13, "5.4.0"),
];

/// Result of a successful version gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Written by this schema version.
    Current,
    /// Written by an older, still supported schema version.
    Older { found: u32, current: u32 },
}

impl Compatibility {
    /// Warning to show the operator, if any.
    #[must_use]
    pub fn warning(self) -> Option<String> {
        match self {
            Self::Current => None,
            Self::Older { found, current } => Some(format!(
                "Current schema version ({current}) is newer than existing environment schema ({found}). \
Some things may not work as expected until you run 'envboot up' again."
            )),
        }
    }
}

/// Read-only lookup of supported schema versions and their releases.
#[derive(Debug, Clone)]
pub struct CompatibilityRegistry {
    minimum: u32,
    current: u32,
    releases: BTreeMap<u32, &'static str>,
}

impl CompatibilityRegistry {
    /// Registry for the running release.
    #[must_use]
    pub fn current() -> Self {
        Self {
            minimum: MIN_SUPPORTED_SCHEMA,
            current: STATE_SCHEMA,
            releases: SCHEMA_RELEASES.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn current_schema(&self) -> u32 {
        self.current
    }

    /// Earliest release known to write `schema`, or `"dev"`.
    #[must_use]
    pub fn tool_version_for(&self, schema: u32) -> &'static str {
        self.releases.get(&schema).copied().unwrap_or(DEV_TOOL_VERSION)
    }

    /// Fill in fields that legacy records lack. Applied once, at load time.
    pub fn backfill(&self, state: &mut EnvState) {
        if state.tool_version.is_empty() {
            state.tool_version = self.tool_version_for(state.schema_version).to_string();
        }
    }

    /// Decide whether a record with this schema version may be loaded.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Incompatible` below the minimum and
    /// `SchemaError::NewerTool` above the current version.
    pub fn check(&self, state: &EnvState) -> Result<Compatibility, SchemaError> {
        let found = state.schema_version;
        if found < self.minimum {
            return Err(SchemaError::Incompatible { found });
        }
        if found > self.current {
            return Err(SchemaError::NewerTool {
                tool_version: state.tool_version.clone(),
            });
        }
        if found < self.current {
            return Ok(Compatibility::Older {
                found,
                current: self.current,
            });
        }
        Ok(Compatibility::Current)
    }
}
