//! Environment identifier validation and generation.

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;

use crate::domain::error::UpError;

static ENV_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{0,61}[a-z0-9]$").ok());

/// Validates a requested environment name.
///
/// Names end up in cloud resource names, so they are limited to lowercase
/// alphanumerics and hyphens.
///
/// # Errors
///
/// Returns `UpError::InvalidName` if the name does not match.
pub fn validate_env_name(name: &str) -> Result<()> {
    let valid = ENV_NAME.as_ref().is_some_and(|re| re.is_match(name));
    if !valid {
        return Err(UpError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// Generate a fresh environment identifier.
///
/// Format: `env-<yyyy-mm-dd>-` followed by 8 lowercase hex characters.
#[must_use]
pub fn generate_env_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    let suffix = hasher.finish() & 0xffff_ffff;
    format!("env-{}-{suffix:08x}", Utc::now().format("%Y-%m-%d"))
}
