//! Implements the `EnvIdSynchronizer` port.

use anyhow::Result;
use envboot_common::EnvState;

use crate::application::ports::EnvIdSynchronizer;
use crate::domain::env_id::{generate_env_id, validate_env_name};

/// Keeps an existing id, adopts a valid requested name, or generates one.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvIdManager;

impl EnvIdSynchronizer for EnvIdManager {
    async fn sync(&self, mut state: EnvState, requested_name: &str) -> Result<EnvState> {
        if !state.env_id.is_empty() {
            return Ok(state);
        }
        state.env_id = if requested_name.is_empty() {
            generate_env_id()
        } else {
            validate_env_name(requested_name)?;
            requested_name.to_string()
        };
        tracing::debug!(env_id = %state.env_id, "assigned environment id");
        Ok(state)
    }
}
