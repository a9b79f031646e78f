//! Infrastructure implementation of the `StateStore` port and the load-time
//! compatibility gate.
//!
//! `StateManager` writes with `tokio::task::spawn_blocking` and an atomic
//! temp file + rename so a crash mid-write never truncates the state file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use envboot_common::{EnvState, STATE_FILE_NAME, STATE_SCHEMA};

use crate::application::ports::{ProgressReporter, StateStore};
use crate::domain::CompatibilityRegistry;

/// Release stamped into every state file this binary writes.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// State file manager: implements `StateStore` for one state directory.
#[derive(Debug, Clone)]
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Full path of the state file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    /// Synchronous save, used by `set` via `spawn_blocking`.
    fn save_sync(path: &Path, state: &EnvState) -> Result<()> {
        let mut stamped = state.clone();
        stamped.schema_version = STATE_SCHEMA;
        stamped.tool_version = TOOL_VERSION.to_string();

        let content = serde_json::to_string_pretty(&stamped).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;
        Ok(())
    }
}

impl StateStore for StateManager {
    async fn set(&self, state: &EnvState) -> Result<()> {
        let path = self.path();
        let state = state.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &state))
            .await
            .context("state save task panicked")?
    }

    fn working_directory(&self) -> &Path {
        &self.dir
    }
}

/// Loads the persisted state and decides whether this release may use it.
///
/// Never writes; the only side effect is the compatibility warning.
#[derive(Debug, Clone)]
pub struct StateBootstrap {
    registry: CompatibilityRegistry,
}

impl Default for StateBootstrap {
    fn default() -> Self {
        Self::new(CompatibilityRegistry::current())
    }
}

impl StateBootstrap {
    #[must_use]
    pub fn new(registry: CompatibilityRegistry) -> Self {
        Self { registry }
    }

    /// Load the state held in `dir`.
    ///
    /// A missing file is a first run and yields the zero state. A blank file
    /// (whitespace or `{}`) yields a state stamped with the current versions.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` does not exist, the file cannot be read or
    /// parsed, or its schema version falls outside the supported range.
    pub async fn load(&self, dir: &Path, reporter: &impl ProgressReporter) -> Result<EnvState> {
        let path = dir.join(STATE_FILE_NAME);
        let dir_owned = dir.to_path_buf();
        let content = tokio::task::spawn_blocking(move || read_state_file(&dir_owned, &path))
            .await
            .context("state load task panicked")??;

        let Some(content) = content else {
            tracing::debug!(dir = %dir.display(), "no state file; first run");
            return Ok(EnvState::default());
        };
        self.parse(&content, reporter)
    }

    /// Apply the blank-file rule, the legacy backfill, and the version gate.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a state document or its schema
    /// version is unsupported.
    pub fn parse(&self, content: &str, reporter: &impl ProgressReporter) -> Result<EnvState> {
        let mut state = if content.trim().is_empty() {
            EnvState::default()
        } else {
            serde_json::from_str::<EnvState>(content).context("parsing state file")?
        };

        if state.is_blank() {
            state.schema_version = self.registry.current_schema();
            state.tool_version = TOOL_VERSION.to_string();
            return Ok(state);
        }

        self.registry.backfill(&mut state);
        let compatibility = self.registry.check(&state)?;
        if let Some(warning) = compatibility.warning() {
            tracing::debug!(
                found = state.schema_version,
                current = self.registry.current_schema(),
                "loading state written by an older schema"
            );
            reporter.warn(&warning);
        }
        Ok(state)
    }
}

/// `Ok(None)` when the directory exists but holds no state file.
fn read_state_file(dir: &Path, path: &Path) -> Result<Option<String>> {
    let meta = std::fs::metadata(dir)
        .with_context(|| format!("state directory {} is not accessible", dir.display()))?;
    anyhow::ensure!(meta.is_dir(), "{} is not a directory", dir.display());
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("reading state file {}", path.display()))
}
