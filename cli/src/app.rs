//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the cross-cutting pieces every command needs: terminal
//! output, the state directory, loaded tool configuration, and the process
//! runner shared by the adapters.

use std::path::PathBuf;

use anyhow::Result;
use envboot_common::EnvState;

use crate::application::ports::ConfigStore;
use crate::domain::EnvbootConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::state::{StateBootstrap, StateManager};
use crate::output::{OutputContext, TerminalReporter};

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress progress output. Warnings still print.
    pub quiet: bool,
}

/// Cloud credential references supplied on the command line or env.
#[derive(Default)]
pub struct CredentialFlags {
    pub profile: Option<String>,
    pub region: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    /// Directory holding the environment state.
    pub state_dir: PathBuf,
    pub credentials: CredentialFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Tool configuration.
    pub config: EnvbootConfig,
    /// Environment state store.
    pub state_mgr: StateManager,
    /// Process runner shared by every adapter.
    pub runner: TokioCommandRunner,
    credentials: CredentialFlags,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let config = YamlConfigStore.load()?;
        let runner = TokioCommandRunner::new(config.timeouts.command());
        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            runner,
            state_mgr: StateManager::new(flags.state_dir),
            config,
            credentials: flags.credentials,
        })
    }

    /// Returns a `TerminalReporter` wrapping this context's output.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Load the environment state through the compatibility gate, then
    /// apply credential references given for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory is missing, the file is
    /// unreadable, or its schema version is unsupported.
    pub async fn load_state(&self) -> Result<EnvState> {
        let dir = crate::application::ports::StateStore::working_directory(&self.state_mgr);
        let mut state = StateBootstrap::default()
            .load(dir, &self.terminal_reporter())
            .await?;
        if let Some(profile) = &self.credentials.profile {
            state.credentials.profile.clone_from(profile);
        }
        if let Some(region) = &self.credentials.region {
            state.credentials.region.clone_from(region);
        }
        Ok(state)
    }
}
