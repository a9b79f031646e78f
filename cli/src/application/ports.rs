//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `envboot_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;
use envboot_common::{CredentialsRef, Director, EnvState};

use crate::domain::{CloudConfigInput, EnvbootConfig, Outcome, Outputs, Stack, StackUpdate};

// ── Value Types ───────────────────────────────────────────────────────────────

/// One external process invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: &'a [&'a str],
    /// Working directory; inherits the caller's when `None`.
    pub dir: Option<&'a Path>,
    /// Extra environment variables.
    pub env: &'a [(&'a str, &'a str)],
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub fn new(program: &'a str, args: &'a [&'a str]) -> Self {
        Self {
            program,
            args,
            dir: None,
            env: &[],
        }
    }

    #[must_use]
    pub fn in_dir(mut self, dir: &'a Path) -> Self {
        self.dir = Some(dir);
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: &'a [(&'a str, &'a str)]) -> Self {
        self.env = env;
        self
    }
}

/// How to reach a running director.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorTarget {
    pub address: String,
    pub username: String,
    pub password: String,
    pub ca_cert: String,
}

impl From<&Director> for DirectorTarget {
    fn from(director: &Director) -> Self {
        Self {
            address: director.address.clone(),
            username: director.username.clone(),
            password: director.password.clone(),
            ca_cert: director.ca_cert.clone(),
        }
    }
}

// ── Process Port ──────────────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program to completion and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. A non-zero exit is not an error at this level.
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State, Config and Filesystem Ports ────────────────────────────────────────

/// Durable storage of the environment state.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Persist the full state object, replacing what is on disk.
    async fn set(&self, state: &EnvState) -> Result<()>;
    /// Directory that holds the state file and its sidecars.
    fn working_directory(&self) -> &Path;
}

/// Tool configuration source.
pub trait ConfigStore {
    /// Load configuration, falling back to defaults when none exists.
    fn load(&self) -> Result<EnvbootConfig>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

/// Raw local file access used for ops-file handling.
pub trait LocalFs {
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

// ── Provisioning Ports ────────────────────────────────────────────────────────

/// Checks that cloud credentials are present and usable.
pub trait CredentialValidator {
    fn validate(&self, credentials: &CredentialsRef) -> Result<()>;
}

/// Resolves or generates the environment identifier.
#[allow(async_fn_in_trait)]
pub trait EnvIdSynchronizer {
    /// Idempotent: an already populated `env_id` is returned unchanged.
    async fn sync(&self, state: EnvState, requested_name: &str) -> Result<EnvState>;
}

/// The infrastructure provisioning engine.
#[allow(async_fn_in_trait)]
pub trait ProvisioningEngine {
    async fn validate_version(&self) -> Result<()>;
    fn is_initialized(&self) -> bool;
    async fn init(&self, state: &EnvState) -> Result<()>;
    /// Reconcile infrastructure. A failure may still carry engine state.
    async fn apply(&self, state: EnvState) -> Outcome;
    async fn get_outputs(&self, state: &EnvState) -> Result<Outputs>;
}

/// Engine-level stack operations used by teardown commands.
#[allow(async_fn_in_trait)]
pub trait InfrastructureManager {
    /// Whether the stack recorded in `state` exists. The engine may rebuild
    /// its local working copy from the record to answer.
    async fn exists(&self, state: &EnvState) -> Result<bool>;
    async fn describe(&self, stack_name: &str) -> Result<Stack>;
    /// Apply `params` to the stack. The returned state mirrors the engine
    /// state the run left behind, also when the run failed part way.
    async fn update(&self, state: EnvState, params: &StackUpdate<'_>) -> Outcome;
}

/// Jump host and director lifecycle.
#[allow(async_fn_in_trait)]
pub trait DirectorManager {
    async fn validate_version(&self) -> Result<()>;
    async fn initialize_jumpbox(&self, state: &EnvState, outputs: &Outputs) -> Result<()>;
    async fn create_jumpbox(&self, state: EnvState, jumpbox_url: &str) -> Result<EnvState>;
    async fn initialize_director(&self, state: &EnvState, outputs: &Outputs) -> Result<()>;
    /// Create or update the director. A failure may carry a half-created record.
    async fn create_director(&self, state: EnvState) -> Outcome;
}

/// Pushes derived infrastructure facts into the director's cloud config.
#[allow(async_fn_in_trait)]
pub trait CloudConfigManager {
    /// Derive the cloud config from `state` and apply it.
    async fn update(&self, state: &EnvState) -> Result<()>;
    /// Apply an explicit cloud-config input to `director`.
    async fn apply(&self, input: &CloudConfigInput, director: &DirectorTarget) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait AvailabilityZoneRetriever {
    async fn retrieve(&self, region: &str) -> Result<Vec<String>>;
}

#[allow(async_fn_in_trait)]
pub trait CertificateManager {
    async fn delete(&self, certificate_name: &str) -> Result<()>;
}
