//! Application service: `up` use-case.
//!
//! Drives the create/update path in a fixed phase order. Every phase that
//! leaves something durable behind in the outside world is followed by a
//! checkpoint, and failures at or after infrastructure creation persist the
//! partial state their collaborator returned before the error surfaces.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use envboot_common::EnvState;

use crate::application::checkpoint::Checkpointer;
use crate::application::ports::{
    CloudConfigManager, DirectorManager, EnvIdSynchronizer, LocalFs, ProgressReporter,
    ProvisioningEngine, StateStore,
};
use crate::domain::{Phase, UpError};

/// Sidecar holding the overlay of the previous run; default `--ops-file`.
pub const PREVIOUS_OPS_FILE: &str = "previous-user-ops-file.yml";

/// Terraform output naming the jump host endpoint.
const JUMPBOX_URL_OUTPUT: &str = "jumpbox_url";

/// Collaborators of the `up` use-case.
pub struct UpDeps<'a, E, D, C, I, S, F> {
    pub engine: &'a E,
    pub director: &'a D,
    pub cloud_config: &'a C,
    pub env_ids: &'a I,
    pub store: &'a S,
    pub fs: &'a F,
}

/// Invocation arguments as given on the command line.
#[derive(Debug, Default, Clone)]
pub struct UpRequest<'a> {
    pub name: Option<&'a str>,
    pub ops_file: Option<&'a Path>,
    pub no_director: bool,
}

/// Arguments after defaults from the persisted state were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpConfig {
    pub name: String,
    pub ops_file: PathBuf,
    pub no_director: bool,
}

/// Outcome of the `up` use-case.
#[derive(Debug, PartialEq, Eq)]
pub enum UpOutcome {
    /// Infrastructure is up; the environment runs without a director.
    InfrastructureOnly { env_id: String },
    /// Infrastructure, jumpbox and director are up and configured.
    DirectorReady {
        env_id: String,
        director_address: String,
    },
}

/// Bring the environment up, creating or updating each layer in turn.
///
/// # Errors
///
/// Argument and preflight errors leave the state untouched. Errors from
/// later phases are returned after the state produced so far has been
/// persisted. Every error is prefixed with the name of its phase.
pub async fn up<E, D, C, I, S, F>(
    deps: &UpDeps<'_, E, D, C, I, S, F>,
    request: &UpRequest<'_>,
    mut state: EnvState,
    reporter: &impl ProgressReporter,
) -> Result<UpOutcome>
where
    E: ProvisioningEngine,
    D: DirectorManager,
    C: CloudConfigManager,
    I: EnvIdSynchronizer,
    S: StateStore,
    F: LocalFs,
{
    let checkpoint = Checkpointer::new(deps.store);

    let config = reconcile_args(deps.store, deps.fs, request, &state)
        .context(Phase::ReconcileArgs.name())?;
    check_fast_fails(deps.engine, deps.director, &config)
        .await
        .context(Phase::Preflight.name())?;

    let ops_file_contents = deps
        .fs
        .read_to_string(&config.ops_file)
        .with_context(|| format!("reading ops-file {}", config.ops_file.display()))
        .context(Phase::ReconcileArgs.name())?;

    if config.no_director {
        state.no_director = true;
    }

    reporter.step("synchronizing environment id...");
    state = deps
        .env_ids
        .sync(state, &config.name)
        .await
        .context(Phase::EnvIdSync.name())?;
    checkpoint.save(Phase::EnvIdSync, &state).await?;
    tracing::info!(env_id = %state.env_id, "environment id synchronized");

    if !deps.engine.is_initialized() {
        reporter.step("initializing terraform...");
        deps.engine
            .init(&state)
            .await
            .context(Phase::EngineInit.name())?;
    }

    reporter.step("applying infrastructure...");
    let outcome = deps.engine.apply(state).await;
    state = checkpoint.record(Phase::EngineApply, outcome).await?;
    reporter.success("infrastructure applied");

    if state.no_director {
        tracing::info!("no director requested; skipping director phases");
        return Ok(UpOutcome::InfrastructureOnly {
            env_id: state.env_id,
        });
    }

    let outputs = deps
        .engine
        .get_outputs(&state)
        .await
        .context(Phase::EngineOutputs.name())?;

    reporter.step("creating jumpbox...");
    deps.director
        .initialize_jumpbox(&state, &outputs)
        .await
        .context(Phase::JumpboxCreate.name())?;
    state = deps
        .director
        .create_jumpbox(state, &outputs.get_string(JUMPBOX_URL_OUTPUT))
        .await
        .context(Phase::JumpboxCreate.name())?;
    checkpoint.save(Phase::JumpboxCreate, &state).await?;
    reporter.success("jumpbox created");

    reporter.step("creating director...");
    state.director.previous_user_ops_file =
        std::mem::replace(&mut state.director.user_ops_file, ops_file_contents);
    deps.director
        .initialize_director(&state, &outputs)
        .await
        .context(Phase::DirectorCreate.name())?;
    let outcome = deps.director.create_director(state).await;
    state = checkpoint.record(Phase::DirectorCreate, outcome).await?;
    reporter.success("director created");

    reporter.step("updating cloud config...");
    deps.cloud_config
        .update(&state)
        .await
        .context(Phase::CloudConfigUpdate.name())?;
    reporter.success("cloud config updated");

    Ok(UpOutcome::DirectorReady {
        env_id: state.env_id,
        director_address: state.director.address,
    })
}

/// Resolve invocation arguments against the persisted state.
///
/// Writes the current overlay to the sidecar file so it can serve as the
/// default `--ops-file`, then rejects flag combinations the state forbids.
///
/// # Errors
///
/// Returns an error if the sidecar cannot be written, the director mode
/// would be toggled, or the environment would be renamed.
pub fn reconcile_args(
    store: &impl StateStore,
    fs: &impl LocalFs,
    request: &UpRequest<'_>,
    state: &EnvState,
) -> Result<UpConfig> {
    let previous_ops_file = store.working_directory().join(PREVIOUS_OPS_FILE);
    fs.write(&previous_ops_file, &state.director.user_ops_file)
        .context("writing previous ops-file")?;

    let config = UpConfig {
        name: request.name.unwrap_or_default().to_string(),
        ops_file: request
            .ops_file
            .map_or(previous_ops_file, Path::to_path_buf),
        no_director: request.no_director || state.no_director,
    };

    if config.no_director && !state.director.is_empty() {
        return Err(UpError::DirectorAlreadyExists.into());
    }

    if !state.env_id.is_empty() && !config.name.is_empty() && config.name != state.env_id {
        return Err(UpError::NameChange {
            current: state.env_id.clone(),
        }
        .into());
    }

    Ok(config)
}

/// Advisory checks run before any mutation.
async fn check_fast_fails(
    engine: &impl ProvisioningEngine,
    director: &impl DirectorManager,
    config: &UpConfig,
) -> Result<()> {
    if !config.no_director {
        director
            .validate_version()
            .await
            .context("director cli version")?;
    }
    engine
        .validate_version()
        .await
        .context("terraform version")?;
    Ok(())
}
