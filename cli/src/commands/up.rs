//! `envboot up`: create or update the environment.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::StateStore as _;
use crate::application::services::up::{self as service, UpDeps, UpOutcome, UpRequest};
use crate::infra::aws::AwsCli;
use crate::infra::bosh::BoshCli;
use crate::infra::cloud_config::BoshCloudConfigManager;
use crate::infra::env_id::EnvIdManager;
use crate::infra::fs::LocalFs;
use crate::infra::terraform::TerraformCli;
use crate::output::OutputContext;

/// Arguments for the up command.
#[derive(Args, Default)]
pub struct UpArgs {
    /// Name to assign to a new environment
    #[arg(long)]
    pub name: Option<String>,

    /// Ops-file overlay applied to the director manifest
    /// (defaults to the overlay of the previous run)
    #[arg(long, value_name = "PATH")]
    pub ops_file: Option<PathBuf>,

    /// Provision infrastructure only; never create a director
    #[arg(long)]
    pub no_director: bool,
}

/// Run `envboot up`.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded or any phase fails.
pub async fn run(args: &UpArgs, app: &AppContext) -> Result<()> {
    let state = app.load_state().await?;
    let dir = app.state_mgr.working_directory();
    let tools = &app.config.tools;

    let terraform = TerraformCli::new(
        app.runner,
        &tools.terraform,
        dir,
        app.config.templates.terraform.clone(),
    );
    let bosh = BoshCli::new(
        app.runner,
        &tools.bosh,
        dir,
        app.config.templates.director.clone(),
    );
    let aws = AwsCli::new(app.runner, &tools.aws, &state.credentials.profile);
    let cloud_config = BoshCloudConfigManager::new(app.runner, &tools.bosh, &terraform, &aws);

    let deps = UpDeps {
        engine: &terraform,
        director: &bosh,
        cloud_config: &cloud_config,
        env_ids: &EnvIdManager,
        store: &app.state_mgr,
        fs: &LocalFs,
    };
    let request = UpRequest {
        name: args.name.as_deref(),
        ops_file: args.ops_file.as_deref(),
        no_director: args.no_director,
    };

    let outcome = service::up(&deps, &request, state, &app.terminal_reporter()).await?;
    print_outcome(&outcome, &app.output);
    Ok(())
}

fn print_outcome(outcome: &UpOutcome, ctx: &OutputContext) {
    if ctx.quiet {
        return;
    }
    match outcome {
        UpOutcome::InfrastructureOnly { env_id } => {
            ctx.success("Environment is up (no director).");
            ctx.kv("Environment", env_id);
        }
        UpOutcome::DirectorReady {
            env_id,
            director_address,
        } => {
            ctx.success("Environment is up.");
            ctx.kv("Environment", env_id);
            ctx.kv("Director", director_address);
        }
    }
}
