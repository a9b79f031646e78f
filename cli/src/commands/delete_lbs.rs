//! `envboot delete-lbs`: remove the environment's load balancers.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::StateStore as _;
use crate::application::services::delete_lbs::{
    self as service, DeleteLbsDeps, DeleteLbsOutcome, DeleteLbsRequest,
};
use crate::infra::aws::{AwsCli, AwsCredentialValidator};
use crate::infra::cloud_config::BoshCloudConfigManager;
use crate::infra::terraform::TerraformCli;

/// Arguments for the delete-lbs command.
#[derive(Args, Default)]
pub struct DeleteLbsArgs {
    /// Succeed without changes when no load balancer exists
    #[arg(long)]
    pub skip_if_missing: bool,
}

/// Run `envboot delete-lbs`.
///
/// # Errors
///
/// Returns an error if credentials are invalid, a precondition fails, or
/// any teardown step fails.
pub async fn run(args: &DeleteLbsArgs, app: &AppContext) -> Result<()> {
    let state = app.load_state().await?;
    let dir = app.state_mgr.working_directory();
    let tools = &app.config.tools;

    let validator = AwsCredentialValidator::from_env();
    let aws = AwsCli::new(app.runner, &tools.aws, &state.credentials.profile);
    let terraform = TerraformCli::new(
        app.runner,
        &tools.terraform,
        dir,
        app.config.templates.terraform.clone(),
    );
    let cloud_config = BoshCloudConfigManager::new(app.runner, &tools.bosh, &terraform, &aws);

    let deps = DeleteLbsDeps {
        credentials: &validator,
        zones: &aws,
        infrastructure: &terraform,
        cloud_config: &cloud_config,
        certificates: &aws,
        store: &app.state_mgr,
    };
    let request = DeleteLbsRequest {
        skip_if_missing: args.skip_if_missing,
    };

    match service::delete_lbs(&deps, request, state, &app.terminal_reporter()).await? {
        DeleteLbsOutcome::Skipped => {}
        DeleteLbsOutcome::Deleted { certificate_name } if !certificate_name.is_empty() => {
            app.output.kv("Deleted certificate", &certificate_name);
        }
        DeleteLbsOutcome::Deleted { .. } => {}
    }
    Ok(())
}
