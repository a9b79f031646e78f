//! Terraform-backed provisioning engine.
//!
//! Implements `ProvisioningEngine` for `up` and `InfrastructureManager` for
//! teardown commands. Everything runs in `<state-dir>/terraform`; the
//! resulting `terraform.tfstate` is mirrored into the environment state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use envboot_common::{EnvState, LB_TYPE_NONE};
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    CommandRunner, InfrastructureManager, Invocation, ProvisioningEngine,
};
use crate::domain::{Outcome, Outputs, Stack, StackUpdate};
use crate::infra::command_runner::ensure_success;
use crate::infra::fs::{copy_matching, read_optional, write_private};

/// Oldest terraform release whose CLI and state format we drive.
pub const MIN_TERRAFORM_VERSION: semver::Version = semver::Version::new(1, 0, 0);

const WORK_DIR: &str = "terraform";
const TFVARS_FILE: &str = "terraform.tfvars.json";
const TFSTATE_FILE: &str = "terraform.tfstate";

/// Variables passed to the terraform templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfVars {
    pub env_id: String,
    pub stack_name: String,
    pub region: String,
    pub key_pair_name: String,
    pub lb_type: String,
    pub lb_cert: String,
    pub lb_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub az_count: Option<usize>,
}

impl TfVars {
    /// Variables describing `state`. An unset load balancer maps to `""`
    /// and an unrecorded zone count is left to the templates' default.
    #[must_use]
    pub fn from_state(state: &EnvState) -> Self {
        let lb = &state.load_balancer;
        let lb_type = if lb.exists() { lb.lb_type.clone() } else { String::new() };
        Self {
            env_id: state.env_id.clone(),
            stack_name: state.infrastructure.stack_name.clone(),
            region: state.credentials.region.clone(),
            key_pair_name: state.key_pair.name.clone(),
            lb_type,
            lb_cert: lb.certificate_name.clone(),
            lb_domain: lb.domain.clone(),
            az_count: (state.infrastructure.az_count > 0).then_some(state.infrastructure.az_count),
        }
    }

    /// Overlay the parameters of a stack update.
    pub fn apply_update(&mut self, params: &StackUpdate<'_>) {
        self.env_id = params.env_id.to_string();
        self.stack_name = params.stack_name.to_string();
        self.key_pair_name = params.key_pair_name.to_string();
        self.lb_type = if params.lb_type == LB_TYPE_NONE {
            String::new()
        } else {
            params.lb_type.to_string()
        };
        self.lb_cert = params.lb_certificate.to_string();
        if params.lb_certificate.is_empty() {
            self.lb_domain.clear();
        }
        self.az_count = Some(params.az_count);
    }
}

#[derive(Deserialize)]
struct VersionReport {
    terraform_version: String,
}

/// Parse `terraform version -json` and enforce the minimum release.
///
/// # Errors
///
/// Returns an error if the report cannot be parsed or the release is too old.
pub fn check_version_report(raw: &str) -> Result<semver::Version> {
    let report: VersionReport =
        serde_json::from_str(raw).context("parsing terraform version report")?;
    let version = semver::Version::parse(report.terraform_version.trim_start_matches('v'))
        .with_context(|| format!("invalid terraform version '{}'", report.terraform_version))?;
    anyhow::ensure!(
        version >= MIN_TERRAFORM_VERSION,
        "terraform {version} is not supported; version {MIN_TERRAFORM_VERSION} or later is required"
    );
    Ok(version)
}

/// Drives the terraform binary against the environment's working directory.
pub struct TerraformCli<R> {
    runner: R,
    binary: String,
    work_dir: PathBuf,
    templates: Option<PathBuf>,
}

impl<R: CommandRunner> TerraformCli<R> {
    #[must_use]
    pub fn new(runner: R, binary: &str, state_dir: &Path, templates: Option<PathBuf>) -> Self {
        Self {
            runner,
            binary: binary.to_string(),
            work_dir: state_dir.join(WORK_DIR),
            templates,
        }
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn terraform(&self, args: &[&str]) -> Result<std::process::Output> {
        self.runner
            .run(&Invocation::new(&self.binary, args).in_dir(&self.work_dir))
            .await
    }

    async fn run_apply(&self) -> Result<()> {
        let output = self
            .terraform(&["apply", "-auto-approve", "-input=false", "-no-color"])
            .await?;
        ensure_success(&output, "terraform apply")
    }

    async fn read_outputs(&self) -> Result<Outputs> {
        let output = self.terraform(&["output", "-json", "-no-color"]).await?;
        ensure_success(&output, "terraform output")?;
        Outputs::from_terraform_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn tfvars_path(&self) -> PathBuf {
        self.work_dir.join(TFVARS_FILE)
    }

    fn tfstate_path(&self) -> PathBuf {
        self.work_dir.join(TFSTATE_FILE)
    }

    fn write_tfvars(&self, vars: &TfVars) -> Result<()> {
        let json = serde_json::to_string_pretty(vars).context("serializing terraform variables")?;
        write_private(&self.tfvars_path(), &json)
    }

    fn read_tfvars(&self) -> Result<Option<TfVars>> {
        let raw = read_optional(&self.tfvars_path())?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("parsing {}", self.tfvars_path().display()))
    }

    /// Seed the working-directory tfstate from `state` on a fresh machine.
    fn seed_tfstate(&self, state: &EnvState) -> Result<()> {
        let path = self.tfstate_path();
        if state.infrastructure.tf_state.is_empty() || path.exists() {
            return Ok(());
        }
        tracing::debug!(path = %path.display(), "restoring terraform state from environment state");
        write_private(&path, &state.infrastructure.tf_state)
    }

    /// Stage inputs, apply, and capture whatever tfstate the run left behind.
    async fn apply_state(&self, mut state: EnvState) -> Outcome {
        if state.infrastructure.stack_name.is_empty() {
            state.infrastructure.stack_name.clone_from(&state.env_id);
        }
        if state.key_pair.name.is_empty() {
            state.key_pair.name = format!("keypair-{}", state.env_id);
        }

        let staged = self
            .write_tfvars(&TfVars::from_state(&state))
            .and_then(|()| self.seed_tfstate(&state));
        if let Err(e) = staged {
            return Outcome::Failure(e);
        }

        let applied = self.run_apply().await;
        self.capture(state, applied)
    }

    /// Mirror the working-directory tfstate into `state` after an apply.
    fn capture(&self, mut state: EnvState, applied: Result<()>) -> Outcome {
        match read_optional(&self.tfstate_path()) {
            Ok(tf_state) if !tf_state.is_empty() => state.infrastructure.tf_state = tf_state,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not capture terraform state");
                if applied.is_ok() {
                    return Outcome::Failure(e);
                }
            }
        }

        match applied {
            Ok(()) => Outcome::Success(state),
            Err(e) => Outcome::PartialFailure(state, e),
        }
    }

    /// Rebuild a missing working directory from the environment state.
    async fn restore(&self, state: &EnvState) -> Result<()> {
        tracing::info!(
            work_dir = %self.work_dir.display(),
            "restoring terraform working directory from environment state"
        );
        if self.read_tfvars()?.is_none() {
            self.write_tfvars(&TfVars::from_state(state))?;
        }
        ProvisioningEngine::init(self, state).await
    }
}

impl<R: CommandRunner> ProvisioningEngine for TerraformCli<R> {
    async fn validate_version(&self) -> Result<()> {
        let output = self
            .runner
            .run(&Invocation::new(&self.binary, &["version", "-json"]))
            .await?;
        ensure_success(&output, "terraform version")?;
        let version = check_version_report(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(%version, "terraform version accepted");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.work_dir.join(".terraform").is_dir()
    }

    async fn init(&self, state: &EnvState) -> Result<()> {
        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("creating directory {}", self.work_dir.display()))?;
        if let Some(templates) = &self.templates {
            let copied = copy_matching(templates, &self.work_dir, ".tf")?;
            tracing::debug!(copied, templates = %templates.display(), "staged terraform templates");
        }
        self.seed_tfstate(state)?;
        let output = self.terraform(&["init", "-input=false", "-no-color"]).await?;
        ensure_success(&output, "terraform init")
    }

    async fn apply(&self, state: EnvState) -> Outcome {
        self.apply_state(state).await
    }

    async fn get_outputs(&self, _state: &EnvState) -> Result<Outputs> {
        self.read_outputs().await
    }
}

impl<R: CommandRunner> InfrastructureManager for TerraformCli<R> {
    async fn exists(&self, state: &EnvState) -> Result<bool> {
        let stack_name = state.infrastructure.stack_name.as_str();
        if stack_name.is_empty() {
            return Ok(false);
        }
        if !self.is_initialized() {
            if state.infrastructure.tf_state.is_empty() {
                return Ok(false);
            }
            self.restore(state).await?;
        }
        self.seed_tfstate(state)?;

        let recorded = self.read_tfvars()?.map(|v| v.stack_name).unwrap_or_default();
        if recorded != stack_name {
            tracing::debug!(recorded, stack_name, "working directory holds a different stack");
            return Ok(false);
        }
        let output = self.terraform(&["state", "list"]).await?;
        Ok(output.status.success() && !String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    async fn describe(&self, stack_name: &str) -> Result<Stack> {
        Ok(Stack {
            name: stack_name.to_string(),
            outputs: self.read_outputs().await?,
        })
    }

    async fn update(&self, state: EnvState, params: &StackUpdate<'_>) -> Outcome {
        let staged = self.read_tfvars().and_then(|vars| {
            let mut vars = vars.unwrap_or_else(|| TfVars::from_state(&state));
            vars.apply_update(params);
            self.write_tfvars(&vars)
        });
        if let Err(e) = staged {
            return Outcome::Failure(e);
        }

        let applied = self.run_apply().await;
        self.capture(state, applied)
    }
}
