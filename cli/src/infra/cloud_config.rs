//! Pushes a rendered cloud config to the director with `bosh update-cloud-config`.

use anyhow::{Context, Result};
use envboot_common::EnvState;

use crate::application::ports::{
    AvailabilityZoneRetriever, CloudConfigManager, CommandRunner, DirectorTarget, Invocation,
    ProvisioningEngine,
};
use crate::domain::CloudConfigInput;
use crate::domain::cloud_config::{configure_from_outputs, render};
use crate::infra::command_runner::ensure_success;
use crate::infra::fs::write_private;

const CLOUD_CONFIG_FILE: &str = "cloud-config.yml";
const CA_CERT_FILE: &str = "director-ca.pem";

/// Cloud-config reconciliation against a running director.
///
/// `update` derives its input from the engine's outputs and the region's
/// availability zones.
pub struct BoshCloudConfigManager<'a, R, E, Z> {
    runner: R,
    binary: String,
    engine: &'a E,
    zones: &'a Z,
}

impl<'a, R, E, Z> BoshCloudConfigManager<'a, R, E, Z>
where
    R: CommandRunner,
    E: ProvisioningEngine,
    Z: AvailabilityZoneRetriever,
{
    #[must_use]
    pub fn new(runner: R, binary: &str, engine: &'a E, zones: &'a Z) -> Self {
        Self {
            runner,
            binary: binary.to_string(),
            engine,
            zones,
        }
    }
}

impl<R, E, Z> CloudConfigManager for BoshCloudConfigManager<'_, R, E, Z>
where
    R: CommandRunner,
    E: ProvisioningEngine,
    Z: AvailabilityZoneRetriever,
{
    async fn update(&self, state: &EnvState) -> Result<()> {
        let azs = self
            .zones
            .retrieve(&state.credentials.region)
            .await
            .context("retrieving availability zones")?;
        let outputs = self.engine.get_outputs(state).await?;
        let input = configure_from_outputs(&outputs, &azs)?;
        self.apply(&input, &DirectorTarget::from(&state.director))
            .await
    }

    async fn apply(&self, input: &CloudConfigInput, director: &DirectorTarget) -> Result<()> {
        anyhow::ensure!(
            !director.address.is_empty(),
            "director address is unknown; cannot update cloud config"
        );
        let yaml = serde_yaml::to_string(&render(input)?).context("rendering cloud config")?;

        let scratch = tempfile::Builder::new()
            .prefix("envboot-cloud-config")
            .tempdir()
            .context("creating scratch directory")?;
        let config_path = scratch.path().join(CLOUD_CONFIG_FILE);
        let ca_path = scratch.path().join(CA_CERT_FILE);
        write_private(&config_path, &yaml)?;
        write_private(&ca_path, &director.ca_cert)?;

        let config_arg = config_path.to_string_lossy();
        let ca_arg = ca_path.to_string_lossy();
        let args = [
            "update-cloud-config",
            config_arg.as_ref(),
            "--non-interactive",
            "--environment",
            director.address.as_str(),
            "--client",
            director.username.as_str(),
            "--ca-cert",
            ca_arg.as_ref(),
        ];
        let env = [("BOSH_CLIENT_SECRET", director.password.as_str())];

        tracing::debug!(director = %director.address, zones = input.zones.len(), lbs = input.lbs.len(), "updating cloud config");
        let output = self
            .runner
            .run(&Invocation::new(&self.binary, &args).with_env(&env))
            .await?;
        ensure_success(&output, "bosh update-cloud-config")
    }
}
