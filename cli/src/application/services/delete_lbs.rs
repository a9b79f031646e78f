//! Application service: `delete-lbs` use-case.
//!
//! Load-balancer wiring is stripped from the director's cloud config before
//! the infrastructure update removes the underlying resources, and the
//! certificate is deleted only after that update succeeded. The engine state
//! left by the update is checkpointed before anything else happens, whether
//! the update succeeded or not.

use anyhow::{Context, Result};
use envboot_common::EnvState;

use crate::application::checkpoint::Checkpointer;
use crate::application::ports::{
    AvailabilityZoneRetriever, CertificateManager, CloudConfigManager, CredentialValidator,
    DirectorTarget, InfrastructureManager, ProgressReporter, StateStore,
};
use crate::domain::cloud_config;
use crate::domain::{DeleteLbsError, Phase, StackUpdate, zone_count};

/// Collaborators of the `delete-lbs` use-case.
pub struct DeleteLbsDeps<'a, V, Z, I, C, M, S> {
    pub credentials: &'a V,
    pub zones: &'a Z,
    pub infrastructure: &'a I,
    pub cloud_config: &'a C,
    pub certificates: &'a M,
    pub store: &'a S,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteLbsRequest {
    /// Succeed without doing anything when no load balancer exists.
    pub skip_if_missing: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteLbsOutcome {
    /// No load balancer existed and `skip_if_missing` was set.
    Skipped,
    /// Load balancers were removed.
    Deleted { certificate_name: String },
}

/// Remove the environment's load balancers and their certificate.
///
/// # Errors
///
/// Returns an error if credentials are invalid, a precondition does not
/// hold, or any collaborator fails. State is written after the stack update,
/// including a failed one that left engine state behind, and once more when
/// the load balancer is cleared.
pub async fn delete_lbs<V, Z, I, C, M, S>(
    deps: &DeleteLbsDeps<'_, V, Z, I, C, M, S>,
    request: DeleteLbsRequest,
    mut state: EnvState,
    reporter: &impl ProgressReporter,
) -> Result<DeleteLbsOutcome>
where
    V: CredentialValidator,
    Z: AvailabilityZoneRetriever,
    I: InfrastructureManager,
    C: CloudConfigManager,
    M: CertificateManager,
    S: StateStore,
{
    deps.credentials
        .validate(&state.credentials)
        .context(Phase::ValidateCredentials.name())?;

    if request.skip_if_missing && !state.load_balancer.exists() {
        tracing::info!("no load balancer recorded; skipping");
        reporter.step("no lb type exists, skipping...");
        return Ok(DeleteLbsOutcome::Skipped);
    }

    let checkpoint = Checkpointer::new(deps.store);
    check_preconditions(deps.infrastructure, &state)
        .await
        .context(Phase::CheckPreconditions.name())?;

    let stack_name = state.infrastructure.stack_name.clone();

    let azs = deps
        .zones
        .retrieve(&state.credentials.region)
        .await
        .context(Phase::RetrieveZones.name())?;
    let stack = deps
        .infrastructure
        .describe(&stack_name)
        .await
        .context(Phase::DescribeStack.name())?;

    let mut input =
        cloud_config::configure(&stack, &azs).context(Phase::CloudConfigUpdate.name())?;
    input.strip_load_balancers();

    reporter.step("removing load balancers from cloud config...");
    deps.cloud_config
        .apply(&input, &DirectorTarget::from(&state.director))
        .await
        .context(Phase::CloudConfigUpdate.name())?;

    reporter.step("updating infrastructure...");
    let az_count = zone_count(state.infrastructure.az_count, &stack, &azs);
    let key_pair_name = state.key_pair.name.clone();
    let env_id = state.env_id.clone();
    let params = StackUpdate {
        key_pair_name: &key_pair_name,
        az_count,
        stack_name: &stack_name,
        lb_type: "",
        lb_certificate: "",
        env_id: &env_id,
    };
    state.infrastructure.az_count = az_count;
    let outcome = deps.infrastructure.update(state, &params).await;
    state = checkpoint.record(Phase::StackUpdate, outcome).await?;

    let certificate_name = state.load_balancer.certificate_name.clone();
    if certificate_name.is_empty() {
        tracing::debug!("no certificate recorded for load balancer");
    } else {
        reporter.step("deleting certificate...");
        deps.certificates
            .delete(&certificate_name)
            .await
            .context(Phase::CertificateDelete.name())?;
    }

    state.load_balancer.clear();
    checkpoint.save(Phase::ClearLoadBalancer, &state).await?;
    reporter.success("load balancers deleted");

    Ok(DeleteLbsOutcome::Deleted { certificate_name })
}

/// Both an infrastructure stack and a director must exist, and there must
/// be a load balancer to delete.
async fn check_preconditions(
    infrastructure: &impl InfrastructureManager,
    state: &EnvState,
) -> Result<()> {
    let stack_name = &state.infrastructure.stack_name;
    if stack_name.is_empty() || !infrastructure.exists(state).await? {
        return Err(DeleteLbsError::MissingStack.into());
    }
    if state.no_director || state.director.address.is_empty() {
        return Err(DeleteLbsError::MissingDirector.into());
    }
    if !state.load_balancer.exists() {
        return Err(DeleteLbsError::MissingLoadBalancer.into());
    }
    Ok(())
}
