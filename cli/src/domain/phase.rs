//! Phase names and the tagged result of a state-mutating collaborator call.

use std::fmt;

use envboot_common::EnvState;

/// A step of `up` or `delete-lbs`. The display name prefixes every error
/// raised by the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReconcileArgs,
    Preflight,
    EnvIdSync,
    EngineInit,
    EngineApply,
    EngineOutputs,
    JumpboxCreate,
    DirectorCreate,
    CloudConfigUpdate,
    ValidateCredentials,
    CheckPreconditions,
    RetrieveZones,
    DescribeStack,
    StackUpdate,
    CertificateDelete,
    ClearLoadBalancer,
}

impl Phase {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ReconcileArgs => "reconcile arguments",
            Self::Preflight => "preflight",
            Self::EnvIdSync => "env id sync",
            Self::EngineInit => "terraform init",
            Self::EngineApply => "terraform apply",
            Self::EngineOutputs => "terraform outputs",
            Self::JumpboxCreate => "create jumpbox",
            Self::DirectorCreate => "create director",
            Self::CloudConfigUpdate => "update cloud config",
            Self::ValidateCredentials => "validate credentials",
            Self::CheckPreconditions => "check preconditions",
            Self::RetrieveZones => "retrieve availability zones",
            Self::DescribeStack => "describe stack",
            Self::StackUpdate => "update stack",
            Self::CertificateDelete => "delete certificate",
            Self::ClearLoadBalancer => "clear load balancer",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a collaborator call that may leave state behind even when it
/// fails. Callers persist the state of `Success` and `PartialFailure`
/// before deciding how to proceed.
#[derive(Debug)]
pub enum Outcome {
    Success(EnvState),
    PartialFailure(EnvState, anyhow::Error),
    Failure(anyhow::Error),
}

impl From<anyhow::Result<EnvState>> for Outcome {
    fn from(result: anyhow::Result<EnvState>) -> Self {
        match result {
            Ok(state) => Self::Success(state),
            Err(e) => Self::Failure(e),
        }
    }
}
