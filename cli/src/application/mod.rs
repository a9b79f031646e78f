//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod checkpoint;
pub mod ports;
pub mod services;

pub use checkpoint::Checkpointer;
pub use ports::{
    AvailabilityZoneRetriever, CertificateManager, CloudConfigManager, CommandRunner,
    ConfigStore, CredentialValidator, DirectorManager, DirectorTarget, EnvIdSynchronizer,
    InfrastructureManager, Invocation, LocalFs, ProgressReporter, ProvisioningEngine, StateStore,
};
