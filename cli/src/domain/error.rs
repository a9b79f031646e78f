//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── State compatibility errors ────────────────────────────────────────────────

/// The persisted state cannot be used by this release.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error(
        "Existing environment (schema {found}) is incompatible with this release. \
Create a new environment to continue."
    )]
    Incompatible { found: u32 },

    #[error(
        "Existing environment was created with a newer release. Please upgrade envboot to v{tool_version}."
    )]
    NewerTool { tool_version: String },
}

// ── Up errors ─────────────────────────────────────────────────────────────────

/// Argument conflicts detected before `up` touches anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpError {
    #[error("Director already exists, you must re-create your environment to use \"--no-director\"")]
    DirectorAlreadyExists,

    #[error(
        "The environment name cannot be changed for an existing environment. Current name is {current}."
    )]
    NameChange { current: String },

    #[error("Invalid environment name '{0}': must match ^[a-z][a-z0-9-]{{0,61}}[a-z0-9]$")]
    InvalidName(String),
}

// ── Delete-LBs errors ─────────────────────────────────────────────────────────

/// Preconditions for tearing down load balancers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeleteLbsError {
    #[error("Infrastructure stack not found. Run 'envboot up' first.")]
    MissingStack,

    #[error("Director not found. Load balancers can only be removed from an environment with a director.")]
    MissingDirector,

    #[error("No load balancer has been found for this environment.")]
    MissingLoadBalancer,
}

// ── Cloud-config errors ───────────────────────────────────────────────────────

/// Infrastructure facts that cannot be turned into a cloud config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CloudConfigError {
    #[error("Infrastructure reports no internal subnets; cannot place any availability zone.")]
    NoZones,

    #[error("Infrastructure reports {subnets} internal subnet ids but {cidrs} subnet ranges.")]
    SubnetMismatch { subnets: usize, cidrs: usize },

    #[error(
        "Infrastructure has {subnets} internal subnets but only {zones} availability zones are available."
    )]
    MissingZones { zones: usize, subnets: usize },
}

// ── Credential errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("AWS profile is missing. Pass --aws-profile or set AWS_PROFILE.")]
    MissingProfile,

    #[error("AWS region is missing. Pass --aws-region or set AWS_REGION.")]
    MissingRegion,

    #[error("AWS profile '{0}' was not found in the local AWS configuration.")]
    UnknownProfile(String),
}
