//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod cloud_config;
pub mod config;
pub mod env_id;
pub mod error;
pub mod infrastructure;
pub mod phase;
pub mod schema;

pub use cloud_config::CloudConfigInput;
pub use config::EnvbootConfig;
pub use error::{CloudConfigError, CredentialsError, DeleteLbsError, SchemaError, UpError};
pub use infrastructure::{Outputs, Stack, StackUpdate, zone_count};
pub use phase::{Outcome, Phase};
pub use schema::{Compatibility, CompatibilityRegistry};
