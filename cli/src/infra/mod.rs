//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! state file, configuration, and the terraform, bosh and aws adapters.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod aws;
pub mod bosh;
pub mod cloud_config;
pub mod command_runner;
pub mod config;
pub mod env_id;
pub mod fs;
pub mod state;
pub mod terraform;
