//! Command implementations

pub mod delete_lbs;
pub mod up;
pub mod version;
