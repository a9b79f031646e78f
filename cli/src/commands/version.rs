//! Version command

use envboot_common::STATE_SCHEMA;

/// Run the version command.
pub fn run() {
    let version = env!("CARGO_PKG_VERSION");
    println!("envboot {version} (state schema {STATE_SCHEMA})");
}
