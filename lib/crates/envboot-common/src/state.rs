use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written by this release.
pub const STATE_SCHEMA: u32 = 14;

/// Oldest schema version this release can operate on.
pub const MIN_SUPPORTED_SCHEMA: u32 = 3;

/// File name of the persisted state inside a state directory.
pub const STATE_FILE_NAME: &str = "envboot-state.json";

/// Load-balancer type recorded when no load balancer exists.
pub const LB_TYPE_NONE: &str = "none";

/// The authoritative record of one environment.
///
/// Every field defaults so that records written by older releases, which
/// lack newer blocks, still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvState {
    /// Schema version of the persisted format.
    #[serde(rename = "version")]
    pub schema_version: u32,
    /// Tool release that last wrote the file.
    pub tool_version: String,
    /// Environment identifier; set once, before any infrastructure call.
    #[serde(rename = "envID")]
    pub env_id: String,
    /// Once true, no director may ever be created for this environment.
    pub no_director: bool,
    pub credentials: CredentialsRef,
    pub key_pair: KeyPair,
    pub infrastructure: Infrastructure,
    pub jumpbox: Jumpbox,
    pub director: Director,
    pub load_balancer: LoadBalancer,
}

impl EnvState {
    /// True when the record carries no data at all (blank or `{}` file).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Where cloud credentials can be found. Never the secret itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsRef {
    pub profile: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyPair {
    pub name: String,
}

/// Resources produced by the provisioning engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Infrastructure {
    /// Name under which the engine tracks the environment's resources.
    pub stack_name: String,
    /// Raw engine state, mirrored here after every apply.
    pub tf_state: String,
    /// Availability zones the stack spans; `0` until a stack update fixes it.
    pub az_count: usize,
}

impl Infrastructure {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack_name.is_empty() && self.tf_state.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Jumpbox {
    pub url: String,
    /// Vars store produced by `create-env` (YAML).
    pub variables: String,
    pub manifest_state: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Director {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
    pub ca_cert: String,
    /// Vars store produced by `create-env` (YAML).
    pub variables: String,
    pub manifest_state: Value,
    /// Operator-supplied ops-file overlay applied on the latest run.
    pub user_ops_file: String,
    /// Overlay applied on the run before that.
    pub previous_user_ops_file: String,
}

impl Director {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadBalancer {
    #[serde(rename = "type")]
    pub lb_type: String,
    pub certificate_name: String,
    pub domain: String,
}

impl LoadBalancer {
    /// An empty type is treated the same as the `"none"` sentinel.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.lb_type.is_empty() && self.lb_type != LB_TYPE_NONE
    }

    /// Reset to the "no load balancer" sentinel.
    pub fn clear(&mut self) {
        self.lb_type = LB_TYPE_NONE.to_string();
        self.certificate_name.clear();
    }
}
