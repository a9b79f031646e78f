//! Cloud-config derivation from infrastructure facts.
//!
//! Pure functions only; the rendered document is pushed to the director by
//! the infra layer.

use serde::Serialize;

use crate::domain::error::CloudConfigError;
use crate::domain::infrastructure::{Outputs, Stack};

/// Load-balancer wiring known to the cloud config, keyed by output names.
const LB_OUTPUTS: &[(&str, &str, &str)] = &[
    (
        "cf-router-network-properties",
        "cf_router_lb_name",
        "cf_router_lb_internal_security_group",
    ),
    (
        "diego-ssh-proxy-network-properties",
        "cf_ssh_lb_name",
        "cf_ssh_lb_internal_security_group",
    ),
    (
        "lb",
        "concourse_lb_name",
        "concourse_lb_internal_security_group",
    ),
];

/// Facts the director needs about one availability zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSubnet {
    pub az: String,
    pub subnet_id: String,
    pub cidr: String,
}

/// A load balancer VMs can be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbExtension {
    pub name: String,
    pub elb: String,
    pub security_group: String,
}

/// Everything required to render a cloud config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudConfigInput {
    pub zones: Vec<ZoneSubnet>,
    pub security_group: String,
    pub lbs: Vec<LbExtension>,
}

impl CloudConfigInput {
    /// Drop every load-balancer reference.
    pub fn strip_load_balancers(&mut self) {
        self.lbs.clear();
    }
}

/// Derive cloud-config input from a described stack and the region's zones.
///
/// Each deployed subnet is paired with a zone in order; zones beyond the
/// deployed subnets are unused.
///
/// # Errors
///
/// Returns a `CloudConfigError` when the stack has no subnets, its subnet
/// lists disagree, or there are more subnets than zones.
pub fn configure(stack: &Stack, azs: &[String]) -> Result<CloudConfigInput, CloudConfigError> {
    configure_from_outputs(&stack.outputs, azs)
}

/// Same as [`configure`], from raw outputs.
///
/// # Errors
///
/// See [`configure`].
pub fn configure_from_outputs(
    outputs: &Outputs,
    azs: &[String],
) -> Result<CloudConfigInput, CloudConfigError> {
    let subnet_ids = outputs.get_string_list("internal_subnet_ids");
    let cidrs = outputs.get_string_list("internal_subnet_cidrs");

    if subnet_ids.len() != cidrs.len() {
        return Err(CloudConfigError::SubnetMismatch {
            subnets: subnet_ids.len(),
            cidrs: cidrs.len(),
        });
    }
    if subnet_ids.is_empty() {
        return Err(CloudConfigError::NoZones);
    }
    if subnet_ids.len() > azs.len() {
        return Err(CloudConfigError::MissingZones {
            zones: azs.len(),
            subnets: subnet_ids.len(),
        });
    }

    let zones = azs
        .iter()
        .zip(subnet_ids.into_iter().zip(cidrs))
        .map(|(az, (subnet_id, cidr))| ZoneSubnet {
            az: az.clone(),
            subnet_id,
            cidr,
        })
        .collect();

    let lbs = LB_OUTPUTS
        .iter()
        .filter_map(|(name, elb_key, sg_key)| {
            let elb = outputs.get_string(elb_key);
            (!elb.is_empty()).then(|| LbExtension {
                name: (*name).to_string(),
                elb,
                security_group: outputs.get_string(sg_key),
            })
        })
        .collect();

    Ok(CloudConfigInput {
        zones,
        security_group: outputs.get_string("internal_security_group"),
        lbs,
    })
}

// ── Rendered document ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CloudConfig {
    pub azs: Vec<AzEntry>,
    pub networks: Vec<Network>,
    pub vm_extensions: Vec<VmExtension>,
    pub compilation: Compilation,
}

#[derive(Debug, Serialize)]
pub struct AzEntry {
    pub name: String,
    pub cloud_properties: AzProperties,
}

#[derive(Debug, Serialize)]
pub struct AzProperties {
    pub availability_zone: String,
}

#[derive(Debug, Serialize)]
pub struct Network {
    pub name: String,
    #[serde(rename = "type")]
    pub network_type: String,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Serialize)]
pub struct Subnet {
    pub az: String,
    pub range: String,
    pub gateway: String,
    pub cloud_properties: SubnetProperties,
}

#[derive(Debug, Serialize)]
pub struct SubnetProperties {
    pub subnet: String,
    pub security_groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VmExtension {
    pub name: String,
    pub cloud_properties: VmExtensionProperties,
}

#[derive(Debug, Serialize)]
pub struct VmExtensionProperties {
    pub elbs: Vec<String>,
    pub security_groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Compilation {
    pub workers: u32,
    pub az: String,
    pub network: String,
    pub reuse_compilation_vms: bool,
}

/// Build the cloud-config document for `input`.
///
/// # Errors
///
/// Returns `CloudConfigError::NoZones` when `input` has no zones, since
/// compilation VMs are placed in the first one.
pub fn render(input: &CloudConfigInput) -> Result<CloudConfig, CloudConfigError> {
    if input.zones.is_empty() {
        return Err(CloudConfigError::NoZones);
    }
    let azs = input
        .zones
        .iter()
        .enumerate()
        .map(|(i, zone)| AzEntry {
            name: az_name(i),
            cloud_properties: AzProperties {
                availability_zone: zone.az.clone(),
            },
        })
        .collect();

    let subnets = input
        .zones
        .iter()
        .enumerate()
        .map(|(i, zone)| Subnet {
            az: az_name(i),
            range: zone.cidr.clone(),
            gateway: gateway_for(&zone.cidr),
            cloud_properties: SubnetProperties {
                subnet: zone.subnet_id.clone(),
                security_groups: vec![input.security_group.clone()],
            },
        })
        .collect();

    let vm_extensions = input
        .lbs
        .iter()
        .map(|lb| VmExtension {
            name: lb.name.clone(),
            cloud_properties: VmExtensionProperties {
                elbs: vec![lb.elb.clone()],
                security_groups: vec![lb.security_group.clone(), input.security_group.clone()],
            },
        })
        .collect();

    Ok(CloudConfig {
        azs,
        networks: vec![Network {
            name: "default".to_string(),
            network_type: "manual".to_string(),
            subnets,
        }],
        vm_extensions,
        compilation: Compilation {
            workers: 5,
            az: az_name(0),
            network: "default".to_string(),
            reuse_compilation_vms: true,
        },
    })
}

fn az_name(index: usize) -> String {
    format!("z{}", index + 1)
}

/// First usable address of an IPv4 CIDR (`10.0.16.0/20` → `10.0.16.1`).
fn gateway_for(cidr: &str) -> String {
    let network = cidr.split('/').next().unwrap_or_default();
    let mut octets: Vec<&str> = network.split('.').collect();
    if octets.len() != 4 {
        return String::new();
    }
    octets[3] = "1";
    octets.join(".")
}
