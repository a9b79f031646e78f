//! Infrastructure facts produced by the provisioning engine.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Structured outputs of an applied infrastructure plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs(BTreeMap<String, Value>);

#[derive(Deserialize)]
struct OutputEntry {
    value: Value,
}

impl Outputs {
    #[must_use]
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self(values)
    }

    /// Parse the document printed by `terraform output -json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not an object of `{"value": ...}` entries.
    pub fn from_terraform_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: BTreeMap<String, OutputEntry> =
            serde_json::from_str(raw).context("parsing terraform outputs")?;
        Ok(Self(
            entries.into_iter().map(|(k, v)| (k, v.value)).collect(),
        ))
    }

    /// String value of `key`, or empty when absent or not a string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// List-of-strings value of `key`; non-string items are skipped.
    #[must_use]
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// A described infrastructure stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    pub name: String,
    pub outputs: Outputs,
}

/// Parameters of an engine-level stack update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackUpdate<'a> {
    pub key_pair_name: &'a str,
    pub az_count: usize,
    pub stack_name: &'a str,
    /// Empty removes load-balancer resources.
    pub lb_type: &'a str,
    /// Empty removes load-balancer resources.
    pub lb_certificate: &'a str,
    pub env_id: &'a str,
}

impl Stack {
    /// Number of internal subnets the stack was deployed with.
    #[must_use]
    pub fn subnet_count(&self) -> usize {
        self.outputs.get_string_list("internal_subnet_ids").len()
    }
}

/// Zone count a stack update must keep so the network layout does not move.
///
/// The count recorded in state wins; otherwise the subnets the stack was
/// deployed with; otherwise every available zone.
#[must_use]
pub fn zone_count(recorded: usize, stack: &Stack, azs: &[String]) -> usize {
    if recorded > 0 {
        return recorded;
    }
    match stack.subnet_count() {
        0 => azs.len(),
        deployed => deployed,
    }
}
