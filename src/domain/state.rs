//! Recorded deployment state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::domain::deferred::OutputLookup;
use crate::domain::graph::dependency_order;
use crate::domain::{AppError, Attributes, LogicalName, ResourceKind};

/// What the provisioning engine last realized for each resource.
///
/// `version` increases with every successful write to the state store and
/// guards against concurrent deployments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentState {
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: BTreeMap<LogicalName, ResourceRecord>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// Recorded inputs and outputs of one provisioned resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    /// Resolved inputs as last submitted; secrets are stored as digests.
    #[serde(default)]
    pub inputs: BTreeMap<String, Json>,
    #[serde(default)]
    pub outputs: Attributes,
    #[serde(default)]
    pub dependencies: BTreeSet<LogicalName>,
}

impl DeploymentState {
    pub fn get(&self, name: &LogicalName) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Recorded resources ordered dependents-first, the order they must be deleted in.
    pub fn deletion_order(&self) -> Result<Vec<LogicalName>, AppError> {
        let nodes: Vec<(LogicalName, BTreeSet<LogicalName>)> = self
            .resources
            .iter()
            .map(|(name, record)| (name.clone(), record.dependencies.clone()))
            .collect();

        let mut order = dependency_order(&nodes, false)
            .map_err(|e| AppError::StateCorrupt(e.to_string()))?;
        order.reverse();
        Ok(order.into_iter().map(|i| nodes[i].0.clone()).collect())
    }
}

impl OutputLookup for DeploymentState {
    fn output(&self, resource: &LogicalName, attribute: &str) -> Result<Option<String>, AppError> {
        Ok(self.resources.get(resource).and_then(|record| record.outputs.get(attribute)).cloned())
    }
}
