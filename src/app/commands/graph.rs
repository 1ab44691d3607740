use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::{AppError, LogicalName, ResourceGraph, ResourceKind};

/// One resource in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEntry {
    pub name: LogicalName,
    pub kind: ResourceKind,
    pub dependencies: BTreeSet<LogicalName>,
}

/// Submission order of a graph and what it exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub resources: Vec<GraphEntry>,
    pub exports: BTreeMap<String, String>,
}

/// Validate `graph` and describe it in submission order.
pub fn execute(graph: &ResourceGraph) -> Result<GraphReport, AppError> {
    let resources = graph
        .submission_order()?
        .into_iter()
        .map(|descriptor| GraphEntry {
            name: descriptor.name().clone(),
            kind: descriptor.kind(),
            dependencies: descriptor.dependencies(),
        })
        .collect();
    let exports = graph.exports().iter().map(|(key, value)| (key.clone(), value.to_string())).collect();

    Ok(GraphReport { resources, exports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeploymentConfig, DeploymentParameters, broker_stack};

    #[test]
    fn report_lists_dependencies_before_dependents() {
        let params = DeploymentParameters {
            finnhub_api_key: "finnhub-key".to_string(),
            cognito_client_id: "client-id".to_string(),
            cognito_client_secret: "client-secret".to_string(),
            table_name: "broker-data".to_string(),
            account_id: "123456789012".to_string(),
        };
        let graph = broker_stack(&DeploymentConfig::default(), &params).unwrap();

        let report = execute(&graph).unwrap();
        assert_eq!(report.resources.len(), graph.len());
        for (i, entry) in report.resources.iter().enumerate() {
            for dependency in &entry.dependencies {
                let position = report.resources.iter().position(|e| &e.name == dependency).unwrap();
                assert!(position < i, "{} must precede {}", dependency, entry.name);
            }
        }
        assert_eq!(report.exports["api_gateway_invoke_url"], "${stockHttpApi.api_endpoint}");
    }
}
