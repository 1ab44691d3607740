use std::collections::BTreeMap;

use crate::app::AppContext;
use crate::domain::{
    Action, AppError, DeploymentState, Descriptor, LogicalName, Operation, PlanSummary, Planner,
    Rendering, ResolutionTable, ResourceGraph, ResourceRecord,
};
use crate::ports::{Provisioner, ResourceRequest, StateStore};

/// Result of a completed apply.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub summary: PlanSummary,
    /// Operations submitted, in submission order.
    pub operations: Vec<Operation>,
    pub outputs: BTreeMap<String, String>,
    /// State version written last.
    pub version: u64,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        !self.operations.is_empty()
    }
}

/// Plan `graph` against recorded state and carry the plan out.
///
/// State is saved after every operation, so a failed apply leaves behind
/// exactly what was realized and a later apply resumes from there.
pub fn execute<P: Provisioner, S: StateStore>(
    ctx: &AppContext<P, S>,
    graph: &ResourceGraph,
) -> Result<ApplyOutcome, AppError> {
    let mut state = ctx.state_store().load()?;
    let plan = Planner::plan(graph, &state)?;
    let summary = plan.summary();
    tracing::info!(%summary, "applying plan");

    let table = ResolutionTable::new(graph.descriptors().iter().map(Descriptor::name));
    for name in plan.unchanged() {
        if let Some(record) = state.get(name) {
            table.resolve(name, record.outputs.clone())?;
        }
    }

    let mut submitted = Vec::with_capacity(plan.operations().len());
    for operation in plan.operations() {
        match operation.action {
            Action::Delete => delete(ctx, &mut state, &operation.name)?,
            Action::Create | Action::Update => {
                let descriptor = graph
                    .get(&operation.name)
                    .ok_or_else(|| AppError::UnknownResource(operation.name.to_string()))?;
                provision(ctx, &mut state, &table, descriptor, operation.action)?;
            }
        }
        state.version = ctx.state_store().save(&state)?;
        submitted.push(operation.clone());
    }

    let mut outputs = BTreeMap::new();
    for (key, value) in graph.exports() {
        let resolved = value.resolve(&table)?.ok_or_else(|| AppError::NotYetResolved {
            resource: value.to_string(),
            attribute: key.clone(),
        })?;
        outputs.insert(key.clone(), resolved);
    }
    if outputs != state.outputs {
        state.outputs = outputs.clone();
        state.version = ctx.state_store().save(&state)?;
    }

    tracing::info!(operations = submitted.len(), version = state.version, "apply complete");
    Ok(ApplyOutcome { summary, operations: submitted, outputs, version: state.version })
}

fn delete<P: Provisioner, S: StateStore>(
    ctx: &AppContext<P, S>,
    state: &mut DeploymentState,
    name: &LogicalName,
) -> Result<(), AppError> {
    let Some(record) = state.get(name) else {
        return Ok(());
    };
    tracing::info!(resource = %name, kind = %record.kind, "deleting");
    ctx.provisioner().delete(name, record.kind, &record.outputs)?;
    state.resources.remove(name);
    Ok(())
}

fn provision<P: Provisioner, S: StateStore>(
    ctx: &AppContext<P, S>,
    state: &mut DeploymentState,
    table: &ResolutionTable,
    descriptor: &Descriptor,
    action: Action,
) -> Result<(), AppError> {
    let name = descriptor.name();
    let mut inputs = BTreeMap::new();
    let mut recorded = BTreeMap::new();
    for (field, value) in descriptor.fields().iter() {
        let unresolved = || AppError::NotYetResolved {
            resource: name.to_string(),
            attribute: field.clone(),
        };
        let submitted = value.resolve(table, Rendering::Submission)?.ok_or_else(unresolved)?;
        let stored = value.resolve(table, Rendering::Record)?.ok_or_else(unresolved)?;
        inputs.insert(field.clone(), submitted);
        recorded.insert(field.clone(), stored);
    }

    let request = ResourceRequest { name: name.clone(), kind: descriptor.kind(), inputs };
    let outputs = match (action, state.get(name)) {
        (Action::Update, Some(record)) => {
            tracing::info!(resource = %name, kind = %descriptor.kind(), "updating");
            ctx.provisioner().update(&request, &record.outputs)?
        }
        _ => {
            tracing::info!(resource = %name, kind = %descriptor.kind(), "creating");
            ctx.provisioner().create(&request)?
        }
    };

    table.resolve(name, outputs.clone())?;
    state.resources.insert(
        name.clone(),
        ResourceRecord {
            kind: descriptor.kind(),
            inputs: recorded,
            outputs,
            dependencies: descriptor.dependencies(),
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStateStore, SimulatedProvisioner};
    use crate::domain::{Fields, ResourceKind, Value};
    use crate::testing::RecordingProvisioner;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn context() -> AppContext<RecordingProvisioner, MemoryStateStore> {
        AppContext::new(RecordingProvisioner::new(), MemoryStateStore::new())
    }

    /// Role, table and a function reading both.
    fn graph(runtime: &str) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        let role = graph
            .declare(
                ResourceKind::Role,
                "stockApiLambdaRole",
                Fields::new().with("assume_role_policy", Value::map([("Version", "2012-10-17")])),
            )
            .unwrap();
        let table = graph
            .declare(
                ResourceKind::Table,
                "brokerDataTable",
                Fields::new()
                    .with("attributes", Value::list([Value::map([("name", "id"), ("type", "S")])]))
                    .with("hash_key", "id"),
            )
            .unwrap();
        let function = graph
            .declare(
                ResourceKind::Function,
                "BrokerBackendFunction",
                Fields::new()
                    .with("role", graph.reference(&role, "arn").unwrap())
                    .with("runtime", runtime)
                    .with("handler", "broker.lambda_handler")
                    .with("code", "deploy.zip")
                    .with(
                        "environment",
                        Value::map([
                            ("DYNAMODB_TABLE_NAME", Value::from(graph.reference(&table, "name").unwrap())),
                            ("FINNHUB_API_KEY", Value::secret("finnhub-key")),
                        ]),
                    ),
            )
            .unwrap();
        let function_name = graph.reference(&function, "name").unwrap();
        graph.export("lambda_function_name", function_name).unwrap();
        graph
    }

    #[test]
    fn creates_in_dependency_order_and_records_outputs() {
        let ctx = context();
        let outcome = execute(&ctx, &graph("python3.9")).unwrap();

        let calls = ctx.provisioner().calls();
        assert_eq!(
            calls,
            vec![
                "create stockApiLambdaRole",
                "create brokerDataTable",
                "create BrokerBackendFunction",
            ]
        );

        let state = ctx.state_store().load().unwrap();
        let function = state.get(&name("BrokerBackendFunction")).unwrap();
        assert_eq!(outcome.outputs["lambda_function_name"], function.outputs["name"]);
        assert_eq!(state.outputs, outcome.outputs);
        assert!(function.dependencies.contains(&name("brokerDataTable")));
    }

    #[test]
    fn submitted_inputs_carry_resolved_outputs_and_plain_secrets() {
        let ctx = context();
        execute(&ctx, &graph("python3.9")).unwrap();

        let state = ctx.state_store().load().unwrap();
        let table_name = state.get(&name("brokerDataTable")).unwrap().outputs["name"].clone();
        let request = ctx.provisioner().last_request("BrokerBackendFunction").unwrap();
        let env = &request.inputs["environment"];
        assert_eq!(env["DYNAMODB_TABLE_NAME"], table_name.as_str());
        assert_eq!(env["FINNHUB_API_KEY"], "finnhub-key");

        let recorded = &state.get(&name("BrokerBackendFunction")).unwrap().inputs["environment"];
        assert!(recorded["FINNHUB_API_KEY"].as_str().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn second_apply_submits_nothing() {
        let ctx = context();
        execute(&ctx, &graph("python3.9")).unwrap();
        let version = ctx.state_store().version();

        let outcome = execute(&ctx, &graph("python3.9")).unwrap();
        assert!(!outcome.changed());
        assert_eq!(ctx.provisioner().calls().len(), 3);
        assert_eq!(ctx.state_store().version(), version);
    }

    #[test]
    fn in_place_change_updates_only_that_resource() {
        let ctx = context();
        execute(&ctx, &graph("python3.9")).unwrap();
        let before = ctx.state_store().load().unwrap();

        let outcome = execute(&ctx, &graph("python3.12")).unwrap();
        assert_eq!(outcome.operations.len(), 1);
        assert_eq!(ctx.provisioner().calls().last().unwrap(), "update BrokerBackendFunction");

        let after = ctx.state_store().load().unwrap();
        let function = name("BrokerBackendFunction");
        assert_eq!(after.get(&function).unwrap().outputs, before.get(&function).unwrap().outputs);
        assert_eq!(after.get(&function).unwrap().inputs["runtime"], "python3.12");
    }

    #[test]
    fn removed_resource_is_deleted() {
        let ctx = context();
        execute(&ctx, &graph("python3.9")).unwrap();

        let mut smaller = ResourceGraph::new();
        smaller
            .declare(
                ResourceKind::Role,
                "stockApiLambdaRole",
                Fields::new().with("assume_role_policy", Value::map([("Version", "2012-10-17")])),
            )
            .unwrap();
        execute(&ctx, &smaller).unwrap();

        let calls = ctx.provisioner().calls();
        assert_eq!(&calls[3..], ["delete BrokerBackendFunction", "delete brokerDataTable"]);
        let state = ctx.state_store().load().unwrap();
        assert_eq!(state.resources.len(), 1);
        assert!(state.outputs.is_empty());
    }

    #[test]
    fn failure_stops_apply_and_next_apply_converges() {
        let ctx = AppContext::new(
            RecordingProvisioner::wrapping(
                SimulatedProvisioner::new("ap-southeast-1", "123456789012")
                    .with_failure(&name("brokerDataTable"), "limit exceeded"),
            ),
            MemoryStateStore::new(),
        );

        let err = execute(&ctx, &graph("python3.9")).unwrap_err();
        assert_eq!(err.to_string(), "create of 'brokerDataTable' failed: limit exceeded");
        assert_eq!(ctx.provisioner().calls(), vec!["create stockApiLambdaRole"]);

        let state = ctx.state_store().load().unwrap();
        assert_eq!(state.resources.len(), 1);
        assert!(state.get(&name("stockApiLambdaRole")).is_some());

        ctx.provisioner().inner().recover(&name("brokerDataTable"));
        execute(&ctx, &graph("python3.9")).unwrap();
        assert_eq!(
            &ctx.provisioner().calls()[1..],
            ["create brokerDataTable", "create BrokerBackendFunction"]
        );
    }

    #[test]
    fn malformed_composite_identifier_aborts_apply() {
        let mut graph = ResourceGraph::new();
        let api = graph
            .declare(
                ResourceKind::Api,
                "stockHttpApi",
                Fields::new().with("name", "StockBrokerHttpApi").with("protocol_type", "HTTP"),
            )
            .unwrap();
        // Api ids carry no delimiter, so component 1 does not exist.
        let target = ResourceGraph::compose_identifier(graph.reference(&api, "id").unwrap(), "|", 1)
            .prefixed("integrations/");
        graph
            .declare(
                ResourceKind::Route,
                "stockQuotesRoute",
                Fields::new()
                    .with("api_id", graph.reference(&api, "id").unwrap())
                    .with("route_key", "GET /api/stock-quotes")
                    .with("target", target),
            )
            .unwrap();

        let ctx = context();
        let err = execute(&ctx, &graph).unwrap_err();
        assert!(matches!(err, AppError::MalformedIdentifier { index: 1, .. }));
        assert_eq!(ctx.provisioner().calls(), vec!["create stockHttpApi"]);
    }

    #[test]
    fn stale_state_version_is_a_conflict() {
        let ctx = context();
        execute(&ctx, &graph("python3.9")).unwrap();

        let stale = DeploymentState::default();
        assert!(matches!(
            ctx.state_store().save(&stale),
            Err(AppError::StateConflict { expected: 0, .. })
        ));
    }
}
