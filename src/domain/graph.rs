//! Resource graph construction and dependency ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    AppError, DeferredValue, Descriptor, Fields, LogicalName, ResourceHandle, ResourceKind,
    ResourceOptions,
};

/// Declared descriptors plus the values exported for external consumption.
#[derive(Debug, Default)]
pub struct ResourceGraph {
    descriptors: Vec<Descriptor>,
    index: BTreeMap<LogicalName, usize>,
    exports: BTreeMap<String, DeferredValue>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor with default options.
    pub fn declare(
        &mut self,
        kind: ResourceKind,
        name: &str,
        fields: Fields,
    ) -> Result<ResourceHandle, AppError> {
        self.declare_with_options(kind, name, fields, ResourceOptions::default())
    }

    /// Register a descriptor.
    ///
    /// Fails if `name` is invalid or already declared, or if `fields`/`options`
    /// do not satisfy the schema of `kind`.
    pub fn declare_with_options(
        &mut self,
        kind: ResourceKind,
        name: &str,
        fields: Fields,
        options: ResourceOptions,
    ) -> Result<ResourceHandle, AppError> {
        let name = LogicalName::new(name)?;
        if self.index.contains_key(&name) {
            return Err(AppError::DuplicateName(name.to_string()));
        }

        let descriptor = Descriptor::new(name.clone(), kind, fields, options)?;
        tracing::debug!(resource = %name, %kind, "declared resource");

        self.index.insert(name.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(ResourceHandle::new(name, kind))
    }

    /// Deferred reference to an output attribute of `handle`.
    pub fn reference(
        &self,
        handle: &ResourceHandle,
        attribute: &str,
    ) -> Result<DeferredValue, AppError> {
        let declared = self.get(handle.name()).map(Descriptor::kind);
        if declared != Some(handle.kind()) {
            return Err(AppError::UnknownResource(handle.name().to_string()));
        }
        if !handle.kind().has_output(attribute) {
            return Err(AppError::UnknownAttribute {
                resource: handle.name().to_string(),
                kind: handle.kind().to_string(),
                attribute: attribute.to_string(),
            });
        }
        Ok(DeferredValue::output(handle.name().clone(), attribute))
    }

    /// Select component `index` of a delimited composite identifier.
    ///
    /// Decomposition failure surfaces as `MalformedIdentifier` at resolution.
    pub fn compose_identifier(deferred: DeferredValue, delimiter: &str, index: usize) -> DeferredValue {
        deferred.component(delimiter, index)
    }

    /// Publish a value under `key` once the graph is applied.
    pub fn export(&mut self, key: &str, value: DeferredValue) -> Result<(), AppError> {
        if self.exports.contains_key(key) {
            return Err(AppError::DuplicateExport(key.to_string()));
        }
        self.exports.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &LogicalName) -> Option<&Descriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, name: &LogicalName) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn exports(&self) -> &BTreeMap<String, DeferredValue> {
        &self.exports
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors ordered so each appears after everything it references.
    ///
    /// Ties keep declaration order. Fails on dangling references and cycles.
    pub fn submission_order(&self) -> Result<Vec<&Descriptor>, AppError> {
        let nodes: Vec<(LogicalName, BTreeSet<LogicalName>)> =
            self.descriptors.iter().map(|d| (d.name().clone(), d.dependencies())).collect();

        for value in self.exports.values() {
            if let Some(missing) = value.references().into_iter().find(|name| !self.contains(name)) {
                return Err(AppError::UnknownResource(missing.to_string()));
            }
        }

        let order = dependency_order(&nodes, true)?;
        Ok(order.into_iter().map(|i| &self.descriptors[i]).collect())
    }
}

/// Kahn's algorithm over `(name, dependencies)` pairs; returns node indices.
///
/// With `strict`, a dependency on a name outside `nodes` is an error;
/// otherwise it is ignored.
pub(crate) fn dependency_order(
    nodes: &[(LogicalName, BTreeSet<LogicalName>)],
    strict: bool,
) -> Result<Vec<usize>, AppError> {
    let index: BTreeMap<&LogicalName, usize> =
        nodes.iter().enumerate().map(|(i, (name, _))| (name, i)).collect();

    // Edge i -> j means i depends on j (j must come first)
    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (i, (_, deps)) in nodes.iter().enumerate() {
        for dep in deps {
            match index.get(dep) {
                Some(&j) => {
                    in_degree[i] += 1;
                    dependents[j].push(i);
                }
                None if strict => return Err(AppError::UnknownResource(dep.to_string())),
                None => {}
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = ready.pop_first() {
        order.push(current);
        for &dependent in &dependents[current] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(AppError::CyclicDependency(describe_cycle(nodes, &index, &in_degree)));
    }

    Ok(order)
}

/// Walk unresolved nodes until one repeats; every unresolved node has an
/// unresolved dependency, so the walk always closes a cycle.
fn describe_cycle(
    nodes: &[(LogicalName, BTreeSet<LogicalName>)],
    index: &BTreeMap<&LogicalName, usize>,
    in_degree: &[usize],
) -> String {
    let blocked = |i: usize| in_degree[i] > 0;
    let Some(start) = (0..nodes.len()).find(|&i| blocked(i)) else {
        return String::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = nodes[current].1.iter().filter_map(|dep| index.get(dep).copied()).find(|&j| blocked(j));
        let Some(next) = next else {
            break;
        };
        if let Some(pos) = path.iter().position(|&i| i == next) {
            let mut cycle: Vec<&str> = path[pos..].iter().map(|&i| nodes[i].0.as_str()).collect();
            cycle.push(nodes[next].0.as_str());
            return cycle.join(" -> ");
        }
        path.push(next);
        current = next;
    }

    path.iter().map(|&i| nodes[i].0.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;
    use proptest::prelude::*;

    fn position(order: &[&Descriptor], name: &str) -> usize {
        order.iter().position(|d| d.name().as_str() == name).unwrap()
    }

    fn role_fields() -> Fields {
        Fields::new().with("assume_role_policy", Value::map([("Version", "2012-10-17")]))
    }

    fn table_fields() -> Fields {
        Fields::new()
            .with("attributes", Value::list([Value::map([("name", "id"), ("type", "S")])]))
            .with("hash_key", "id")
    }

    fn function_fields(role_arn: DeferredValue) -> Fields {
        Fields::new()
            .with("role", role_arn)
            .with("runtime", "python3.9")
            .with("handler", "broker.lambda_handler")
            .with("code", "deploy.zip")
    }

    #[test]
    fn example_graph_orders_references_first() {
        let mut graph = ResourceGraph::new();
        let role = graph.declare(ResourceKind::Role, "R", role_fields()).unwrap();
        let table = graph.declare(ResourceKind::Table, "T", table_fields()).unwrap();
        let table_arn = graph.reference(&table, "arn").unwrap();
        graph
            .declare(
                ResourceKind::Policy,
                "P",
                Fields::new().with("policy", Value::map([("Resource", table_arn)])),
            )
            .unwrap();
        let role_arn = graph.reference(&role, "arn").unwrap();
        graph.declare(ResourceKind::Function, "F", function_fields(role_arn)).unwrap();

        let order = graph.submission_order().unwrap();
        assert!(position(&order, "R") < position(&order, "P"));
        assert!(position(&order, "T") < position(&order, "P"));
        assert!(position(&order, "R") < position(&order, "F"));
    }

    #[test]
    fn forward_references_are_ordered_by_dependency() {
        let mut graph = ResourceGraph::new();
        let role = LogicalName::new("R").unwrap();
        graph
            .declare(
                ResourceKind::Function,
                "F",
                function_fields(DeferredValue::output(role, "arn")),
            )
            .unwrap();
        graph.declare(ResourceKind::Role, "R", role_fields()).unwrap();

        let order = graph.submission_order().unwrap();
        assert!(position(&order, "R") < position(&order, "F"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = ResourceGraph::new();
        graph.declare(ResourceKind::Role, "R", role_fields()).unwrap();
        let err = graph.declare(ResourceKind::Table, "R", table_fields()).unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(ref name) if name == "R"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn cycles_are_detected_with_path() {
        let mut graph = ResourceGraph::new();
        let a = LogicalName::new("A").unwrap();
        let b = LogicalName::new("B").unwrap();
        graph
            .declare_with_options(
                ResourceKind::Role,
                "A",
                role_fields(),
                ResourceOptions::default().depends_on(&b),
            )
            .unwrap();
        graph
            .declare_with_options(
                ResourceKind::Role,
                "B",
                role_fields(),
                ResourceOptions::default().depends_on(&a),
            )
            .unwrap();

        let err = graph.submission_order().unwrap_err();
        match err {
            AppError::CyclicDependency(path) => assert_eq!(path, "A -> B -> A"),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut graph = ResourceGraph::new();
        let policy = LogicalName::new("P").unwrap();
        graph
            .declare(
                ResourceKind::Policy,
                "P",
                Fields::new()
                    .with("policy", Value::map([("Resource", DeferredValue::output(policy, "arn"))])),
            )
            .unwrap();

        assert!(matches!(graph.submission_order(), Err(AppError::CyclicDependency(_))));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let mut graph = ResourceGraph::new();
        let ghost = LogicalName::new("ghost").unwrap();
        graph
            .declare_with_options(
                ResourceKind::Role,
                "R",
                role_fields(),
                ResourceOptions::default().depends_on(&ghost),
            )
            .unwrap();
        assert!(matches!(graph.submission_order(), Err(AppError::UnknownResource(ref n)) if n == "ghost"));
    }

    #[test]
    fn reference_validates_attribute() {
        let mut graph = ResourceGraph::new();
        let table = graph.declare(ResourceKind::Table, "T", table_fields()).unwrap();

        assert!(graph.reference(&table, "arn").is_ok());
        let err = graph.reference(&table, "invoke_arn").unwrap_err();
        assert!(matches!(err, AppError::UnknownAttribute { .. }));
    }

    #[test]
    fn reference_rejects_foreign_handles() {
        let mut other = ResourceGraph::new();
        let handle = other.declare(ResourceKind::Table, "T", table_fields()).unwrap();

        let graph = ResourceGraph::new();
        assert!(matches!(graph.reference(&handle, "arn"), Err(AppError::UnknownResource(_))));
    }

    #[test]
    fn duplicate_exports_are_rejected() {
        let mut graph = ResourceGraph::new();
        let table = graph.declare(ResourceKind::Table, "T", table_fields()).unwrap();
        let name = graph.reference(&table, "name").unwrap();

        graph.export("dynamodb_table_name", name.clone()).unwrap();
        assert!(matches!(
            graph.export("dynamodb_table_name", name),
            Err(AppError::DuplicateExport(_))
        ));
    }

    #[test]
    fn exports_must_reference_declared_resources() {
        let mut graph = ResourceGraph::new();
        graph
            .export("ghost", DeferredValue::output(LogicalName::new("ghost").unwrap(), "id"))
            .unwrap();
        assert!(matches!(graph.submission_order(), Err(AppError::UnknownResource(_))));
    }

    proptest! {
        #[test]
        fn submission_order_respects_every_edge(
            size in 1usize..12,
            raw_edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
        ) {
            let names: Vec<LogicalName> =
                (0..size).map(|i| LogicalName::new(&format!("node{}", i)).unwrap()).collect();
            // Only keep edges from higher to lower index so the graph stays acyclic.
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .filter(|&(from, to)| from < size && to < from)
                .collect();

            let mut graph = ResourceGraph::new();
            for i in (0..size).rev() {
                let mut options = ResourceOptions::default();
                for &(_, to) in edges.iter().filter(|&&(from, _)| from == i) {
                    options = options.depends_on(&names[to]);
                }
                graph.declare_with_options(ResourceKind::Role, &names[i], role_fields(), options).unwrap();
            }

            let order = graph.submission_order().unwrap();
            prop_assert_eq!(order.len(), size);
            for (from, to) in edges {
                prop_assert!(position(&order, &names[to]) < position(&order, &names[from]));
            }
        }
    }
}
