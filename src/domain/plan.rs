//! Change planning: diff a desired graph against recorded state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value as Json;

use crate::domain::deferred::OutputLookup;
use crate::domain::{
    AppError, DeploymentState, Descriptor, LogicalName, Rendering, ResourceGraph, ResourceKind,
    ResourceRecord, UpdateMode,
};

/// Kind of call submitted to the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// One planned resource operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub action: Action,
    pub name: LogicalName,
    pub kind: ResourceKind,
    /// Fields whose change triggered the operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Half of a destroy-then-recreate pair.
    pub replacement: bool,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.action, self.replacement) {
            (Action::Create, false) => "+ create",
            (Action::Create, true) => "+ recreate",
            (Action::Update, _) => "~ update",
            (Action::Delete, false) => "- delete",
            (Action::Delete, true) => "- destroy",
        };
        write!(f, "{:<10} {} {}", label, self.kind, self.name)?;
        if !self.fields.is_empty() {
            write!(f, " ({})", self.fields.join(", "))?;
        }
        Ok(())
    }
}

/// What the plan does with a declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Create,
    Update(Vec<String>),
    Replace(Vec<String>),
    Unchanged,
}

impl Disposition {
    /// Whether the resource receives new outputs during apply.
    pub fn is_new(&self) -> bool {
        matches!(self, Disposition::Create | Disposition::Replace(_))
    }
}

/// Counts of planned changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.unchanged
        )
    }
}

/// Ordered operations that converge recorded state to the desired graph.
///
/// Destroys of replaced resources come first, dependents first, together with
/// removed resources that depend on them. Creates and updates follow in
/// submission order. Remaining removals come last, once the resources that
/// referenced them have been updated to let go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    operations: Vec<Operation>,
    dispositions: BTreeMap<LogicalName, Disposition>,
}

impl Plan {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn disposition(&self, name: &LogicalName) -> Option<&Disposition> {
        self.dispositions.get(name)
    }

    /// Declared resources left untouched by this plan.
    pub fn unchanged(&self) -> impl Iterator<Item = &LogicalName> {
        self.dispositions.iter().filter(|(_, d)| **d == Disposition::Unchanged).map(|(name, _)| name)
    }

    /// Operations that touch `name`, in plan order.
    pub fn operations_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Operation> + 'a {
        self.operations.iter().filter(move |op| op.name.as_str() == name)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for disposition in self.dispositions.values() {
            match disposition {
                Disposition::Create => summary.create += 1,
                Disposition::Update(_) => summary.update += 1,
                Disposition::Replace(_) => summary.replace += 1,
                Disposition::Unchanged => summary.unchanged += 1,
            }
        }
        summary.delete = self
            .operations
            .iter()
            .filter(|op| op.action == Action::Delete && !op.replacement)
            .count();
        summary
    }
}

/// Outputs as they will be known at apply time: recorded values for
/// resources keeping their identity, unknown for resources being recreated.
struct PlannedOutputs<'a> {
    state: &'a DeploymentState,
    pending: &'a BTreeSet<LogicalName>,
}

impl OutputLookup for PlannedOutputs<'_> {
    fn output(&self, resource: &LogicalName, attribute: &str) -> Result<Option<String>, AppError> {
        if self.pending.contains(resource) {
            return Ok(None);
        }
        self.state.output(resource, attribute)
    }
}

/// Computes plans from a graph and recorded state.
pub struct Planner;

impl Planner {
    pub fn plan(graph: &ResourceGraph, state: &DeploymentState) -> Result<Plan, AppError> {
        let order = graph.submission_order()?;

        let mut pending: BTreeSet<LogicalName> = BTreeSet::new();
        let mut replaced: BTreeSet<LogicalName> = BTreeSet::new();
        let mut planned: Vec<(&Descriptor, Disposition)> = Vec::with_capacity(order.len());

        for descriptor in order {
            let disposition = match state.get(descriptor.name()) {
                None => Disposition::Create,
                Some(record) if record.kind != descriptor.kind() => Disposition::Replace(Vec::new()),
                Some(record) => {
                    let lookup = PlannedOutputs { state, pending: &pending };
                    diff(descriptor, record, &lookup, &replaced)?
                }
            };
            if disposition.is_new() {
                pending.insert(descriptor.name().clone());
            }
            if matches!(disposition, Disposition::Replace(_)) {
                replaced.insert(descriptor.name().clone());
            }
            planned.push((descriptor, disposition));
        }

        let deletion_order = state.deletion_order()?;

        // Removed resources built on a destroyed resource must go before it.
        let mut doomed = replaced.clone();
        for name in deletion_order.iter().rev() {
            let Some(record) = state.get(name) else {
                continue;
            };
            if !graph.contains(name) && !record.dependencies.is_disjoint(&doomed) {
                doomed.insert(name.clone());
            }
        }

        let mut destroys = Vec::new();
        let mut removals = Vec::new();
        for name in deletion_order {
            let Some(record) = state.get(&name) else {
                continue;
            };
            let replaced_fields = planned.iter().find_map(|(d, disposition)| match disposition {
                Disposition::Replace(fields) if d.name() == &name => Some(fields.clone()),
                _ => None,
            });
            match replaced_fields {
                Some(fields) => destroys.push(Operation {
                    action: Action::Delete,
                    name,
                    kind: record.kind,
                    fields,
                    replacement: true,
                }),
                None if !graph.contains(&name) => {
                    let early = doomed.contains(&name);
                    let operation = Operation {
                        action: Action::Delete,
                        name,
                        kind: record.kind,
                        fields: Vec::new(),
                        replacement: false,
                    };
                    if early {
                        destroys.push(operation);
                    } else {
                        removals.push(operation);
                    }
                }
                None => {}
            }
        }

        let mut operations = destroys;
        for (descriptor, disposition) in &planned {
            let (action, fields, replacement) = match disposition {
                Disposition::Create => (Action::Create, Vec::new(), false),
                Disposition::Replace(fields) => (Action::Create, fields.clone(), true),
                Disposition::Update(fields) => (Action::Update, fields.clone(), false),
                Disposition::Unchanged => continue,
            };
            operations.push(Operation {
                action,
                name: descriptor.name().clone(),
                kind: descriptor.kind(),
                fields,
                replacement,
            });
        }
        operations.extend(removals);

        let dispositions = planned
            .into_iter()
            .map(|(descriptor, disposition)| (descriptor.name().clone(), disposition))
            .collect();
        let plan = Plan { operations, dispositions };
        tracing::debug!(summary = %plan.summary(), "planned changes");
        Ok(plan)
    }
}

enum Desired {
    Absent,
    Unknown,
    Known(Json),
}

/// Fields reading outputs of a `replaced` resource replace the descriptor too,
/// whatever their own update mode.
fn diff(
    descriptor: &Descriptor,
    record: &ResourceRecord,
    lookup: &dyn OutputLookup,
    replaced: &BTreeSet<LogicalName>,
) -> Result<Disposition, AppError> {
    let fields: BTreeSet<&str> = descriptor
        .fields()
        .iter()
        .map(|(name, _)| name.as_str())
        .chain(record.inputs.keys().map(String::as_str))
        .collect();

    let mut replace = Vec::new();
    let mut update = Vec::new();

    for field in fields {
        if descriptor.ignores(field) {
            continue;
        }

        let value = descriptor.fields().get(field);
        let desired = match value {
            None => Desired::Absent,
            Some(value) => match value.resolve(lookup, Rendering::Record)? {
                Some(json) => Desired::Known(json),
                None => Desired::Unknown,
            },
        };
        let follows_replacement =
            value.is_some_and(|value| !value.references().is_disjoint(replaced));

        let changed = match (desired, record.inputs.get(field)) {
            (Desired::Unknown, _) => true,
            (Desired::Absent, recorded) => recorded.is_some(),
            (Desired::Known(value), recorded) => recorded != Some(&value),
        };

        if changed {
            match descriptor.update_mode(field) {
                _ if follows_replacement => replace.push(field.to_string()),
                UpdateMode::Replace => replace.push(field.to_string()),
                UpdateMode::InPlace => update.push(field.to_string()),
            }
        }
    }

    Ok(if !replace.is_empty() {
        Disposition::Replace(replace)
    } else if !update.is_empty() {
        Disposition::Update(update)
    } else {
        Disposition::Unchanged
    })
}
