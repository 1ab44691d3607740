use crate::app::AppContext;
use crate::domain::{AppError, Plan, Planner, ResourceGraph};
use crate::ports::{Provisioner, StateStore};

/// Diff `graph` against recorded state without submitting anything.
pub fn execute<P: Provisioner, S: StateStore>(
    ctx: &AppContext<P, S>,
    graph: &ResourceGraph,
) -> Result<Plan, AppError> {
    let state = ctx.state_store().load()?;
    Planner::plan(graph, &state)
}
