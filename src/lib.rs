//! broker-stack: declare, plan and apply the Bro-Ker serverless backend as a
//! dependency-ordered resource graph.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::api::{
    ApplyOutcome, GraphEntry, GraphReport, LoadedStack, StackOptions, apply, graph, init,
    load_stack, outputs, plan, provisioner_for,
};
pub use domain::{
    AppError, DeferredValue, DeploymentConfig, DeploymentParameters, Fields, LogicalName, Plan,
    ResourceGraph, ResourceHandle, ResourceKind, Value, broker_stack,
};
