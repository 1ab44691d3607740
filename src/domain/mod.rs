pub mod configuration;
pub mod deferred;
pub mod error;
pub mod graph;
pub mod identities;
pub mod plan;
pub mod resolution;
pub mod resource;
pub mod stack;
pub mod state;

pub use configuration::{
    ApiConfig, CorsConfig, CustomDomainConfig, DeploymentConfig, DeploymentParameters, EngineKind,
    FunctionConfig, ProjectConfig, ProviderConfig, TableConfig, UserPoolConfig,
};
pub use deferred::{DeferredValue, OutputLookup, Segment, split_component};
pub use error::AppError;
pub use graph::ResourceGraph;
pub use identities::LogicalName;
pub use plan::{Action, Disposition, Operation, Plan, PlanSummary, Planner};
pub use resolution::ResolutionTable;
pub use resource::{
    Attributes, Descriptor, FieldShape, FieldSpec, Fields, Rendering, ResourceHandle, ResourceKind,
    ResourceOptions, UpdateMode, Value,
};
pub use stack::broker_stack;
pub use state::{DeploymentState, ResourceRecord};
