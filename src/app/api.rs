//! API facade for the application.
//!
//! Glues configuration loading, context creation and command execution
//! together for the binary and for library callers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::adapters::state_store_filesystem::{STATE_DIR, STATE_FILE};
use crate::adapters::{FilesystemStateStore, HttpProvisioner, SimulatedProvisioner};
use crate::app::AppContext;
use crate::app::commands::{apply, graph, init, outputs, plan};
use crate::domain::configuration::{CONFIG_FILE, load_config};
use crate::domain::{
    AppError, DeploymentConfig, DeploymentParameters, EngineKind, Plan, ResourceGraph, broker_stack,
};
use crate::ports::Provisioner;

pub use crate::app::commands::apply::ApplyOutcome;
pub use crate::app::commands::graph::{GraphEntry, GraphReport};

/// Where configuration and state live, and which engine to use.
#[derive(Debug, Clone)]
pub struct StackOptions {
    pub root: PathBuf,
    /// Explicit configuration file; must exist when set.
    pub config_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    /// Overrides `provider.engine`.
    pub engine: Option<EngineKind>,
}

impl StackOptions {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), config_path: None, state_path: None, engine: None }
    }

    pub fn current() -> Result<Self, AppError> {
        Ok(Self::at(std::env::current_dir()?))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(|| self.root.join(CONFIG_FILE))
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| self.root.join(STATE_DIR).join(STATE_FILE))
    }
}

/// A configured stack ready to plan or apply.
pub struct LoadedStack {
    pub config: DeploymentConfig,
    pub params: DeploymentParameters,
    pub graph: ResourceGraph,
}

/// Load configuration and parameters, then build the broker graph.
///
/// Missing parameters fail here, before any engine is contacted.
pub fn load_stack(options: &StackOptions) -> Result<LoadedStack, AppError> {
    let mut config = load_configuration(options)?;
    if let Some(engine) = options.engine {
        config.provider.engine = engine;
    }
    let params = DeploymentParameters::from_env(&config)?;
    let graph = broker_stack(&config, &params)?;
    Ok(LoadedStack { config, params, graph })
}

fn load_configuration(options: &StackOptions) -> Result<DeploymentConfig, AppError> {
    match &options.config_path {
        Some(path) => load_config(path),
        None => {
            let path = options.root.join(CONFIG_FILE);
            if path.exists() {
                load_config(&path)
            } else {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(DeploymentConfig::default())
            }
        }
    }
}

/// Build the provisioning engine selected by `config`.
pub fn provisioner_for(
    config: &DeploymentConfig,
    params: &DeploymentParameters,
) -> Result<Box<dyn Provisioner>, AppError> {
    Ok(match config.provider.engine {
        EngineKind::Simulated => {
            Box::new(SimulatedProvisioner::new(&config.provider.region, &params.account_id))
        }
        EngineKind::Http => Box::new(HttpProvisioner::from_config(&config.provider)?),
    })
}

fn create_context(
    options: &StackOptions,
    stack: &LoadedStack,
) -> Result<AppContext<Box<dyn Provisioner>, FilesystemStateStore>, AppError> {
    let provisioner = provisioner_for(&stack.config, &stack.params)?;
    Ok(AppContext::new(provisioner, FilesystemStateStore::new(options.state_file())))
}

/// Write a starter configuration file.
pub fn init(options: &StackOptions) -> Result<PathBuf, AppError> {
    init::execute(&options.config_file())
}

/// Describe the graph in submission order.
pub fn graph(options: &StackOptions) -> Result<GraphReport, AppError> {
    let stack = load_stack(options)?;
    graph::execute(&stack.graph)
}

/// Plan changes against recorded state.
pub fn plan(options: &StackOptions) -> Result<Plan, AppError> {
    let stack = load_stack(options)?;
    let ctx = create_context(options, &stack)?;
    plan::execute(&ctx, &stack.graph)
}

/// Plan and apply changes.
pub fn apply(options: &StackOptions) -> Result<ApplyOutcome, AppError> {
    let stack = load_stack(options)?;
    let ctx = create_context(options, &stack)?;
    apply::execute(&ctx, &stack.graph)
}

/// Outputs exported by the last apply. Needs no configuration or secrets.
pub fn outputs(options: &StackOptions) -> Result<BTreeMap<String, String>, AppError> {
    outputs::execute(&FilesystemStateStore::new(options.state_file()))
}
