pub mod deployment_config;
pub mod loader;
pub mod parameters;

pub use deployment_config::{
    ApiConfig, CorsConfig, CustomDomainConfig, DeploymentConfig, EngineKind, FunctionConfig,
    ProjectConfig, ProviderConfig, TableConfig, UserPoolConfig,
};
pub use loader::{CONFIG_FILE, config_template, load_config, parse_config_content};
pub use parameters::DeploymentParameters;
