//! Deployment configuration loading.

use std::fs;
use std::path::Path;

use crate::domain::{AppError, DeploymentConfig};

/// Default configuration file name, relative to the working directory.
pub const CONFIG_FILE: &str = "broker-stack.toml";

/// Load and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<DeploymentConfig, AppError> {
    if !path.exists() {
        return Err(AppError::ConfigNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    parse_config_content(&content)
}

/// Parse configuration from string content.
pub fn parse_config_content(content: &str) -> Result<DeploymentConfig, AppError> {
    let config: DeploymentConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Starter configuration written by `broker-stack init`.
pub fn config_template() -> &'static str {
    r#"# broker-stack deployment configuration.
#
# Secrets are never read from this file. Export them before planning:
#   FINNHUB_API_KEY, COGNITO_CLIENT_ID, COGNITO_CLIENT_SECRET
# DYNAMODB_TABLE_NAME and AWS_ACCOUNT_ID override [table].name and
# [provider].account_id when set.

[project]
name = "bro-ker"

[project.tags]
Project = "Bro-Ker"

[provider]
region = "ap-southeast-1"
# account_id = "123456789012"
engine = "simulated"
# endpoint = "https://provisioner.example.com/v1"

[table]
# name = "broker-data"
billing_mode = "PROVISIONED"
read_capacity = 5
write_capacity = 5

[function]
runtime = "python3.9"
handler = "broker.lambda_handler"
code = "../broker-backend/deploy.zip"
timeout_secs = 10
memory_mb = 128

[user_pool]
name = "BrokerAppUserPool"
client_name = "BrokerAppClient"
callback_urls = ["https://bro-ker.com/callback"]
logout_urls = ["https://bro-ker.com/logout"]

[api]
name = "StockBrokerHttpApi"
enforce_auth = true

[api.cors]
allow_origins = ["https://bro-ker.com", "http://localhost:5500", "http://127.0.0.1:5500"]
allow_methods = ["GET", "OPTIONS", "POST", "PUT", "DELETE"]
max_age = 300

# [api.domain]
# name = "api.bro-ker.com"
# certificate_arn = "arn:aws:acm:ap-southeast-1:123456789012:certificate/..."
"#
}
