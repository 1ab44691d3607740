//! Deployment-time secrets and parameters.

use std::fmt;

use super::deployment_config::{DeploymentConfig, validate_account_id};
use crate::domain::AppError;

pub const FINNHUB_API_KEY: &str = "FINNHUB_API_KEY";
pub const COGNITO_CLIENT_ID: &str = "COGNITO_CLIENT_ID";
pub const COGNITO_CLIENT_SECRET: &str = "COGNITO_CLIENT_SECRET";
pub const DYNAMODB_TABLE_NAME: &str = "DYNAMODB_TABLE_NAME";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";

/// Values that must be known before the graph is built.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentParameters {
    pub finnhub_api_key: String,
    pub cognito_client_id: String,
    pub cognito_client_secret: String,
    pub table_name: String,
    pub account_id: String,
}

impl fmt::Debug for DeploymentParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentParameters")
            .field("finnhub_api_key", &"[REDACTED]")
            .field("cognito_client_id", &self.cognito_client_id)
            .field("cognito_client_secret", &"[REDACTED]")
            .field("table_name", &self.table_name)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl DeploymentParameters {
    /// Resolve from the process environment, falling back to `config`.
    pub fn from_env(config: &DeploymentConfig) -> Result<Self, AppError> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment values.
    ///
    /// Every absent or blank value is reported in one `MissingConfiguration`.
    pub fn resolve<F>(config: &DeploymentConfig, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut missing = Vec::new();
        let mut require = |key: &str, fallback: Option<&String>| {
            let value = read(key).or_else(|| fallback.filter(|v| !v.trim().is_empty()).cloned());
            if value.is_none() {
                missing.push(key.to_string());
            }
            value.unwrap_or_default()
        };

        let finnhub_api_key = require(FINNHUB_API_KEY, None);
        let cognito_client_id = require(COGNITO_CLIENT_ID, None);
        let cognito_client_secret = require(COGNITO_CLIENT_SECRET, None);
        let table_name = require(DYNAMODB_TABLE_NAME, config.table.name.as_ref());
        let account_id = require(AWS_ACCOUNT_ID, config.provider.account_id.as_ref());

        if !missing.is_empty() {
            return Err(AppError::MissingConfiguration(missing));
        }

        validate_account_id(&account_id)?;
        validate_table_name(&table_name)?;

        Ok(Self { finnhub_api_key, cognito_client_id, cognito_client_secret, table_name, account_id })
    }
}

fn validate_table_name(name: &str) -> Result<(), AppError> {
    let valid = (3..=255).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::config_error(format!("table name '{}' is not a valid table name", name)))
    }
}
