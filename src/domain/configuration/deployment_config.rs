//! Deployment configuration domain models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::AppError;

/// Configuration for a deployment loaded from `broker-stack.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub function: FunctionConfig,
    #[serde(default)]
    pub user_pool: UserPoolConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl DeploymentConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        self.project.validate()?;
        self.provider.validate()?;
        self.table.validate()?;
        self.function.validate()?;
        self.user_pool.validate()?;
        self.api.validate()?;
        Ok(())
    }
}

/// Project-wide naming and tagging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,
    /// Tags applied to every taggable resource.
    #[serde(default = "default_project_tags")]
    pub tags: BTreeMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: default_project_name(), tags: default_project_tags() }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::config_error("project.name must not be empty"));
        }
        Ok(())
    }
}

fn default_project_name() -> String {
    "bro-ker".to_string()
}

fn default_project_tags() -> BTreeMap<String, String> {
    BTreeMap::from([("Project".to_string(), "Bro-Ker".to_string())])
}

/// Which provisioning engine executes planned operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Local deterministic engine; nothing leaves the machine.
    #[default]
    Simulated,
    /// Remote control-plane service reached over HTTP.
    Http,
}

/// Provider account, region, and engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Account id; `AWS_ACCOUNT_ID` takes precedence when set.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub engine: EngineKind,
    /// Control-plane endpoint for the HTTP engine.
    #[serde(default)]
    pub endpoint: Option<Url>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            account_id: None,
            engine: EngineKind::default(),
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let region_ok = !self.region.is_empty()
            && self.region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !region_ok {
            return Err(AppError::config_error(format!(
                "provider.region '{}' is not a valid region name",
                self.region
            )));
        }
        if let Some(account) = &self.account_id {
            validate_account_id(account)?;
        }
        if self.timeout_secs == 0 {
            return Err(AppError::config_error("provider.timeout_secs must be greater than 0"));
        }
        if self.engine == EngineKind::Http && self.endpoint.is_none() {
            return Err(AppError::config_error(
                "provider.endpoint is required when provider.engine = \"http\"",
            ));
        }
        Ok(())
    }
}

/// Account ids are exactly twelve digits.
pub fn validate_account_id(account: &str) -> Result<(), AppError> {
    if account.len() == 12 && account.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::config_error(format!("account id '{}' must be 12 digits", account)))
    }
}

fn default_region() -> String {
    "ap-southeast-1".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Broker data table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Physical table name; `DYNAMODB_TABLE_NAME` takes precedence when set.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_billing_mode")]
    pub billing_mode: String,
    #[serde(default = "default_capacity")]
    pub read_capacity: u32,
    #[serde(default = "default_capacity")]
    pub write_capacity: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: None,
            billing_mode: default_billing_mode(),
            read_capacity: default_capacity(),
            write_capacity: default_capacity(),
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.billing_mode.as_str() {
            "PROVISIONED" => {
                if self.read_capacity == 0 || self.write_capacity == 0 {
                    return Err(AppError::config_error(
                        "table capacities must be greater than 0 in PROVISIONED mode",
                    ));
                }
            }
            "PAY_PER_REQUEST" => {}
            other => {
                return Err(AppError::config_error(format!(
                    "table.billing_mode '{}' must be PROVISIONED or PAY_PER_REQUEST",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn is_provisioned(&self) -> bool {
        self.billing_mode == "PROVISIONED"
    }
}

fn default_billing_mode() -> String {
    "PROVISIONED".to_string()
}

fn default_capacity() -> u32 {
    5
}

/// Compute function settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfig {
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default = "default_handler")]
    pub handler: String,
    /// Deployment package path.
    #[serde(default = "default_code")]
    pub code: String,
    #[serde(default = "default_function_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_memory")]
    pub memory_mb: u32,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            handler: default_handler(),
            code: default_code(),
            timeout_secs: default_function_timeout(),
            memory_mb: default_memory(),
        }
    }
}

impl FunctionConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=900).contains(&self.timeout_secs) {
            return Err(AppError::config_error("function.timeout_secs must be between 1 and 900"));
        }
        if !(128..=10240).contains(&self.memory_mb) {
            return Err(AppError::config_error("function.memory_mb must be between 128 and 10240"));
        }
        if self.handler.trim().is_empty() || self.code.trim().is_empty() {
            return Err(AppError::config_error("function.handler and function.code must be set"));
        }
        Ok(())
    }
}

fn default_runtime() -> String {
    "python3.9".to_string()
}

fn default_handler() -> String {
    "broker.lambda_handler".to_string()
}

fn default_code() -> String {
    "../broker-backend/deploy.zip".to_string()
}

fn default_function_timeout() -> u32 {
    10
}

fn default_memory() -> u32 {
    128
}

/// Identity service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPoolConfig {
    #[serde(default = "default_pool_name")]
    pub name: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_password_length")]
    pub password_min_length: u32,
    #[serde(default = "default_callback_urls")]
    pub callback_urls: Vec<String>,
    #[serde(default = "default_logout_urls")]
    pub logout_urls: Vec<String>,
}

impl Default for UserPoolConfig {
    fn default() -> Self {
        Self {
            name: default_pool_name(),
            client_name: default_client_name(),
            password_min_length: default_password_length(),
            callback_urls: default_callback_urls(),
            logout_urls: default_logout_urls(),
        }
    }
}

impl UserPoolConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(6..=99).contains(&self.password_min_length) {
            return Err(AppError::config_error(
                "user_pool.password_min_length must be between 6 and 99",
            ));
        }
        for url in self.callback_urls.iter().chain(&self.logout_urls) {
            Url::parse(url).map_err(|e| {
                AppError::config_error(format!("user_pool URL '{}' is invalid: {}", url, e))
            })?;
        }
        Ok(())
    }
}

fn default_pool_name() -> String {
    "BrokerAppUserPool".to_string()
}

fn default_client_name() -> String {
    "BrokerAppClient".to_string()
}

fn default_password_length() -> u32 {
    8
}

fn default_callback_urls() -> Vec<String> {
    vec!["https://bro-ker.com/callback".to_string()]
}

fn default_logout_urls() -> Vec<String> {
    vec!["https://bro-ker.com/logout".to_string()]
}

/// HTTP routing layer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_api_name")]
    pub name: String,
    /// Require a JWT issued by the user pool on every route.
    #[serde(default = "default_true")]
    pub enforce_auth: bool,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Optional custom domain mapped to the `$default` stage.
    #[serde(default)]
    pub domain: Option<CustomDomainConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: default_api_name(),
            enforce_auth: default_true(),
            cors: CorsConfig::default(),
            domain: None,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        self.cors.validate()?;
        if let Some(domain) = &self.domain {
            domain.validate()?;
        }
        Ok(())
    }
}

fn default_api_name() -> String {
    "StockBrokerHttpApi".to_string()
}

fn default_true() -> bool {
    true
}

/// Cross-origin settings of the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<String>,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: Vec<String>,
    #[serde(default = "default_max_age")]
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
            max_age: default_max_age(),
        }
    }
}

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "*"];

impl CorsConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(method) = self.allow_methods.iter().find(|m| !HTTP_METHODS.contains(&m.as_str())) {
            return Err(AppError::config_error(format!(
                "api.cors.allow_methods contains unknown method '{}'",
                method
            )));
        }
        if self.max_age > 86_400 {
            return Err(AppError::config_error("api.cors.max_age must not exceed 86400"));
        }
        Ok(())
    }
}

fn default_allow_origins() -> Vec<String> {
    ["https://bro-ker.com", "http://localhost:5500", "http://127.0.0.1:5500"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allow_methods() -> Vec<String> {
    ["GET", "OPTIONS", "POST", "PUT", "DELETE"].iter().map(|s| s.to_string()).collect()
}

fn default_allow_headers() -> Vec<String> {
    ["Content-Type", "X-Amz-Date", "Authorization", "X-Api-Key", "X-Amz-Security-Token"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_age() -> u32 {
    300
}

/// Custom domain backed by an existing regional certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomDomainConfig {
    pub name: String,
    pub certificate_arn: String,
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,
}

impl CustomDomainConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || !self.name.contains('.') {
            return Err(AppError::config_error(format!(
                "api.domain.name '{}' is not a domain name",
                self.name
            )));
        }
        if !self.certificate_arn.starts_with("arn:aws:acm:") {
            return Err(AppError::config_error("api.domain.certificate_arn must be an ACM ARN"));
        }
        if !matches!(self.endpoint_type.as_str(), "REGIONAL" | "EDGE") {
            return Err(AppError::config_error("api.domain.endpoint_type must be REGIONAL or EDGE"));
        }
        Ok(())
    }
}

fn default_endpoint_type() -> String {
    "REGIONAL".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_config_defaults() {
        let config = DeploymentConfig::default();
        assert_eq!(config.provider.region, "ap-southeast-1");
        assert_eq!(config.provider.engine, EngineKind::Simulated);
        assert_eq!(config.table.read_capacity, 5);
        assert_eq!(config.function.runtime, "python3.9");
        assert!(config.api.enforce_auth);
        assert_eq!(config.api.cors.allow_methods, vec!["GET", "OPTIONS", "POST", "PUT", "DELETE"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn http_engine_requires_endpoint() {
        let provider = ProviderConfig { engine: EngineKind::Http, ..Default::default() };
        assert!(provider.validate().is_err());

        let provider = ProviderConfig {
            engine: EngineKind::Http,
            endpoint: Some(Url::parse("https://engine.internal").unwrap()),
            ..Default::default()
        };
        assert!(provider.validate().is_ok());
    }

    #[test]
    fn validate_account_id_format() {
        assert!(validate_account_id("123456789012").is_ok());
        assert!(validate_account_id("12345").is_err());
        assert!(validate_account_id("12345678901a").is_err());
    }

    #[test]
    fn validate_region_name() {
        let provider = ProviderConfig { region: "AP South".to_string(), ..Default::default() };
        assert!(provider.validate().is_err());
    }

    #[test]
    fn validate_table_billing_mode() {
        let table = TableConfig { billing_mode: "ON_DEMAND".to_string(), ..Default::default() };
        assert!(table.validate().is_err());

        let table = TableConfig { read_capacity: 0, ..Default::default() };
        assert!(table.validate().is_err());

        let table =
            TableConfig { billing_mode: "PAY_PER_REQUEST".to_string(), read_capacity: 0, ..Default::default() };
        assert!(table.validate().is_ok());
    }

    #[test]
    fn validate_cors_methods() {
        let cors = CorsConfig { allow_methods: vec!["FETCH".to_string()], ..Default::default() };
        assert!(cors.validate().is_err());
    }

    #[test]
    fn validate_function_limits() {
        let function = FunctionConfig { memory_mb: 64, ..Default::default() };
        assert!(function.validate().is_err());
    }

    #[test]
    fn validate_custom_domain() {
        let domain = CustomDomainConfig {
            name: "api.bro-ker.com".to_string(),
            certificate_arn: "arn:aws:acm:ap-southeast-1:123456789012:certificate/abc".to_string(),
            endpoint_type: default_endpoint_type(),
        };
        assert!(domain.validate().is_ok());

        let domain = CustomDomainConfig { certificate_arn: "cert".to_string(), ..domain };
        assert!(domain.validate().is_err());
    }
}
