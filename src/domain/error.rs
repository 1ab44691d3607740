use std::io;

use thiserror::Error;

/// Library-wide error type for broker-stack operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// JSON encoding or decoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration value is present but invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration file already exists.
    #[error("Configuration file already exists: {0}")]
    ConfigExists(String),

    /// One or more required deployment parameters are absent.
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<String>),

    /// Logical name is invalid.
    #[error(
        "Invalid logical name '{0}': must start with a letter and contain only alphanumerics, hyphens, or underscores"
    )]
    InvalidLogicalName(String),

    /// Logical name collides with an existing descriptor.
    #[error("Resource '{0}' is already declared")]
    DuplicateName(String),

    /// Export key collides with an existing export.
    #[error("Output '{0}' is already exported")]
    DuplicateExport(String),

    /// Reference to a resource that is not part of the graph.
    #[error("Resource '{0}' is not declared")]
    UnknownResource(String),

    /// Field is not part of the resource type's schema.
    #[error("Field '{field}' is not defined for {kind} '{resource}'")]
    UnknownField { resource: String, kind: String, field: String },

    /// Required field was not supplied.
    #[error("Field '{field}' is required for {kind} '{resource}'")]
    MissingField { resource: String, kind: String, field: String },

    /// Literal field value does not match the schema's expected shape.
    #[error("Field '{field}' of '{resource}' expects {expected}")]
    InvalidFieldValue { resource: String, field: String, expected: String },

    /// Attribute is not an output of the resource type.
    #[error("Attribute '{attribute}' is not an output of {kind} '{resource}'")]
    UnknownAttribute { resource: String, kind: String, attribute: String },

    /// Reference cycle between descriptors.
    #[error("Circular dependency detected: {0}")]
    CyclicDependency(String),

    /// Deferred value read before its owning resource was provisioned.
    #[error("Output '{attribute}' of '{resource}' is not resolved yet")]
    NotYetResolved { resource: String, attribute: String },

    /// Resource outputs written more than once.
    #[error("Outputs of '{0}' were already resolved")]
    AlreadyResolved(String),

    /// Composite identifier could not be decomposed.
    #[error(
        "Malformed identifier '{value}': cannot select component {index} split on '{delimiter}'"
    )]
    MalformedIdentifier { value: String, delimiter: String, index: usize },

    /// Provisioning engine rejected an operation.
    #[error("{operation} of '{resource}' failed{}: {message}", status_suffix(.status))]
    Provisioning { operation: String, resource: String, message: String, status: Option<u16> },

    /// Recorded state changed underneath this deployment.
    #[error("State version conflict: expected {expected}, found {found}")]
    StateConflict { expected: u64, found: u64 },

    /// Recorded state could not be interpreted.
    #[error("State file is corrupt: {0}")]
    StateCorrupt(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {})", code)).unwrap_or_default()
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::InvalidConfig(message.into())
    }

    pub fn provisioning(
        operation: &str,
        resource: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        AppError::Provisioning {
            operation: operation.to_string(),
            resource: resource.into(),
            message: message.into(),
            status,
        }
    }

    /// Whether the error was raised locally before any external call could be made.
    pub fn is_graph_defect(&self) -> bool {
        matches!(
            self,
            AppError::InvalidLogicalName(_)
                | AppError::DuplicateName(_)
                | AppError::DuplicateExport(_)
                | AppError::UnknownResource(_)
                | AppError::UnknownField { .. }
                | AppError::MissingField { .. }
                | AppError::InvalidFieldValue { .. }
                | AppError::UnknownAttribute { .. }
                | AppError::CyclicDependency(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configuration_lists_every_key() {
        let err = AppError::MissingConfiguration(vec![
            "FINNHUB_API_KEY".to_string(),
            "COGNITO_CLIENT_SECRET".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration: FINNHUB_API_KEY, COGNITO_CLIENT_SECRET"
        );
    }

    #[test]
    fn provisioning_error_includes_status_when_known() {
        let err = AppError::provisioning("create", "brokerDataTable", "AccessDenied", Some(403));
        assert_eq!(err.to_string(), "create of 'brokerDataTable' failed (HTTP 403): AccessDenied");

        let err = AppError::provisioning("delete", "stockHttpApi", "quota exceeded", None);
        assert_eq!(err.to_string(), "delete of 'stockHttpApi' failed: quota exceeded");
    }

    #[test]
    fn graph_defects_are_classified() {
        assert!(AppError::CyclicDependency("a -> b".into()).is_graph_defect());
        assert!(!AppError::MissingConfiguration(vec![]).is_graph_defect());
    }
}
