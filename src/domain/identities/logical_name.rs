use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::validation::validate_identifier;
use crate::domain::AppError;

/// A validated logical resource name, unique within a resource graph.
///
/// Guarantees:
/// - Starts with an ASCII letter
/// - Contains only alphanumeric characters, `-`, or `_`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalName(String);

impl LogicalName {
    /// Validate and create a new instance.
    pub fn new(name: &str) -> Result<Self, AppError> {
        if validate_identifier(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(AppError::InvalidLogicalName(name.to_string()))
        }
    }

    /// Return the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for LogicalName {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        self
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LogicalName> for String {
    fn from(val: LogicalName) -> Self {
        val.0
    }
}

impl Serialize for LogicalName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LogicalName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogicalName::new(&s).map_err(serde::de::Error::custom)
    }
}
