//! Field values carried by resource descriptors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value as Json;
use sha2::{Digest, Sha256};

use crate::domain::deferred::{DeferredValue, OutputLookup};
use crate::domain::{AppError, LogicalName};

/// A literal or deferred value assigned to a descriptor field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Sensitive string: submitted verbatim, recorded only as a digest.
    Secret(String),
    Deferred(DeferredValue),
}

/// How resolved values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Values sent to the provisioning engine.
    Submission,
    /// Values written to deployment state and compared when planning.
    Record,
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Build a list value.
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn secret(value: impl Into<String>) -> Self {
        Value::Secret(value.into())
    }

    /// Logical names of every resource this value reads outputs from.
    pub fn references(&self) -> BTreeSet<LogicalName> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut BTreeSet<LogicalName>) {
        match self {
            Value::Deferred(deferred) => names.extend(deferred.references()),
            Value::List(items) => items.iter().for_each(|item| item.collect_references(names)),
            Value::Map(entries) => {
                entries.values().for_each(|value| value.collect_references(names));
            }
            Value::String(_) | Value::Integer(_) | Value::Bool(_) | Value::Secret(_) => {}
        }
    }

    /// Resolve into JSON.
    ///
    /// Returns `Ok(None)` when any nested deferred value is still unknown.
    pub fn resolve(
        &self,
        lookup: &dyn OutputLookup,
        rendering: Rendering,
    ) -> Result<Option<Json>, AppError> {
        let resolved = match self {
            Value::String(s) => Json::String(s.clone()),
            Value::Integer(n) => Json::from(*n),
            Value::Bool(b) => Json::Bool(*b),
            Value::Secret(s) => match rendering {
                Rendering::Submission => Json::String(s.clone()),
                Rendering::Record => Json::String(secret_digest(s)),
            },
            Value::Deferred(deferred) => match deferred.resolve(lookup)? {
                Some(s) => Json::String(s),
                None => return Ok(None),
            },
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.resolve(lookup, rendering)? {
                        Some(value) => out.push(value),
                        None => return Ok(None),
                    }
                }
                Json::Array(out)
            }
            Value::Map(entries) => {
                let mut out = serde_json::Map::new();
                for (key, value) in entries {
                    match value.resolve(lookup, rendering)? {
                        Some(value) => {
                            out.insert(key.clone(), value);
                        }
                        None => return Ok(None),
                    }
                }
                Json::Object(out)
            }
        };
        Ok(Some(resolved))
    }
}

fn secret_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
    format!("sha256:{}", hex)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Secret(_) => write!(f, "[secret]"),
            Value::Deferred(deferred) => write!(f, "{}", deferred),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DeferredValue> for Value {
    fn from(value: DeferredValue) -> Self {
        Value::Deferred(value)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::list(items)
    }
}
