//! Deferred references to outputs that exist only after provisioning.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{AppError, LogicalName};

/// Source of resource output values.
///
/// `Ok(None)` means the value is legitimately unknown (the owning resource
/// has not been provisioned in the plan being evaluated). Implementations
/// that require every value to be known return `NotYetResolved` instead.
pub trait OutputLookup {
    fn output(&self, resource: &LogicalName, attribute: &str) -> Result<Option<String>, AppError>;
}

/// A lazily-resolved value derived from another resource's outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredValue {
    /// An output attribute of a resource.
    Output { resource: LogicalName, attribute: String },
    /// One component of a delimited composite identifier.
    Component { source: Box<DeferredValue>, delimiter: String, index: usize },
    /// Text interleaved with deferred values.
    Interpolate(Vec<Segment>),
}

/// Piece of an interpolated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Value(DeferredValue),
}

impl DeferredValue {
    pub fn output(resource: LogicalName, attribute: impl Into<String>) -> Self {
        DeferredValue::Output { resource, attribute: attribute.into() }
    }

    /// Select component `index` of `self` split on `delimiter`.
    pub fn component(self, delimiter: impl Into<String>, index: usize) -> Self {
        DeferredValue::Component { source: Box::new(self), delimiter: delimiter.into(), index }
    }

    /// Prefix the resolved value with literal text.
    pub fn prefixed(self, prefix: impl Into<String>) -> Self {
        DeferredValue::Interpolate(vec![Segment::Text(prefix.into()), Segment::Value(self)])
    }

    pub fn interpolate(segments: Vec<Segment>) -> Self {
        DeferredValue::Interpolate(segments)
    }

    /// Logical names of resources this value depends on.
    pub fn references(&self) -> BTreeSet<LogicalName> {
        let mut names = BTreeSet::new();
        self.collect(&mut names);
        names
    }

    fn collect(&self, names: &mut BTreeSet<LogicalName>) {
        match self {
            DeferredValue::Output { resource, .. } => {
                names.insert(resource.clone());
            }
            DeferredValue::Component { source, .. } => source.collect(names),
            DeferredValue::Interpolate(segments) => {
                for segment in segments {
                    if let Segment::Value(value) = segment {
                        value.collect(names);
                    }
                }
            }
        }
    }

    /// Resolve against `lookup`; `Ok(None)` propagates unknown inputs.
    pub fn resolve(&self, lookup: &dyn OutputLookup) -> Result<Option<String>, AppError> {
        match self {
            DeferredValue::Output { resource, attribute } => lookup.output(resource, attribute),
            DeferredValue::Component { source, delimiter, index } => match source.resolve(lookup)? {
                Some(composite) => split_component(&composite, delimiter, *index).map(Some),
                None => Ok(None),
            },
            DeferredValue::Interpolate(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(text) => out.push_str(text),
                        Segment::Value(value) => match value.resolve(lookup)? {
                            Some(resolved) => out.push_str(&resolved),
                            None => return Ok(None),
                        },
                    }
                }
                Ok(Some(out))
            }
        }
    }
}

/// Split a composite identifier and select one component.
///
/// Fails when the delimiter is empty or absent, or when `index` is out of range.
pub fn split_component(composite: &str, delimiter: &str, index: usize) -> Result<String, AppError> {
    let malformed = || AppError::MalformedIdentifier {
        value: composite.to_string(),
        delimiter: delimiter.to_string(),
        index,
    };

    if delimiter.is_empty() || !composite.contains(delimiter) {
        return Err(malformed());
    }

    composite.split(delimiter).nth(index).map(str::to_string).ok_or_else(malformed)
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredValue::Output { resource, attribute } => write!(f, "${{{}.{}}}", resource, attribute),
            DeferredValue::Component { source, delimiter, index } => {
                write!(f, "split({}, {:?})[{}]", source, delimiter, index)
            }
            DeferredValue::Interpolate(segments) => {
                write!(f, "\"")?;
                for segment in segments {
                    match segment {
                        Segment::Text(text) => write!(f, "{}", text)?,
                        Segment::Value(value) => write!(f, "{}", value)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}
