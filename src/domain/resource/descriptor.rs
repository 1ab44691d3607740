use std::collections::{BTreeMap, BTreeSet};

use super::kind::{FieldShape, ResourceKind, UpdateMode};
use super::value::Value;
use crate::domain::{AppError, LogicalName};

/// Output attributes assigned to a provisioned resource.
pub type Attributes = BTreeMap<String, String>;

/// Field values supplied when declaring a resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Insert only when `value` is present.
    pub fn with_opt<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-resource options that adjust planning behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Explicit ordering edges in addition to field references.
    pub depends_on: Vec<LogicalName>,
    /// Fields that force replacement beyond the schema's replace set.
    pub replace_on_changes: Vec<String>,
    /// Fields whose drift is never planned.
    pub ignore_changes: Vec<String>,
}

impl ResourceOptions {
    pub fn depends_on(mut self, name: &LogicalName) -> Self {
        self.depends_on.push(name.clone());
        self
    }

    pub fn replace_on_changes(mut self, fields: &[&str]) -> Self {
        self.replace_on_changes.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn ignore_changes(mut self, fields: &[&str]) -> Self {
        self.ignore_changes.extend(fields.iter().map(|f| f.to_string()));
        self
    }
}

/// Handle to a declared descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    name: LogicalName,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub(crate) fn new(name: LogicalName, kind: ResourceKind) -> Self {
        Self { name, kind }
    }

    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

/// A declared, schema-checked specification of one cloud resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    name: LogicalName,
    kind: ResourceKind,
    fields: Fields,
    options: ResourceOptions,
}

impl Descriptor {
    /// Validate `fields` and `options` against the schema of `kind`.
    pub fn new(
        name: LogicalName,
        kind: ResourceKind,
        fields: Fields,
        options: ResourceOptions,
    ) -> Result<Self, AppError> {
        let unknown = |field: &str| AppError::UnknownField {
            resource: name.to_string(),
            kind: kind.to_string(),
            field: field.to_string(),
        };

        for (field, value) in fields.iter() {
            let spec = kind.field(field).ok_or_else(|| unknown(field))?;
            if !shape_matches(spec.shape, value) {
                return Err(AppError::InvalidFieldValue {
                    resource: name.to_string(),
                    field: field.clone(),
                    expected: spec.shape.as_str().to_string(),
                });
            }
        }

        if let Some(spec) = kind.fields().iter().find(|spec| spec.required && fields.get(spec.name).is_none()) {
            return Err(AppError::MissingField {
                resource: name.to_string(),
                kind: kind.to_string(),
                field: spec.name.to_string(),
            });
        }

        for field in options.replace_on_changes.iter().chain(&options.ignore_changes) {
            if kind.field(field).is_none() {
                return Err(unknown(field));
            }
        }

        Ok(Self { name, kind, fields, options })
    }

    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// Every resource this descriptor must be submitted after.
    pub fn dependencies(&self) -> BTreeSet<LogicalName> {
        let mut deps: BTreeSet<LogicalName> =
            self.fields.iter().flat_map(|(_, value)| value.references()).collect();
        deps.extend(self.options.depends_on.iter().cloned());
        deps
    }

    /// Effective update semantics of `field`, honoring `replace_on_changes`.
    pub fn update_mode(&self, field: &str) -> UpdateMode {
        if self.options.replace_on_changes.iter().any(|f| f == field) {
            return UpdateMode::Replace;
        }
        self.kind.field(field).map_or(UpdateMode::InPlace, |spec| spec.update)
    }

    pub fn ignores(&self, field: &str) -> bool {
        self.options.ignore_changes.iter().any(|f| f == field)
    }
}

fn shape_matches(shape: FieldShape, value: &Value) -> bool {
    match value {
        // Deferred values always resolve to strings.
        Value::Deferred(_) | Value::String(_) | Value::Secret(_) => shape == FieldShape::Text,
        Value::Integer(_) => shape == FieldShape::Integer,
        Value::Bool(_) => shape == FieldShape::Bool,
        Value::List(_) => shape == FieldShape::List,
        Value::Map(_) => shape == FieldShape::Map,
    }
}
