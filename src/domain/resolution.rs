//! Single-assignment output cells filled while a graph is applied.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use crate::domain::deferred::OutputLookup;
use crate::domain::{AppError, Attributes, LogicalName};

/// Output cells for every descriptor in a graph.
///
/// Each cell is written exactly once, when its resource is provisioned (or
/// found unchanged in recorded state). Reading an unwritten cell is an error.
#[derive(Debug, Default)]
pub struct ResolutionTable {
    cells: BTreeMap<LogicalName, OnceCell<Attributes>>,
}

impl ResolutionTable {
    pub fn new<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a LogicalName>,
    {
        Self { cells: names.into_iter().map(|name| (name.clone(), OnceCell::new())).collect() }
    }

    /// Record the outputs of `name`.
    pub fn resolve(&self, name: &LogicalName, attributes: Attributes) -> Result<(), AppError> {
        let cell =
            self.cells.get(name).ok_or_else(|| AppError::UnknownResource(name.to_string()))?;
        cell.set(attributes).map_err(|_| AppError::AlreadyResolved(name.to_string()))
    }
}

impl OutputLookup for ResolutionTable {
    fn output(&self, resource: &LogicalName, attribute: &str) -> Result<Option<String>, AppError> {
        let cell = self
            .cells
            .get(resource)
            .ok_or_else(|| AppError::UnknownResource(resource.to_string()))?;
        let attributes = cell.get().ok_or_else(|| AppError::NotYetResolved {
            resource: resource.to_string(),
            attribute: attribute.to_string(),
        })?;
        attributes.get(attribute).cloned().map(Some).ok_or_else(|| AppError::NotYetResolved {
            resource: resource.to_string(),
            attribute: attribute.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeferredValue;

    fn table() -> (ResolutionTable, LogicalName) {
        let name = LogicalName::new("stockHttpApi").unwrap();
        (ResolutionTable::new([&name]), name)
    }

    #[test]
    fn reading_before_provisioning_is_an_error() {
        let (table, name) = table();
        let err = DeferredValue::output(name, "id").resolve(&table).unwrap_err();
        assert!(matches!(err, AppError::NotYetResolved { ref attribute, .. } if attribute == "id"));
    }

    #[test]
    fn cells_are_single_assignment() {
        let (table, name) = table();
        let attrs = Attributes::from([("id".to_string(), "a1b2c3d4e5".to_string())]);

        table.resolve(&name, attrs).unwrap();
        let err = table
            .resolve(&name, Attributes::from([("id".to_string(), "f6g7h8i9j0".to_string())]))
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyResolved(_)));
        assert_eq!(table.output(&name, "id").unwrap().as_deref(), Some("a1b2c3d4e5"));
    }

    #[test]
    fn resolved_values_can_be_read_repeatedly() {
        let (table, name) = table();
        table
            .resolve(&name, Attributes::from([("id".to_string(), "a1b2c3d4e5".to_string())]))
            .unwrap();

        let value = DeferredValue::output(name, "id");
        assert_eq!(value.resolve(&table).unwrap().as_deref(), Some("a1b2c3d4e5"));
        assert_eq!(value.resolve(&table).unwrap().as_deref(), Some("a1b2c3d4e5"));
    }

    #[test]
    fn undeclared_resources_are_rejected() {
        let (table, _) = table();
        let other = LogicalName::new("brokerUserPool").unwrap();
        assert!(matches!(table.resolve(&other, Attributes::new()), Err(AppError::UnknownResource(_))));
    }
}
