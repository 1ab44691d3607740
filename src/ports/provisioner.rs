//! Provisioning engine port definition.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;

use crate::domain::{AppError, Attributes, LogicalName, ResourceKind};

/// Fully resolved inputs for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRequest {
    pub name: LogicalName,
    pub kind: ResourceKind,
    pub inputs: BTreeMap<String, Json>,
}

impl ResourceRequest {
    /// Text input `field`, if present.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.inputs.get(field).and_then(Json::as_str)
    }
}

/// Port for the external provisioning engine.
///
/// Each call is a single submission; failures are reported, not retried.
pub trait Provisioner {
    /// Create the resource and return its output attributes.
    fn create(&self, request: &ResourceRequest) -> Result<Attributes, AppError>;

    /// Update the resource in place and return its refreshed output attributes.
    fn update(&self, request: &ResourceRequest, current: &Attributes)
    -> Result<Attributes, AppError>;

    /// Delete the resource identified by its recorded outputs.
    fn delete(
        &self,
        name: &LogicalName,
        kind: ResourceKind,
        current: &Attributes,
    ) -> Result<(), AppError>;
}

impl<P: Provisioner + ?Sized> Provisioner for Box<P> {
    fn create(&self, request: &ResourceRequest) -> Result<Attributes, AppError> {
        (**self).create(request)
    }

    fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> Result<Attributes, AppError> {
        (**self).update(request, current)
    }

    fn delete(
        &self,
        name: &LogicalName,
        kind: ResourceKind,
        current: &Attributes,
    ) -> Result<(), AppError> {
        (**self).delete(name, kind, current)
    }
}
