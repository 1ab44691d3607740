use std::sync::{Mutex, PoisonError};

use crate::adapters::SimulatedProvisioner;
use crate::domain::{AppError, Attributes, LogicalName, ResourceKind};
use crate::ports::{Provisioner, ResourceRequest};

/// Simulated engine that records every successful call.
pub struct RecordingProvisioner {
    inner: SimulatedProvisioner,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<ResourceRequest>>,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::wrapping(SimulatedProvisioner::new("ap-southeast-1", "123456789012"))
    }

    pub fn wrapping(inner: SimulatedProvisioner) -> Self {
        Self { inner, calls: Mutex::new(vec![]), requests: Mutex::new(vec![]) }
    }

    pub fn inner(&self) -> &SimulatedProvisioner {
        &self.inner
    }

    /// `"{action} {name}"` for each successful call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent create or update request for `name`.
    pub fn last_request(&self, name: &str) -> Option<ResourceRequest> {
        let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        requests.iter().rev().find(|r| r.name.as_str() == name).cloned()
    }

    fn record(&self, action: &str, name: &LogicalName, request: Option<&ResourceRequest>) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(format!("{} {}", action, name));
        if let Some(request) = request {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        }
    }
}

impl Provisioner for RecordingProvisioner {
    fn create(&self, request: &ResourceRequest) -> Result<Attributes, AppError> {
        let outputs = self.inner.create(request)?;
        self.record("create", &request.name, Some(request));
        Ok(outputs)
    }

    fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> Result<Attributes, AppError> {
        let outputs = self.inner.update(request, current)?;
        self.record("update", &request.name, Some(request));
        Ok(outputs)
    }

    fn delete(
        &self,
        name: &LogicalName,
        kind: ResourceKind,
        current: &Attributes,
    ) -> Result<(), AppError> {
        self.inner.delete(name, kind, current)?;
        self.record("delete", name, None);
        Ok(())
    }
}
