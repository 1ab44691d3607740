use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{AppError, DeploymentState};
use crate::ports::StateStore;

/// In-memory state store; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: Arc<Mutex<Option<DeploymentState>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn version(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.version)
            .unwrap_or(0)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<DeploymentState, AppError> {
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner).clone().unwrap_or_default())
    }

    fn save(&self, state: &DeploymentState) -> Result<u64, AppError> {
        let mut stored = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let found = stored.as_ref().map(|s| s.version).unwrap_or(0);
        if found != state.version {
            return Err(AppError::StateConflict { expected: state.version, found });
        }

        let mut next = state.clone();
        next.version += 1;
        let version = next.version;
        *stored = Some(next);
        Ok(version)
    }
}
