//! Deployment state persistence port.

use crate::domain::{AppError, DeploymentState};

/// Port for loading and saving recorded deployment state.
pub trait StateStore {
    /// Load recorded state; an absent store yields empty state at version 0.
    fn load(&self) -> Result<DeploymentState, AppError>;

    /// Persist `state` and return the new version.
    ///
    /// Fails with `StateConflict` when the stored version is not `state.version`.
    fn save(&self, state: &DeploymentState) -> Result<u64, AppError>;
}
