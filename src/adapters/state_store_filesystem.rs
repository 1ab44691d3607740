use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::{AppError, DeploymentState};
use crate::ports::StateStore;

/// Directory holding recorded state, relative to the project root.
pub const STATE_DIR: &str = ".broker-stack";
pub const STATE_FILE: &str = "state.json";

/// JSON state file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FilesystemStateStore {
    path: PathBuf,
}

impl FilesystemStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default state file under `root`.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join(STATE_DIR).join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<DeploymentState>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&content).map_err(|e| {
            AppError::StateCorrupt(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Some(state))
    }
}

impl StateStore for FilesystemStateStore {
    fn load(&self) -> Result<DeploymentState, AppError> {
        Ok(self.read()?.unwrap_or_default())
    }

    fn save(&self, state: &DeploymentState) -> Result<u64, AppError> {
        let found = self.read()?.map(|stored| stored.version).unwrap_or(0);
        if found != state.version {
            return Err(AppError::StateConflict { expected: state.version, found });
        }

        let mut next = state.clone();
        next.version = state.version + 1;
        next.updated_at = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so readers never see a partial file.
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_string_pretty(&next)?)?;
        fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), version = next.version, "saved state");
        Ok(next.version)
    }
}
