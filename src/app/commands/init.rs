use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::AppError;
use crate::domain::configuration::config_template;

/// Write a starter configuration to `path`.
pub fn execute(path: &Path) -> Result<PathBuf, AppError> {
    if path.exists() {
        return Err(AppError::ConfigExists(path.display().to_string()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config_template())?;
    Ok(path.to_path_buf())
}
