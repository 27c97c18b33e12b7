//! Cross-Platform Path Utilities
//!
//! Resolves the application directory (~/.contract-risk/) and its files.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

const APP_DIR_NAME: &str = ".contract-risk";
const CONFIG_FILE_NAME: &str = "config.json";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the application directory (~/.contract-risk/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(APP_DIR_NAME))
}

/// Get the config file path (~/.contract-risk/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the application directory, creating if it doesn't exist
pub fn ensure_app_dir() -> AppResult<PathBuf> {
    let path = app_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
