//! Settings import/export.

use std::path::Path;

use log::info;

use crate::error::AppError;
use crate::settings::AppSettings;

pub fn export_settings(settings: &AppSettings, path: &Path) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|error| AppError::settings("export", path, error))?;
    std::fs::write(path, content).map_err(|error| AppError::settings("export", path, error))?;
    info!("Exported settings to {}", path.display());
    Ok(())
}

pub fn read_settings_file(path: &Path) -> Result<AppSettings, AppError> {
    let content =
        std::fs::read_to_string(path).map_err(|error| AppError::settings("import", path, error))?;
    serde_json::from_str(&content).map_err(|error| AppError::settings("import", path, error))
}

/// Replace the stored settings with the contents of `path`.
pub fn import_settings(path: &Path) -> Result<AppSettings, AppError> {
    let imported = read_settings_file(path)?;
    imported
        .save()
        .map_err(|error| AppError::settings("save", path, error))?;
    info!("Imported settings from {}", path.display());
    Ok(imported)
}
