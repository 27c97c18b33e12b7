//! Settings Commands
//!
//! Commands for reading and updating application settings.

use crate::models::response::CommandResponse;
use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::storage::config::ConfigService;

/// Effective settings: the persisted ones with `overrides` applied on top.
///
/// Overrides only live for this run and are never written back.
pub fn get_settings(
    service: &ConfigService,
    overrides: Option<SettingsUpdate>,
) -> CommandResponse<AppConfig> {
    let mut config = service.get_config_clone();
    if let Some(update) = overrides {
        config.apply_update(update);
    }
    match config.validate() {
        Ok(()) => CommandResponse::ok(config),
        Err(e) => CommandResponse::err(e),
    }
}

/// Update application settings with a partial update
pub fn update_settings(
    service: &mut ConfigService,
    update: SettingsUpdate,
) -> CommandResponse<AppConfig> {
    service.update_config(update).into()
}

/// Restore default settings
pub fn reset_settings(service: &mut ConfigService) -> CommandResponse<AppConfig> {
    match service.reset() {
        Ok(()) => CommandResponse::ok(service.get_config_clone()),
        Err(e) => CommandResponse::err(e.to_string()),
    }
}
