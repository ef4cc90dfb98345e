pub mod analyze;
pub mod cache;
pub mod config_cmd;
pub mod doctor;
pub mod providers;

use thirdvoice_config::AppConfig;

/// Load the effective configuration, reporting failures as a config error.
pub fn load_config() -> thirdvoice_core::Result<AppConfig> {
    AppConfig::load().map_err(|e| thirdvoice_core::Error::Config {
        message: e.to_string(),
    })
}
