//! Settings loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceSettings;
use crate::config::validation::validate_settings;
use crate::error::ConfigurationError;

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<ServiceSettings, ConfigurationError> {
    let content = fs::read_to_string(path)?;
    let settings = parse_settings(&content)?;

    tracing::debug!(path = %path.display(), "Settings loaded");
    Ok(settings)
}

/// Parse and validate settings from a TOML document.
pub fn parse_settings(content: &str) -> Result<ServiceSettings, ConfigurationError> {
    let settings: ServiceSettings = toml::from_str(content)?;
    validate_settings(&settings).map_err(ConfigurationError::Invalid)?;
    Ok(settings)
}
