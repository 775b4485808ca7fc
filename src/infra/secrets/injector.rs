//! Installs resolved startup properties into the configuration namespace.

use crate::config::{
    ConfigEnvironment, PropertyBag, PropertySource, COMMAND_LINE_SOURCE_NAME,
    SECRET_PROPERTY_SOURCE_NAME,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InjectError {
    #[error("property source '{0}' is already installed; startup properties are resolved once per process")]
    AlreadyInstalled(String),
}

/// Install `properties` as the `gcp-secret-manager` layer.
///
/// The layer goes directly below the command-line layer, above environment
/// variables and static files. Empty bags install nothing and return
/// `Ok(false)`.
pub fn install_properties(
    environment: &mut ConfigEnvironment,
    properties: PropertyBag,
) -> Result<bool, InjectError> {
    let sources = environment.property_sources_mut();
    if sources.contains(SECRET_PROPERTY_SOURCE_NAME) {
        return Err(InjectError::AlreadyInstalled(SECRET_PROPERTY_SOURCE_NAME.to_string()));
    }

    if properties.is_empty() {
        debug!("No startup properties resolved, nothing to install");
        return Ok(false);
    }

    let count = properties.len();
    sources.add_after(
        COMMAND_LINE_SOURCE_NAME,
        PropertySource::new(SECRET_PROPERTY_SOURCE_NAME, properties),
    );
    info!("Successfully loaded {count} properties into environment");
    Ok(true)
}
