//! Startup pipeline: build the configuration namespace, resolve startup
//! secrets and install them before anything else reads configuration.

use crate::config::{
    load_base_sources, load_profile_sources, ConfigEnvironment, EnvVars, PropertyBag,
    PropertySource, ACTIVE_PROFILES_PROPERTY, COMMAND_LINE_SOURCE_NAME,
    SYSTEM_ENVIRONMENT_SOURCE_NAME,
};
use crate::infra::secrets::{install_properties, GcpSecretManagerClient, Resolution, SourceChain};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Inputs the binary collects from its command line.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Directory searched for `application*` files (and its `config/` child).
    pub config_dir: PathBuf,
    /// Comma-separated profiles, recorded as `spring.profiles.active`.
    pub profile: Option<String>,
    /// `key=value` overrides with command-line precedence.
    pub overrides: Vec<(String, String)>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            profile: None,
            overrides: Vec::new(),
        }
    }
}

/// Outcome of a successful bootstrap.
#[derive(Debug)]
pub struct Bootstrap {
    pub environment: ConfigEnvironment,
    pub resolution: Resolution,
}

/// Run the pipeline against the live process environment.
pub async fn bootstrap(options: &BootstrapOptions) -> Result<Bootstrap> {
    bootstrap_with(EnvVars::from_process(), options).await
}

/// Run the pipeline against an explicit environment snapshot.
pub async fn bootstrap_with(env: EnvVars, options: &BootstrapOptions) -> Result<Bootstrap> {
    let mut environment = build_environment(env, options)?;

    let client = GcpSecretManagerClient::from_environment(&environment);
    let resolution = SourceChain::new(client).resolve(&environment).await?;
    install_properties(&mut environment, resolution.properties.clone())?;

    Ok(Bootstrap {
        environment,
        resolution,
    })
}

/// Assemble the static layers: command line, environment variables and
/// `application*` files. The secret layer is not part of it yet.
pub fn build_environment(env: EnvVars, options: &BootstrapOptions) -> Result<ConfigEnvironment> {
    let mut command_line = PropertyBag::new(COMMAND_LINE_SOURCE_NAME);
    for (key, value) in &options.overrides {
        command_line.insert(key.as_str(), value.as_str());
    }
    if let Some(profile) = &options.profile {
        command_line.insert(ACTIVE_PROFILES_PROPERTY, profile.as_str());
    }

    let system = env.to_bag(SYSTEM_ENVIRONMENT_SOURCE_NAME);
    let mut environment = ConfigEnvironment::new(env);
    environment.add_last(PropertySource::new(COMMAND_LINE_SOURCE_NAME, command_line));
    environment.add_last(PropertySource::relaxed(SYSTEM_ENVIRONMENT_SOURCE_NAME, system));

    let root = options.config_dir.as_path();
    for source in load_base_sources(root)
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?
    {
        environment.add_last(source);
    }

    // Profile files rank above the base files, so they go right below the
    // environment layer.
    let profiles = environment.requested_profiles();
    let mut anchor = SYSTEM_ENVIRONMENT_SOURCE_NAME.to_string();
    for source in load_profile_sources(root, &profiles)
        .with_context(|| format!("Failed to load profile configuration from {}", root.display()))?
    {
        let name = source.name().to_string();
        environment.property_sources_mut().add_after(&anchor, source);
        anchor = name;
    }

    if profiles.is_empty() {
        debug!("No profiles requested");
    } else {
        info!("Active profiles: {}", profiles.join(", "));
    }
    environment.set_active_profiles(profiles);

    Ok(environment)
}

/// Parse a `key=value` override.
pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
