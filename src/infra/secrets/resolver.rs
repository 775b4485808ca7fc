//! Source chain: picks the primary tier and merges the direct override.
//!
//! 1. Cloud Run secret env var; if it yields properties it is primary.
//! 2. Otherwise the Secret Manager API; a fatal failure aborts here.
//! 3. The direct MongoDB URI override fills the URI key if still missing.

use super::client::SecretManagerClient;
use super::cloud_run::CloudRunEnvSource;
use super::direct_env::DirectEnvFallbackSource;
use super::profile::resolve_active_profile;
use super::secret_manager::SecretManagerApiSource;
use super::types::{Profile, ResolutionContext, ResolveError, SecretSource, SourceAttempt, Tier};
use crate::config::{
    ConfigEnvironment, PropertyBag, DEFAULT_MONGODB_URI, MONGODB_URI_PROPERTY,
    SECRET_PROPERTY_SOURCE_NAME,
};
use tracing::{debug, info, warn};

/// Result of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub profile: Option<Profile>,
    /// Tier that produced the bulk of the properties, if any.
    pub primary_tier: Option<Tier>,
    /// Whether the direct env override supplied the MongoDB URI.
    pub direct_override: bool,
    pub properties: PropertyBag,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn has_mongodb_uri(&self) -> bool {
        self.properties.contains_key(MONGODB_URI_PROPERTY)
    }
}

/// The three startup sources in precedence order.
pub struct SourceChain<C> {
    cloud_run: CloudRunEnvSource,
    secret_manager: SecretManagerApiSource<C>,
    direct_env: DirectEnvFallbackSource,
}

impl<C: SecretManagerClient> SourceChain<C> {
    pub fn new(client: C) -> Self {
        Self {
            cloud_run: CloudRunEnvSource::new(),
            secret_manager: SecretManagerApiSource::new(client),
            direct_env: DirectEnvFallbackSource::new(),
        }
    }

    pub fn secret_manager(&self) -> &SecretManagerApiSource<C> {
        &self.secret_manager
    }

    /// Resolve the active profile, then run the chain.
    pub async fn resolve(&self, environment: &ConfigEnvironment) -> Result<Resolution, ResolveError> {
        let profile = resolve_active_profile(environment);
        self.resolve_for(environment, profile).await
    }

    /// Run the chain for an already resolved profile.
    pub async fn resolve_for(
        &self,
        environment: &ConfigEnvironment,
        profile: Option<Profile>,
    ) -> Result<Resolution, ResolveError> {
        let ctx = ResolutionContext {
            environment,
            profile: profile.as_ref(),
        };
        let mut merged = PropertyBag::new(SECRET_PROPERTY_SOURCE_NAME);
        let mut primary_tier = None;

        match self.cloud_run.attempt(ctx, &merged).await {
            SourceAttempt::Loaded(bag) => {
                primary_tier = Some(Tier::CloudRunEnv);
                merged.merge(bag);
                if matches!(SecretManagerApiSource::<C>::is_enabled(environment), Ok(true))
                    && profile.as_ref().is_some_and(|p| !p.is_local())
                {
                    info!(
                        "Secret Manager API tier is enabled but skipped: \
                         Cloud Run secret env var already provided configuration"
                    );
                }
            }
            SourceAttempt::Fatal(e) => return Err(e),
            SourceAttempt::Empty => match self.secret_manager.attempt(ctx, &merged).await {
                SourceAttempt::Loaded(bag) => {
                    primary_tier = Some(Tier::SecretManagerApi);
                    merged.merge(bag);
                }
                SourceAttempt::Empty => {}
                SourceAttempt::Fatal(e) => return Err(e),
            },
        }

        let direct_override = match self.direct_env.attempt(ctx, &merged).await {
            SourceAttempt::Loaded(bag) => {
                merged.merge(bag);
                true
            }
            SourceAttempt::Empty => false,
            SourceAttempt::Fatal(e) => return Err(e),
        };

        let resolution = Resolution {
            profile,
            primary_tier,
            direct_override,
            properties: merged,
        };
        report(&resolution, environment);
        Ok(resolution)
    }
}

fn report(resolution: &Resolution, environment: &ConfigEnvironment) {
    if !resolution.is_empty() {
        info!(
            "Resolved {} startup properties (primary tier: {}, direct override: {})",
            resolution.properties.len(),
            resolution.primary_tier.map(|t| t.as_str()).unwrap_or("none"),
            resolution.direct_override
        );
    }

    if resolution.has_mongodb_uri() {
        return;
    }

    if environment.get_non_empty(MONGODB_URI_PROPERTY).is_some() {
        debug!("'{MONGODB_URI_PROPERTY}' comes from static configuration");
        return;
    }

    warn!(
        "Resolved config does not contain '{}'. MongoDB will use default ({}). \
         Add the URI to the secret or set SPRING_DATA_MONGODB_URI env var.",
        MONGODB_URI_PROPERTY, DEFAULT_MONGODB_URI
    );
}
