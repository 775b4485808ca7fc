//! Cloud Run mounted secret provider.
//!
//! Cloud Run can expose a Secret Manager secret as an environment variable
//! ("Reference a secret"). The variable holds the whole properties payload.

use super::types::{ResolutionContext, SecretSource, SourceAttempt, Tier};
use crate::config::{
    parse_properties, PropertyBag, CLOUDRUN_SECRET_ENV_VAR_ENV, CLOUDRUN_SECRET_ENV_VAR_PROPERTY,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Conventional variable name used when nothing more specific exists.
const FALLBACK_SECRET_ENV_VAR: &str = "backend-prod-secret";

/// Reads properties from a platform-injected secret environment variable.
#[derive(Debug, Default)]
pub struct CloudRunEnvSource;

impl CloudRunEnvSource {
    pub fn new() -> Self {
        Self
    }

    /// Find the name of the variable carrying the secret.
    ///
    /// Explicit configuration first, then the discovery variable, then the
    /// first `backend-{profile}-secret` / `backend-prod-secret` that is set.
    pub fn discover_env_var_name(&self, ctx: ResolutionContext<'_>) -> Option<String> {
        if let Some(name) = ctx.environment.get_non_empty(CLOUDRUN_SECRET_ENV_VAR_PROPERTY) {
            return Some(name.trim().to_string());
        }

        let vars = ctx.environment.env();
        if let Some(name) = vars.get(CLOUDRUN_SECRET_ENV_VAR_ENV) {
            return Some(name.trim().to_string());
        }

        let mut candidates = Vec::with_capacity(2);
        if let Some(profile) = ctx.profile {
            candidates.push(format!("backend-{profile}-secret"));
        }
        candidates.push(FALLBACK_SECRET_ENV_VAR.to_string());
        candidates.dedup();

        candidates.into_iter().find(|name| vars.is_set(name))
    }
}

#[async_trait]
impl SecretSource for CloudRunEnvSource {
    fn tier(&self) -> Tier {
        Tier::CloudRunEnv
    }

    async fn attempt(&self, ctx: ResolutionContext<'_>, _current: &PropertyBag) -> SourceAttempt {
        let Some(var_name) = self.discover_env_var_name(ctx) else {
            debug!("No Cloud Run secret env var found");
            return SourceAttempt::Empty;
        };

        let Some(payload) = ctx.environment.env().get(&var_name) else {
            debug!("Cloud Run secret env var '{var_name}' is unset or empty");
            return SourceAttempt::Empty;
        };

        match parse_properties(payload, &format!("{}:{var_name}", Tier::CloudRunEnv)) {
            Ok(bag) => {
                info!(
                    "Loaded {} properties from Cloud Run secret env var: {}",
                    bag.len(),
                    var_name
                );
                SourceAttempt::from_bag(bag)
            }
            Err(e) => {
                warn!("Failed to parse Cloud Run secret env var '{var_name}': {e}");
                SourceAttempt::Empty
            }
        }
    }
}
