//! Direct MongoDB URI override from environment variables.

use super::types::{ResolutionContext, SecretSource, SourceAttempt, Tier};
use crate::config::{PropertyBag, MONGODB_URI_ENV, MONGODB_URI_PROPERTY};
use async_trait::async_trait;
use tracing::{debug, info};

/// Fills `spring.data.mongodb.uri` from `SPRING_DATA_MONGODB_URI`,
/// `MONGODB_URI` or `spring.data.mongodb.uri` when higher tiers left it unset.
#[derive(Debug, Default)]
pub struct DirectEnvFallbackSource;

impl DirectEnvFallbackSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for DirectEnvFallbackSource {
    fn tier(&self) -> Tier {
        Tier::DirectEnv
    }

    async fn attempt(&self, ctx: ResolutionContext<'_>, current: &PropertyBag) -> SourceAttempt {
        if current.contains_key(MONGODB_URI_PROPERTY) {
            debug!("'{MONGODB_URI_PROPERTY}' already resolved, ignoring direct env overrides");
            return SourceAttempt::Empty;
        }

        match ctx.environment.env().first_of(MONGODB_URI_ENV) {
            Some((name, uri)) => {
                info!("Using MongoDB URI from env var {name}");
                let mut bag = PropertyBag::new(format!("{}:{name}", Tier::DirectEnv));
                bag.insert(MONGODB_URI_PROPERTY, uri);
                SourceAttempt::Loaded(bag)
            }
            None => {
                debug!("No MongoDB URI override in environment");
                SourceAttempt::Empty
            }
        }
    }
}
