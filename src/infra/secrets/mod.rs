//! Startup secret resolution.
//!
//! Determines where runtime configuration comes from before anything else
//! reads it:
//! 1. **Cloud Run secret env var**: a `backend-{profile}-secret` style
//!    variable holding a properties payload
//! 2. **Secret Manager API**: `webflux-mongodb-rest-{profile}`, when enabled
//! 3. **Direct env override**: `SPRING_DATA_MONGODB_URI` / `MONGODB_URI`
//!
//! The merged result is installed once as the `gcp-secret-manager` layer.

pub mod client;
pub mod cloud_run;
pub mod direct_env;
pub mod injector;
pub mod profile;
pub mod resolver;
pub mod secret_manager;
pub mod types;

pub use client::{ClientSettings, GcpSecretManagerClient, SecretManagerClient};
pub use cloud_run::CloudRunEnvSource;
pub use direct_env::DirectEnvFallbackSource;
pub use injector::{install_properties, InjectError};
pub use profile::resolve_active_profile;
pub use resolver::{Resolution, SourceChain};
pub use secret_manager::SecretManagerApiSource;
pub use types::{
    redact_secret, Profile, ResolutionContext, ResolveError, SecretAccessError, SecretReference,
    SecretSource, SourceAttempt, Tier,
};
