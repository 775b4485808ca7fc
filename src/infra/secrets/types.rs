//! Core types for startup secret resolution.

use crate::config::{
    ConfigEnvironment, InvalidPropertyValue, PropertiesError, PropertyBag, LOCAL_PROFILE, SECRET_ACCESSOR_ROLE,
    SECRET_NAME_PREFIX, SECRET_VERSION,
};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Profile
// ============================================================================

/// The single active deployment profile (`local`, `dev`, `qa`, `uat`, `prod`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Profile(String);

impl Profile {
    /// Build a profile from a name. Blank names yield `None`.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The offline profile never needs remote secrets.
    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_PROFILE
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Secret Reference
// ============================================================================

/// Identifies one Secret Manager secret version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub project_id: String,
    pub secret_id: String,
    pub version: String,
}

impl SecretReference {
    /// `webflux-mongodb-rest-{profile}` at version `latest`.
    pub fn for_profile(project_id: impl Into<String>, profile: &Profile) -> Self {
        Self {
            project_id: project_id.into(),
            secret_id: format!("{SECRET_NAME_PREFIX}{profile}"),
            version: SECRET_VERSION.to_string(),
        }
    }

    /// `projects/{project}/secrets/{secret}/versions/{version}`
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project_id, self.secret_id, self.version
        )
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_name())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by a Secret Manager client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretAccessError {
    #[error("secret not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("request was not authenticated")]
    Unauthenticated,

    #[error("unexpected HTTP status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not obtain credentials: {0}")]
    Credentials(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SecretAccessError {
    /// Whether a second attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SecretAccessError::Transport(_) | SecretAccessError::Timeout(_) => true,
            SecretAccessError::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Fatal resolution failure. Aborts startup.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "Secret '{secret}' not found in project '{project}'. \
         Create it in GCP Secret Manager or set gcp.secretmanager.enabled=false"
    )]
    SecretNotFound { secret: String, project: String },

    #[error(
        "Permission denied accessing secret '{secret}' in project '{project}'. \
         Grant {role} to the runtime service account and check credentials",
        role = SECRET_ACCESSOR_ROLE
    )]
    PermissionDenied { secret: String, project: String },

    #[error("Failed to load secret '{secret}' from project '{project}': {source}")]
    SecretAccess {
        secret: String,
        project: String,
        #[source]
        source: SecretAccessError,
    },

    #[error("Secret '{secret}' in project '{project}' is not valid properties text: {source}")]
    MalformedSecret {
        secret: String,
        project: String,
        #[source]
        source: PropertiesError,
    },

    #[error("Invalid Secret Manager configuration: {0}")]
    InvalidSetting(#[from] InvalidPropertyValue),
}

impl ResolveError {
    /// Classify a client failure for `reference`.
    pub fn from_access(reference: &SecretReference, err: SecretAccessError) -> Self {
        let secret = reference.secret_id.clone();
        let project = reference.project_id.clone();
        match err {
            SecretAccessError::NotFound => ResolveError::SecretNotFound { secret, project },
            SecretAccessError::PermissionDenied => {
                ResolveError::PermissionDenied { secret, project }
            }
            source => ResolveError::SecretAccess {
                secret,
                project,
                source,
            },
        }
    }
}

// ============================================================================
// Source Trait
// ============================================================================

/// Tier of the source chain, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Secret mounted by Cloud Run as an environment variable.
    CloudRunEnv,
    /// Secret Manager API.
    SecretManagerApi,
    /// `SPRING_DATA_MONGODB_URI` / `MONGODB_URI` override.
    DirectEnv,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::CloudRunEnv => "cloud-run-env",
            Tier::SecretManagerApi => "secret-manager-api",
            Tier::DirectEnv => "direct-env",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one source attempt.
#[derive(Debug)]
pub enum SourceAttempt {
    /// The source produced at least one property.
    Loaded(PropertyBag),
    /// The source was skipped or had nothing to contribute.
    Empty,
    /// The source was addressed and failed; startup must abort.
    Fatal(ResolveError),
}

impl SourceAttempt {
    /// `Loaded` for a non-empty bag, `Empty` otherwise.
    pub fn from_bag(bag: PropertyBag) -> Self {
        if bag.is_empty() {
            SourceAttempt::Empty
        } else {
            SourceAttempt::Loaded(bag)
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SourceAttempt::Loaded(_))
    }
}

/// Read-only inputs shared by every source during one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub environment: &'a ConfigEnvironment,
    pub profile: Option<&'a Profile>,
}

/// One origin of startup properties.
///
/// Implemented by exactly three sources: [`CloudRunEnvSource`],
/// [`SecretManagerApiSource`] and [`DirectEnvFallbackSource`].
/// `current` is the bag assembled by higher tiers so far.
///
/// [`CloudRunEnvSource`]: super::CloudRunEnvSource
/// [`SecretManagerApiSource`]: super::SecretManagerApiSource
/// [`DirectEnvFallbackSource`]: super::DirectEnvFallbackSource
#[async_trait]
pub trait SecretSource: Send + Sync {
    fn tier(&self) -> Tier;

    async fn attempt(&self, ctx: ResolutionContext<'_>, current: &PropertyBag) -> SourceAttempt;
}

/// Redact a secret value for display (show first 2 and last 2 chars).
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}

// ============================================================================
// Tests
// ============================================================================
