//! Configuration keys, environment variable names and defaults used during bootstrap.

/// Property holding the MongoDB connection string.
pub const MONGODB_URI_PROPERTY: &str = "spring.data.mongodb.uri";

/// Endpoint the datastore client falls back to when no URI is configured.
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/test";

/// Requested active profiles (comma-separated).
pub const ACTIVE_PROFILES_PROPERTY: &str = "spring.profiles.active";

/// Profile that never talks to remote secret stores.
pub const LOCAL_PROFILE: &str = "local";

/// Gate for the Secret Manager API tier.
pub const SECRET_MANAGER_ENABLED_PROPERTY: &str = "gcp.secretmanager.enabled";

/// GCP project holding the secrets.
pub const SECRET_MANAGER_PROJECT_ID_PROPERTY: &str = "gcp.secretmanager.project-id";

/// Explicit name of the env var carrying a Cloud Run mounted secret.
pub const CLOUDRUN_SECRET_ENV_VAR_PROPERTY: &str = "gcp.secretmanager.cloudrun-secret-env-var";

/// Secret Manager API base URL override.
pub const SECRET_MANAGER_ENDPOINT_PROPERTY: &str = "gcp.secretmanager.endpoint";

/// Metadata server base URL override.
pub const METADATA_ENDPOINT_PROPERTY: &str = "gcp.secretmanager.metadata-endpoint";

/// Timeout for a single Secret Manager request, in seconds.
pub const SECRET_MANAGER_TIMEOUT_PROPERTY: &str = "gcp.secretmanager.timeout-secs";

pub const CLOUDRUN_SECRET_ENV_VAR_ENV: &str = "GCP_CLOUDRUN_SECRET_ENV_VAR";
pub const SECRET_MANAGER_PROJECT_ID_ENV: &[&str] = &["GCP_SECRETMANAGER_PROJECT_ID", "GCP_PROJECT_ID"];

/// Direct MongoDB URI overrides, in priority order. The dotted name comes
/// last since most platforms reject dots in variable names.
pub const MONGODB_URI_ENV: &[&str] = &["SPRING_DATA_MONGODB_URI", "MONGODB_URI", "spring.data.mongodb.uri"];

/// Prefix of the Secret Manager secret id; the active profile is appended.
pub const SECRET_NAME_PREFIX: &str = "webflux-mongodb-rest-";

/// Secret version that is always accessed.
pub const SECRET_VERSION: &str = "latest";

/// Name of the property source installed by the resolver.
pub const SECRET_PROPERTY_SOURCE_NAME: &str = "gcp-secret-manager";

pub const COMMAND_LINE_SOURCE_NAME: &str = "commandLineArgs";
pub const SYSTEM_ENVIRONMENT_SOURCE_NAME: &str = "systemEnvironment";

/// Default Secret Manager API endpoint.
pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com";

/// Default GCE metadata server.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal";

/// Pre-minted OAuth access token, checked before the metadata server.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Default Secret Manager request timeout.
pub const DEFAULT_SECRET_MANAGER_TIMEOUT_SECS: u64 = 30;

/// IAM role required to read secret payloads.
pub const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";

/// HTTP server port.
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Public server URL advertised in the API docs.
pub const SERVER_URL_PROPERTY: &str = "app.server.url";
pub const SERVER_URL_ENV: &str = "APP_SERVER_URL";
