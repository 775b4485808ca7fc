//! End-to-end tests for the startup pipeline.
//!
//! Each test builds a throwaway config directory and an explicit env var
//! snapshot; the Secret Manager API is served by wiremock.

use base64::Engine;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rewards_bootstrap::bootstrap::{bootstrap_with, BootstrapOptions};
use rewards_bootstrap::config::{EnvVars, MONGODB_URI_PROPERTY, SECRET_PROPERTY_SOURCE_NAME};
use rewards_bootstrap::infra::secrets::Tier;

// ============================================================================
// Helpers
// ============================================================================

fn access_path(profile: &str) -> String {
    format!("/v1/projects/acme/secrets/webflux-mongodb-rest-{profile}/versions/latest:access")
}

fn secret_response(text: &str) -> ResponseTemplate {
    let data = base64::engine::general_purpose::STANDARD.encode(text);
    ResponseTemplate::new(200).set_body_json(json!({ "payload": { "data": data } }))
}

/// Config dir with the remote tier enabled and pointed at `server`.
fn remote_config(server: &MockServer) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("application.properties"),
        format!(
            "gcp.secretmanager.enabled=true\n\
             gcp.secretmanager.project-id=acme\n\
             gcp.secretmanager.endpoint={}\n\
             app.name=static\n",
            server.uri()
        ),
    )
    .unwrap();
    dir
}

fn options(dir: &TempDir, profile: &str) -> BootstrapOptions {
    BootstrapOptions {
        config_dir: dir.path().to_path_buf(),
        profile: Some(profile.to_string()),
        overrides: Vec::new(),
    }
}

fn env(pairs: &[(&str, &str)]) -> EnvVars {
    pairs
        .iter()
        .copied()
        .chain([("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.test")])
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn remote_secret_is_installed_above_env_and_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(access_path("dev")))
        .respond_with(secret_response(
            "spring.data.mongodb.uri=mongodb://dev-cluster/rewards\napp.name=from-secret\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let boot = bootstrap_with(
        env(&[("APP_NAME", "from-env"), ("MONGODB_URI", "mongodb://ignored")]),
        &options(&dir, "dev"),
    )
    .await
    .unwrap();

    assert_eq!(boot.resolution.primary_tier, Some(Tier::SecretManagerApi));
    assert!(!boot.resolution.direct_override);
    assert_eq!(
        boot.environment.get_property(MONGODB_URI_PROPERTY),
        Some("mongodb://dev-cluster/rewards")
    );
    assert_eq!(boot.environment.get_property("app.name"), Some("from-secret"));
}

#[tokio::test]
async fn command_line_still_wins_over_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(access_path("qa")))
        .respond_with(secret_response("app.name=from-secret\n"))
        .mount(&server)
        .await;
    let dir = remote_config(&server);
    let mut opts = options(&dir, "qa");
    opts.overrides.push(("app.name".into(), "from-cli".into()));

    let boot = bootstrap_with(env(&[]), &opts).await.unwrap();
    assert_eq!(boot.environment.get_property("app.name"), Some("from-cli"));
    assert!(boot
        .environment
        .property_sources()
        .contains(SECRET_PROPERTY_SOURCE_NAME));
}

#[tokio::test]
async fn missing_secret_aborts_startup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(access_path("prod")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "Secret not found", "status": "NOT_FOUND" }
        })))
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let err = bootstrap_with(env(&[("MONGODB_URI", "mongodb://fallback")]), &options(&dir, "prod"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("webflux-mongodb-rest-prod"), "{message}");
    assert!(message.contains("acme"), "{message}");
}

#[tokio::test]
async fn transient_failure_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(access_path("uat")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(access_path("uat")))
        .respond_with(secret_response("spring.data.mongodb.uri=mongodb://uat\n"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let boot = bootstrap_with(env(&[]), &options(&dir, "uat")).await.unwrap();
    assert_eq!(boot.environment.get_property(MONGODB_URI_PROPERTY), Some("mongodb://uat"));
}

#[tokio::test]
async fn cloud_run_secret_masks_remote_tier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(secret_response("app.name=remote\n"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let boot = bootstrap_with(
        env(&[
            ("GCP_CLOUDRUN_SECRET_ENV_VAR", "backend-prod-secret"),
            ("backend-prod-secret", "app.name=cloud-run\n"),
            ("MONGODB_URI", "mongodb://from-env"),
        ]),
        &options(&dir, "prod"),
    )
    .await
    .unwrap();

    assert_eq!(boot.resolution.primary_tier, Some(Tier::CloudRunEnv));
    assert!(boot.resolution.direct_override);
    assert_eq!(boot.environment.get_property("app.name"), Some("cloud-run"));
    assert_eq!(
        boot.environment.get_property(MONGODB_URI_PROPERTY),
        Some("mongodb://from-env")
    );
}

#[tokio::test]
async fn local_profile_never_calls_remote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(secret_response("app.name=remote\n"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let boot = bootstrap_with(env(&[]), &options(&dir, "local")).await.unwrap();
    assert!(boot.resolution.is_empty());
    assert_eq!(boot.environment.get_property("app.name"), Some("static"));
    assert_eq!(boot.environment.get_property(MONGODB_URI_PROPERTY), None);
}

#[tokio::test]
async fn numeric_enabled_flag_turns_remote_tier_on() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(access_path("dev")))
        .respond_with(secret_response("app.name=from-secret\n"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = remote_config(&server);
    fs::write(
        dir.path().join("application.properties"),
        format!(
            "gcp.secretmanager.project-id=acme\ngcp.secretmanager.endpoint={}\n",
            server.uri()
        ),
    )
    .unwrap();

    let boot = bootstrap_with(env(&[("GCP_SECRETMANAGER_ENABLED", "1")]), &options(&dir, "dev"))
        .await
        .unwrap();
    assert_eq!(boot.resolution.primary_tier, Some(Tier::SecretManagerApi));
    assert_eq!(boot.environment.get_property("app.name"), Some("from-secret"));
}

#[tokio::test]
async fn unrecognised_enabled_flag_aborts_startup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(secret_response("app.name=remote\n"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = remote_config(&server);

    let err = bootstrap_with(env(&[("GCP_SECRETMANAGER_ENABLED", "treu")]), &options(&dir, "dev"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("gcp.secretmanager.enabled"), "{message}");
    assert!(message.contains("treu"), "{message}");
}
