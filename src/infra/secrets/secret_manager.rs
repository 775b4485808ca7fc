//! Secret Manager API provider.
//!
//! Loads `webflux-mongodb-rest-{profile}` (version `latest`) when the API
//! tier is enabled. Once this tier is addressed, every access failure is
//! fatal: the operator declared GCP-backed configuration mandatory.

use super::client::SecretManagerClient;
use super::types::{
    ResolutionContext, ResolveError, SecretAccessError, SecretReference, SecretSource,
    SourceAttempt, Tier,
};
use crate::config::{
    parse_properties_bytes, ConfigEnvironment, PropertyBag, SECRET_MANAGER_ENABLED_PROPERTY,
    SECRET_MANAGER_PROJECT_ID_ENV, SECRET_MANAGER_PROJECT_ID_PROPERTY,
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Loads properties through a [`SecretManagerClient`].
pub struct SecretManagerApiSource<C> {
    client: C,
}

impl<C: SecretManagerClient> SecretManagerApiSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Whether the API tier is switched on (`gcp.secretmanager.enabled`, default false).
    ///
    /// A value that is neither true nor false is an error, never "disabled".
    pub fn is_enabled(environment: &ConfigEnvironment) -> Result<bool, ResolveError> {
        Ok(environment.get_bool(SECRET_MANAGER_ENABLED_PROPERTY, false)?)
    }

    /// Project id from configuration, then `GCP_SECRETMANAGER_PROJECT_ID`, then `GCP_PROJECT_ID`.
    pub fn project_id(environment: &ConfigEnvironment) -> Option<String> {
        environment
            .get_non_empty(SECRET_MANAGER_PROJECT_ID_PROPERTY)
            .or_else(|| {
                environment
                    .env()
                    .first_of(SECRET_MANAGER_PROJECT_ID_ENV)
                    .map(|(_, value)| value)
            })
            .map(|p| p.trim().to_string())
    }

    /// Fetch with one retry for transient failures.
    async fn fetch(&self, reference: &SecretReference) -> Result<Vec<u8>, SecretAccessError> {
        match self.client.access_secret_version(reference).await {
            Err(e) if e.is_transient() => {
                warn!("Transient error accessing secret '{}', retrying once: {e}", reference.secret_id);
                self.client.access_secret_version(reference).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<C: SecretManagerClient> SecretSource for SecretManagerApiSource<C> {
    fn tier(&self) -> Tier {
        Tier::SecretManagerApi
    }

    async fn attempt(&self, ctx: ResolutionContext<'_>, _current: &PropertyBag) -> SourceAttempt {
        match Self::is_enabled(ctx.environment) {
            Ok(true) => {}
            Ok(false) => {
                debug!("GCP Secret Manager is disabled. Skipping API load.");
                return SourceAttempt::Empty;
            }
            Err(err) => {
                error!("{err}");
                return SourceAttempt::Fatal(err);
            }
        }

        let profile = match ctx.profile {
            None => {
                debug!("No active profile found. Skipping GCP Secret Manager API.");
                return SourceAttempt::Empty;
            }
            Some(p) if p.is_local() => {
                debug!("Local profile detected. Skipping GCP Secret Manager API.");
                return SourceAttempt::Empty;
            }
            Some(p) => p,
        };

        let Some(project_id) = Self::project_id(ctx.environment) else {
            warn!(
                "GCP project ID not configured. Set {} or GCP_PROJECT_ID env var.",
                SECRET_MANAGER_PROJECT_ID_PROPERTY
            );
            return SourceAttempt::Empty;
        };

        let reference = SecretReference::for_profile(project_id, profile);
        info!(
            "Loading secrets from GCP Secret Manager API: project={}, secret={}",
            reference.project_id, reference.secret_id
        );

        let payload = match self.fetch(&reference).await {
            Ok(payload) => payload,
            Err(e) => {
                let err = ResolveError::from_access(&reference, e);
                error!("{err}");
                return SourceAttempt::Fatal(err);
            }
        };

        if payload.is_empty() {
            warn!("Secret '{}' is empty", reference.secret_id);
            return SourceAttempt::Empty;
        }

        let origin = format!("{}:{}", Tier::SecretManagerApi, reference.secret_id);
        match parse_properties_bytes(&payload, &origin) {
            Ok(bag) => {
                debug!("Parsed {} properties from secret", bag.len());
                SourceAttempt::from_bag(bag)
            }
            Err(source) => {
                let err = ResolveError::MalformedSecret {
                    secret: reference.secret_id.clone(),
                    project: reference.project_id.clone(),
                    source,
                };
                error!("{err}");
                SourceAttempt::Fatal(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{EnvVars, PropertySource};
    use crate::infra::secrets::Profile;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Client returning queued responses and recording requested references.
    #[derive(Default)]
    pub(crate) struct FakeClient {
        responses: Mutex<VecDeque<Result<Vec<u8>, SecretAccessError>>>,
        pub(crate) calls: Mutex<Vec<SecretReference>>,
    }

    impl FakeClient {
        pub(crate) fn with(responses: Vec<Result<Vec<u8>, SecretAccessError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SecretManagerClient for FakeClient {
        async fn access_secret_version(
            &self,
            reference: &SecretReference,
        ) -> Result<Vec<u8>, SecretAccessError> {
            self.calls.lock().unwrap().push(reference.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SecretAccessError::NotFound))
        }
    }

    fn environment(vars: &[(&str, &str)], props: &[(&str, &str)]) -> ConfigEnvironment {
        let mut env = ConfigEnvironment::new(vars.iter().copied().collect::<EnvVars>());
        env.add_last(PropertySource::new("props", props.iter().copied().collect()));
        env
    }

    fn enabled_env() -> ConfigEnvironment {
        environment(
            &[],
            &[
                (SECRET_MANAGER_ENABLED_PROPERTY, "true"),
                (SECRET_MANAGER_PROJECT_ID_PROPERTY, "acme"),
            ],
        )
    }

    async fn attempt(
        source: &SecretManagerApiSource<FakeClient>,
        env: &ConfigEnvironment,
        profile: Option<&str>,
    ) -> SourceAttempt {
        let profile = profile.and_then(Profile::new);
        let ctx = ResolutionContext {
            environment: env,
            profile: profile.as_ref(),
        };
        source.attempt(ctx, &PropertyBag::default()).await
    }

    #[tokio::test]
    async fn disabled_by_default() {
        let source = SecretManagerApiSource::new(FakeClient::default());
        let env = environment(&[], &[(SECRET_MANAGER_PROJECT_ID_PROPERTY, "acme")]);
        assert!(matches!(attempt(&source, &env, Some("prod")).await, SourceAttempt::Empty));
        assert_eq!(source.client().call_count(), 0);
    }

    #[test]
    fn enabled_flag_accepts_spring_booleans() {
        for value in ["true", "TRUE", "1", "yes", "on"] {
            let env = environment(&[], &[(SECRET_MANAGER_ENABLED_PROPERTY, value)]);
            assert!(
                SecretManagerApiSource::<FakeClient>::is_enabled(&env).unwrap(),
                "{value}"
            );
        }
        for value in ["false", "0", "no", "off", ""] {
            let env = environment(&[], &[(SECRET_MANAGER_ENABLED_PROPERTY, value)]);
            assert!(
                !SecretManagerApiSource::<FakeClient>::is_enabled(&env).unwrap(),
                "{value}"
            );
        }
    }

    #[test]
    fn enabled_flag_from_relaxed_env_var() {
        let mut env = ConfigEnvironment::new(EnvVars::default());
        env.add_last(PropertySource::relaxed(
            "systemEnvironment",
            [("GCP_SECRETMANAGER_ENABLED", "1")].into_iter().collect(),
        ));
        assert!(SecretManagerApiSource::<FakeClient>::is_enabled(&env).unwrap());
    }

    #[tokio::test]
    async fn unrecognised_enabled_flag_is_fatal() {
        let source = SecretManagerApiSource::new(FakeClient::default());
        let env = environment(
            &[],
            &[
                (SECRET_MANAGER_ENABLED_PROPERTY, "treu"),
                (SECRET_MANAGER_PROJECT_ID_PROPERTY, "acme"),
            ],
        );
        match attempt(&source, &env, Some("prod")).await {
            SourceAttempt::Fatal(err) => {
                assert!(matches!(err, ResolveError::InvalidSetting(_)));
                assert!(err.to_string().contains("treu"));
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
        assert_eq!(source.client().call_count(), 0);
    }

    #[tokio::test]
    async fn local_profile_never_calls_remote() {
        let source = SecretManagerApiSource::new(FakeClient::default());
        assert!(matches!(
            attempt(&source, &enabled_env(), Some("local")).await,
            SourceAttempt::Empty
        ));
        assert_eq!(source.client().call_count(), 0);
    }

    #[tokio::test]
    async fn missing_profile_skips_remote() {
        let source = SecretManagerApiSource::new(FakeClient::default());
        assert!(matches!(attempt(&source, &enabled_env(), None).await, SourceAttempt::Empty));
        assert_eq!(source.client().call_count(), 0);
    }

    #[tokio::test]
    async fn missing_project_is_soft_miss() {
        let source = SecretManagerApiSource::new(FakeClient::default());
        let env = environment(&[], &[(SECRET_MANAGER_ENABLED_PROPERTY, "true")]);
        assert!(matches!(attempt(&source, &env, Some("dev")).await, SourceAttempt::Empty));
        assert_eq!(source.client().call_count(), 0);
    }

    #[test]
    fn project_id_env_fallback_order() {
        let env = environment(
            &[("GCP_SECRETMANAGER_PROJECT_ID", "primary"), ("GCP_PROJECT_ID", "secondary")],
            &[],
        );
        assert_eq!(
            SecretManagerApiSource::<FakeClient>::project_id(&env).as_deref(),
            Some("primary")
        );

        let env = environment(&[("GCP_PROJECT_ID", "secondary")], &[]);
        assert_eq!(
            SecretManagerApiSource::<FakeClient>::project_id(&env).as_deref(),
            Some("secondary")
        );

        let env = environment(
            &[("GCP_PROJECT_ID", "secondary")],
            &[(SECRET_MANAGER_PROJECT_ID_PROPERTY, "configured")],
        );
        assert_eq!(
            SecretManagerApiSource::<FakeClient>::project_id(&env).as_deref(),
            Some("configured")
        );
    }

    #[tokio::test]
    async fn loads_profile_secret() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![Ok(
            b"spring.data.mongodb.uri=mongodb://dev-host/rewards\n".to_vec(),
        )]));
        match attempt(&source, &enabled_env(), Some("dev")).await {
            SourceAttempt::Loaded(bag) => {
                assert_eq!(bag.get("spring.data.mongodb.uri"), Some("mongodb://dev-host/rewards"));
                assert_eq!(bag.origin(), "secret-manager-api:webflux-mongodb-rest-dev");
            }
            other => panic!("expected Loaded, got {other:?}"),
        }
        let calls = source.client().calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].secret_id, "webflux-mongodb-rest-dev");
        assert_eq!(calls[0].project_id, "acme");
        assert_eq!(calls[0].version, "latest");
    }

    #[tokio::test]
    async fn not_found_is_fatal_and_names_secret() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![Err(SecretAccessError::NotFound)]));
        match attempt(&source, &enabled_env(), Some("prod")).await {
            SourceAttempt::Fatal(err) => {
                assert!(matches!(err, ResolveError::SecretNotFound { .. }));
                assert!(err.to_string().contains("webflux-mongodb-rest-prod"));
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
        assert_eq!(source.client().call_count(), 1);
    }

    #[tokio::test]
    async fn permission_denied_is_fatal() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![Err(
            SecretAccessError::PermissionDenied,
        )]));
        assert!(matches!(
            attempt(&source, &enabled_env(), Some("uat")).await,
            SourceAttempt::Fatal(ResolveError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![
            Err(SecretAccessError::Transport("connection reset".into())),
            Ok(b"app.name=rewards".to_vec()),
        ]));
        assert!(attempt(&source, &enabled_env(), Some("qa")).await.is_loaded());
        assert_eq!(source.client().call_count(), 2);
    }

    #[tokio::test]
    async fn second_transient_failure_is_fatal() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![
            Err(SecretAccessError::Status { code: 503, message: "unavailable".into() }),
            Err(SecretAccessError::Status { code: 503, message: "unavailable".into() }),
        ]));
        assert!(matches!(
            attempt(&source, &enabled_env(), Some("qa")).await,
            SourceAttempt::Fatal(ResolveError::SecretAccess { .. })
        ));
        assert_eq!(source.client().call_count(), 2);
    }

    #[tokio::test]
    async fn empty_payload_is_not_fatal() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![Ok(Vec::new())]));
        assert!(matches!(
            attempt(&source, &enabled_env(), Some("dev")).await,
            SourceAttempt::Empty
        ));
    }

    #[tokio::test]
    async fn malformed_payload_is_fatal() {
        let source = SecretManagerApiSource::new(FakeClient::with(vec![Ok(b"k=\\uXYZW".to_vec())]));
        assert!(matches!(
            attempt(&source, &enabled_env(), Some("dev")).await,
            SourceAttempt::Fatal(ResolveError::MalformedSecret { .. })
        ));
    }
}
