//! Access-token-aware retry wrapper.

use std::future::Future;

use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::{
    AppIdClassifier, ApiResponse, CredentialProvider, IdentityClassifier, IdentityRegistry,
    PlatformKind, ReturnCode,
};
use crate::error::{identity_error, Error, IdentityErrorKind};

/// Behaviour knobs for [`CredentialRetry`].
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Platform whose first registered AppId is used when none is supplied.
    pub platform: PlatformKind,
    /// Return codes that mean "the platform rejected the access token".
    pub invalid_credential_codes: Vec<ReturnCode>,
    /// Whether an invalid-credential result triggers a refresh and a second attempt.
    pub retry_on_failure: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            platform: PlatformKind::WxOpen,
            invalid_credential_codes: vec![ReturnCode::INVALID_CREDENTIAL],
            retry_on_failure: true,
        }
    }
}

/// What a `credential_or_identity` argument resolved to.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    AppId(String),
    AccessToken(String),
}

/// Runs platform calls that need an access token, refreshing the token and
/// retrying once when the platform reports it invalid.
///
/// A call makes at most two attempts and forces at most one refresh. The
/// refresh mutates the provider's shared token state; this type holds none.
pub struct CredentialRetry<R: IdentityRegistry, P: CredentialProvider> {
    registry: R,
    provider: P,
    classifier: Box<dyn IdentityClassifier>,
    settings: RetrySettings,
}

impl<R: IdentityRegistry, P: CredentialProvider> CredentialRetry<R, P> {
    /// Create a wrapper with default settings and the AppId length classifier.
    pub fn new(registry: R, provider: P) -> Self {
        Self {
            registry,
            provider,
            classifier: Box::new(AppIdClassifier::default()),
            settings: RetrySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RetrySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IdentityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Run `operation` with an access token.
    ///
    /// `credential_or_identity` is an AppId, a literal access token, or `None`
    /// for the first AppId registered for the configured platform. Literal
    /// tokens are never refreshed.
    ///
    /// # Errors
    ///
    /// `NoRegisteredIdentity` / `UnregisteredIdentity` when the AppId cannot be
    /// resolved, provider errors from token lookup or refresh, and any `Err`
    /// returned by `operation` unchanged. Platform failures other than the
    /// invalid-credential codes are returned as `Ok(ApiResponse::Failure)`.
    pub async fn call<T, F, Fut>(
        &self,
        operation: F,
        credential_or_identity: Option<&str>,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, Error>>,
    {
        self.run(operation, credential_or_identity, self.settings.retry_on_failure)
            .await
    }

    /// Same as [`call`](Self::call) but never refreshes or retries.
    pub async fn call_without_retry<T, F, Fut>(
        &self,
        operation: F,
        credential_or_identity: Option<&str>,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, Error>>,
    {
        self.run(operation, credential_or_identity, false).await
    }

    async fn run<T, F, Fut>(
        &self,
        mut operation: F,
        credential_or_identity: Option<&str>,
        retry_on_failure: bool,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, Error>>,
    {
        let target = self.resolve(credential_or_identity).await?;

        let first = self.attempt(&target, &mut operation).await?;

        let app_id = match &target {
            Target::AppId(app_id) if retry_on_failure && self.is_invalid_credential(&first) => {
                app_id
            }
            _ => return Ok(first),
        };

        debug!("Access token for {} was rejected, refreshing and retrying", app_id);
        self.provider.credential(app_id, true).await?;

        let second = self.attempt(&target, &mut operation).await?;
        if self.is_invalid_credential(&second) {
            warn!("Access token for {} still rejected after refresh", app_id);
        }
        Ok(second)
    }

    async fn resolve(&self, credential_or_identity: Option<&str>) -> Result<Target, Error> {
        match credential_or_identity {
            None => {
                let platform = self.settings.platform;
                let app_id = self
                    .registry
                    .first_registered(platform)
                    .await?
                    .ok_or_else(|| {
                        identity_error(
                            IdentityErrorKind::NoRegisteredIdentity,
                            &format!("No AppId registered for platform {}", platform),
                        )
                    })?;
                debug!("Using first registered AppId {} for {}", app_id, platform);
                Ok(Target::AppId(app_id))
            }
            Some(value) if self.classifier.is_identity(value) => {
                if !self.registry.is_registered(value).await? {
                    return Err(identity_error(
                        IdentityErrorKind::UnregisteredIdentity,
                        &format!("AppId {} is not registered", value),
                    ));
                }
                Ok(Target::AppId(value.to_string()))
            }
            Some(token) => Ok(Target::AccessToken(token.to_string())),
        }
    }

    async fn attempt<T, F, Fut>(
        &self,
        target: &Target,
        operation: &mut F,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, Error>>,
    {
        let access_token = match target {
            Target::AppId(app_id) => self
                .provider
                .credential(app_id, false)
                .await?
                .access_token
                .expose_secret()
                .to_string(),
            Target::AccessToken(token) => token.clone(),
        };
        operation(access_token).await
    }

    fn is_invalid_credential<T>(&self, response: &ApiResponse<T>) -> bool {
        response
            .code()
            .is_some_and(|code| self.settings.invalid_credential_codes.contains(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{AccessTokenResult, InMemoryRegistry, MockIdentityRegistry};
    use crate::error::{operation_error, ErrorKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const APP_ID: &str = "wxc3c90837b0e76080";
    const LITERAL_TOKEN: &str = "65_literal-access-token-value-that-is-long";

    // Mock provider recording every token request
    #[derive(Default)]
    struct RecordingProvider {
        fetches: AtomicUsize,
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for RecordingProvider {
        async fn credential(
            &self,
            app_id: &str,
            force_refresh: bool,
        ) -> Result<AccessTokenResult, Error> {
            if force_refresh {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
            } else {
                self.fetches.fetch_add(1, Ordering::SeqCst);
            }
            let generation = self.refreshes.load(Ordering::SeqCst);
            Ok(AccessTokenResult::new(format!("{}-v{}", app_id, generation), 7200))
        }
    }

    async fn registered(app_ids: &[&str]) -> Arc<InMemoryRegistry> {
        let registry = Arc::new(InMemoryRegistry::new());
        for app_id in app_ids {
            registry.register(*app_id, PlatformKind::WxOpen).await;
        }
        registry
    }

    fn wrapper(
        registry: Arc<InMemoryRegistry>,
    ) -> (
        CredentialRetry<Arc<InMemoryRegistry>, Arc<RecordingProvider>>,
        Arc<RecordingProvider>,
    ) {
        let provider = Arc::new(RecordingProvider::default());
        (CredentialRetry::new(registry, provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_always_invalid_credential_is_retried_exactly_once() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);
        let tokens = Mutex::new(Vec::new());

        let result = retry
            .call(
                |token| {
                    tokens.lock().unwrap().push(token);
                    async { Ok(ApiResponse::<()>::failure(40001, "invalid credential")) }
                },
                Some(APP_ID),
            )
            .await
            .unwrap();

        assert_eq!(result.code(), Some(ReturnCode::INVALID_CREDENTIAL));
        assert_eq!(
            *tokens.lock().unwrap(),
            vec![format!("{}-v0", APP_ID), format!("{}-v1", APP_ID)]
        );
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_with_refreshed_token() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);

        let result = retry
            .call(
                |token| async move {
                    if token.ends_with("-v0") {
                        Ok(ApiResponse::failure(40001, "invalid credential"))
                    } else {
                        Ok(ApiResponse::Success(token))
                    }
                },
                Some(APP_ID),
            )
            .await
            .unwrap();

        assert_eq!(result, ApiResponse::Success(format!("{}-v1", APP_ID)));
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_literal_token_is_never_refreshed() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);
        let calls = AtomicUsize::new(0);

        let result = retry
            .call(
                |token| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(token, LITERAL_TOKEN);
                    async { Ok(ApiResponse::<()>::failure(40001, "invalid credential")) }
                },
                Some(LITERAL_TOKEN),
            )
            .await
            .unwrap();

        assert_eq!(result.code(), Some(ReturnCode::INVALID_CREDENTIAL));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_error_codes_pass_through() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);
        let calls = AtomicUsize::new(0);

        let result = retry
            .call(
                |_token| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(ApiResponse::<()>::failure(45009, "api freq out of limit")) }
                },
                Some(APP_ID),
            )
            .await
            .unwrap();

        assert_eq!(result, ApiResponse::failure(45009, "api freq out of limit"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operation_error_propagates_without_retry() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);

        let err = retry
            .call(
                |_token| async { Err::<ApiResponse<()>, _>(operation_error("connection reset")) },
                Some(APP_ID),
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Operation);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_none_uses_first_registered_app_id() {
        let (retry, _provider) = wrapper(registered(&[APP_ID, "wx_second_app_01"]).await);

        let result = retry
            .call(|token| async move { Ok(ApiResponse::Success(token)) }, None)
            .await
            .unwrap();

        assert_eq!(result, ApiResponse::Success(format!("{}-v0", APP_ID)));
    }

    #[tokio::test]
    async fn test_no_registered_identity_never_invokes_operation() {
        let (retry, provider) = wrapper(registered(&[]).await);
        let calls = AtomicUsize::new(0);

        let err = retry
            .call(
                |_token| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(ApiResponse::Success(())) }
                },
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Identity(IdentityErrorKind::NoRegisteredIdentity)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_app_id_fails() {
        let mut registry = MockIdentityRegistry::new();
        registry
            .expect_is_registered()
            .times(1)
            .returning(|_| Ok(false));
        registry.expect_first_registered().never();

        let retry = CredentialRetry::new(registry, RecordingProvider::default());
        let err = retry
            .call(
                |_token| async { Ok(ApiResponse::Success(())) },
                Some("wx_unknown_app_id"),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Identity(IdentityErrorKind::UnregisteredIdentity)
        );
    }

    #[tokio::test]
    async fn test_call_without_retry_does_not_refresh() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);

        let result = retry
            .call_without_retry(
                |_token| async { Ok(ApiResponse::<()>::failure(40001, "invalid credential")) },
                Some(APP_ID),
            )
            .await
            .unwrap();

        assert_eq!(result.code(), Some(ReturnCode::INVALID_CREDENTIAL));
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_invalid_credential_codes() {
        let (retry, provider) = wrapper(registered(&[APP_ID]).await);
        let retry = retry.with_settings(RetrySettings {
            invalid_credential_codes: vec![ReturnCode::ACCESS_TOKEN_EXPIRED],
            ..RetrySettings::default()
        });

        retry
            .call(
                |_token| async { Ok(ApiResponse::<()>::failure(42001, "access_token expired")) },
                Some(APP_ID),
            )
            .await
            .unwrap();
        retry
            .call(
                |_token| async { Ok(ApiResponse::<()>::failure(40001, "invalid credential")) },
                Some(APP_ID),
            )
            .await
            .unwrap();

        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }
}
