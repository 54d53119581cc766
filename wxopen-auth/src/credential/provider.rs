//! Access token provider trait and a refresh-coalescing decorator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Error;

/// An access token as handed out by the provider.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// Bearer token for platform API calls.
    pub access_token: SecretString,
    /// Lifetime in seconds as reported by the platform.
    pub expires_in: i64,
}

impl AccessTokenResult {
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            expires_in,
        }
    }
}

/// Source of access tokens per AppId.
///
/// Token acquisition against the platform endpoint lives behind this trait.
/// Implementations own the cached token state shared by every caller.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return the live token for `app_id`, fetching a new one when
    /// `force_refresh` is set or nothing is cached.
    async fn credential(&self, app_id: &str, force_refresh: bool)
        -> Result<AccessTokenResult, Error>;
}

#[async_trait]
impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    async fn credential(
        &self,
        app_id: &str,
        force_refresh: bool,
    ) -> Result<AccessTokenResult, Error> {
        (**self).credential(app_id, force_refresh).await
    }
}

#[derive(Default)]
struct RefreshSlot {
    lock: Mutex<()>,
    generation: AtomicU64,
}

/// Provider decorator that coalesces concurrent forced refreshes per AppId.
///
/// When several callers see an invalid token at once, each asks for a forced
/// refresh. Only the first performs it; callers that were already waiting when
/// it completed receive the freshly cached token instead of refreshing again.
///
/// Coalescing is keyed on when the forced refresh is requested, not on which
/// token the caller was rejected with. A caller whose request only fails after
/// another refresh has already finished refreshes again. That costs one extra
/// round trip to the token endpoint and still leaves a valid token cached.
pub struct SingleFlight<P: CredentialProvider> {
    inner: P,
    slots: DashMap<String, Arc<RefreshSlot>>,
}

impl<P: CredentialProvider> SingleFlight<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            slots: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn slot(&self, app_id: &str) -> Arc<RefreshSlot> {
        self.slots
            .entry(app_id.to_string())
            .or_insert_with(|| Arc::new(RefreshSlot::default()))
            .clone()
    }
}

#[async_trait]
impl<P: CredentialProvider> CredentialProvider for SingleFlight<P> {
    async fn credential(
        &self,
        app_id: &str,
        force_refresh: bool,
    ) -> Result<AccessTokenResult, Error> {
        if !force_refresh {
            return self.inner.credential(app_id, false).await;
        }

        let slot = self.slot(app_id);
        let seen = slot.generation.load(Ordering::Acquire);
        let _guard = slot.lock.lock().await;

        if slot.generation.load(Ordering::Acquire) != seen {
            debug!("Access token for {} was refreshed by another request", app_id);
            return self.inner.credential(app_id, false).await;
        }

        let refreshed = self.inner.credential(app_id, true).await?;
        slot.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Access token refreshed for {}", app_id);
        Ok(refreshed)
    }
}
