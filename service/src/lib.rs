use config::Config;
use log::info;
use wxopen_auth::credential::{CredentialProvider, CredentialRetry, IdentityRegistry};
use wxopen_auth::session::{CacheProvider, SessionStore};

pub mod config;
pub mod logging;

/// Build the session store over `cache` using the configured TTL and key prefix.
pub fn session_store<C: CacheProvider>(config: &Config, cache: C) -> SessionStore<C> {
    let settings = config.session_settings();
    info!(
        "Session store config: ttl={}d, key_prefix={}",
        settings.ttl.num_days(),
        settings.key_prefix,
    );
    SessionStore::new(cache).with_settings(settings)
}

/// Build the access token retry wrapper over the given registry and provider.
pub fn credential_retry<R, P>(config: &Config, registry: R, provider: P) -> CredentialRetry<R, P>
where
    R: IdentityRegistry,
    P: CredentialProvider,
{
    let settings = config.retry_settings();
    info!(
        "Credential retry config: platform={}, invalid_credential_codes={:?}, retry_on_failure={}",
        settings.platform, settings.invalid_credential_codes, settings.retry_on_failure,
    );
    CredentialRetry::new(registry, provider).with_settings(settings)
}
