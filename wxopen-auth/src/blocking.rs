//! Synchronous facades over the async credential wrapper and session store.
//!
//! Each facade owns a current-thread tokio runtime and blocks on the async
//! implementation, so both flavours share one code path. Do not call these
//! from inside an async runtime; use the async types there.

use std::future::ready;

use chrono::Duration;
use tokio::runtime::{Builder, Runtime};

use crate::credential::{self, ApiResponse, CredentialProvider, IdentityRegistry};
use crate::error::{Error, ErrorKind};
use crate::session::{self, CacheProvider, DecodedUserInfo, SessionRecord};

fn runtime() -> Result<Runtime, Error> {
    Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Runtime,
        })
}

/// Blocking counterpart of [`credential::CredentialRetry`].
pub struct CredentialRetry<R: IdentityRegistry, P: CredentialProvider> {
    inner: credential::CredentialRetry<R, P>,
    runtime: Runtime,
}

impl<R: IdentityRegistry, P: CredentialProvider> CredentialRetry<R, P> {
    pub fn new(inner: credential::CredentialRetry<R, P>) -> Result<Self, Error> {
        Ok(Self {
            inner,
            runtime: runtime()?,
        })
    }

    /// See [`credential::CredentialRetry::call`].
    pub fn call<T, F>(
        &self,
        mut operation: F,
        credential_or_identity: Option<&str>,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Result<ApiResponse<T>, Error>,
    {
        self.runtime.block_on(
            self.inner
                .call(move |token| ready(operation(token)), credential_or_identity),
        )
    }

    /// See [`credential::CredentialRetry::call_without_retry`].
    pub fn call_without_retry<T, F>(
        &self,
        mut operation: F,
        credential_or_identity: Option<&str>,
    ) -> Result<ApiResponse<T>, Error>
    where
        F: FnMut(String) -> Result<ApiResponse<T>, Error>,
    {
        self.runtime.block_on(
            self.inner
                .call_without_retry(move |token| ready(operation(token)), credential_or_identity),
        )
    }
}

/// Blocking counterpart of [`session::SessionStore`].
pub struct SessionStore<C: CacheProvider> {
    inner: session::SessionStore<C>,
    runtime: Runtime,
}

impl<C: CacheProvider> SessionStore<C> {
    pub fn new(inner: session::SessionStore<C>) -> Result<Self, Error> {
        Ok(Self {
            inner,
            runtime: runtime()?,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<SessionRecord>, Error> {
        self.runtime.block_on(self.inner.get(key))
    }

    pub fn upsert(
        &self,
        key: Option<&str>,
        open_id: &str,
        session_key: &str,
        union_id: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<SessionRecord, Error> {
        self.runtime
            .block_on(self.inner.upsert(key, open_id, session_key, union_id, ttl))
    }

    pub fn attach_decoded_user_info(
        &self,
        record: &mut SessionRecord,
        info: DecodedUserInfo,
    ) -> Result<(), Error> {
        self.runtime
            .block_on(self.inner.attach_decoded_user_info(record, info))
    }

    pub fn remove(&self, key: &str) -> Result<(), Error> {
        self.runtime.block_on(self.inner.remove(key))
    }
}
