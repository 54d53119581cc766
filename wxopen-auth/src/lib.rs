//! # wxopen-auth
//!
//! Access token handling and session storage for a WeChat mini-program backend:
//! - Refresh-and-retry-once wrapper for platform calls made with an access token
//! - Registry, token provider and AppId classifier traits it is driven by
//! - Session ("3rd session") store with rolling expiration over a pluggable cache
//! - Blocking facades for callers outside an async runtime
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wxopen_auth::{
//!     credential::{CredentialRetry, InMemoryRegistry, SingleFlight},
//!     session::{MemoryCache, SessionStore},
//! };
//!
//! let retry = CredentialRetry::new(registry, SingleFlight::new(token_provider));
//! let user = retry.call(|token| api.get_user(token), Some(app_id)).await?;
//!
//! let sessions = SessionStore::new(MemoryCache::new());
//! let record = sessions.upsert(None, &open_id, &session_key, None, None).await?;
//! ```

pub mod blocking;
pub mod clock;
pub mod credential;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
