//! Access token resolution and the refresh-and-retry-once wrapper.

mod classifier;
mod provider;
mod registry;
mod response;
mod retry;

pub use classifier::{AppIdClassifier, IdentityClassifier};
pub use provider::{AccessTokenResult, CredentialProvider, SingleFlight};
#[cfg(test)]
pub(crate) use registry::MockIdentityRegistry;
pub use registry::{IdentityRegistry, InMemoryRegistry, PlatformKind, PlatformKindParseError};
pub use response::{ApiResponse, ReturnCode, WxJsonResult};
pub use retry::{CredentialRetry, RetrySettings};
