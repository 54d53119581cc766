//! Telling an AppId apart from a literal access token.

/// Decides whether a `credential_or_identity` string is an identity key (AppId)
/// rather than a literal access token.
pub trait IdentityClassifier: Send + Sync {
    fn is_identity(&self, value: &str) -> bool;
}

/// Length-based classifier.
///
/// AppIds are 18 characters (`wxc3c90837b0e76080`); access tokens are far
/// longer, so anything up to `max_len` characters is treated as an AppId.
#[derive(Debug, Clone, Copy)]
pub struct AppIdClassifier {
    max_len: usize,
}

impl AppIdClassifier {
    pub const DEFAULT_MAX_LEN: usize = 18;

    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl Default for AppIdClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LEN)
    }
}

impl IdentityClassifier for AppIdClassifier {
    fn is_identity(&self, value: &str) -> bool {
        value.chars().count() <= self.max_len
    }
}
