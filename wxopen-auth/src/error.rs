//! Error types for the `wxopen-auth` crate.
//!
//! Follows the same pattern as the rest of the workspace: a root Error struct
//! holding an error kind tree and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for wxopen-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in wxopen-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Identity(IdentityErrorKind),
    Credential(CredentialErrorKind),
    Store(StoreErrorKind),
    /// Raised by the caller's operation itself (transport failure, cancellation).
    /// Passed through the retry wrapper untouched.
    Operation,
    /// A blocking facade could not start its runtime.
    Runtime,
}

/// Errors from resolving which AppId to use.
#[derive(Debug, PartialEq)]
pub enum IdentityErrorKind {
    /// No AppId was supplied and none is registered for the platform.
    NoRegisteredIdentity,
    /// The supplied AppId is not known to the registry.
    UnregisteredIdentity,
}

/// Errors from the access token provider.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    FetchFailed,
    RefreshFailed,
}

/// Errors from the session cache.
#[derive(Debug, PartialEq)]
pub enum StoreErrorKind {
    /// The cache provider could not be reached.
    Unavailable,
    /// A cached value could not be decoded into a session record.
    Corrupted,
    /// A TTL pushes the expiry past the representable time range.
    InvalidTtl,
}

impl Error {
    /// True when this error is the given kind.
    pub fn is(&self, kind: &ErrorKind) -> bool {
        &self.error_kind == kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Identity(kind) => write!(f, "Identity error: {:?}", kind)?,
            ErrorKind::Credential(kind) => write!(f, "Credential error: {:?}", kind)?,
            ErrorKind::Store(kind) => write!(f, "Session store error: {:?}", kind)?,
            ErrorKind::Operation => write!(f, "Operation error")?,
            ErrorKind::Runtime => write!(f, "Runtime error")?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Store(StoreErrorKind::Corrupted),
        }
    }
}

/// Helper function to create identity errors.
pub fn identity_error(kind: IdentityErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Identity(kind),
    }
}

/// Helper function to create credential errors.
pub fn credential_error(kind: CredentialErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create session store errors.
pub fn store_error(kind: StoreErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Store(kind),
    }
}

/// Wrap a failure raised by a caller-supplied operation.
pub fn operation_error<E>(err: E) -> Error
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    Error {
        source: Some(err.into()),
        error_kind: ErrorKind::Operation,
    }
}
