//! Platform return codes and the tagged API result the retry wrapper inspects.

use std::fmt;

use serde::{Deserialize, Serialize};

/// WeChat `errcode` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnCode(pub i32);

impl ReturnCode {
    pub const SYSTEM_BUSY: ReturnCode = ReturnCode(-1);
    pub const SUCCESS: ReturnCode = ReturnCode(0);
    /// AppSecret is wrong or the access_token is invalid.
    pub const INVALID_CREDENTIAL: ReturnCode = ReturnCode(40001);
    pub const INVALID_ACCESS_TOKEN: ReturnCode = ReturnCode(40014);
    pub const ACCESS_TOKEN_EXPIRED: ReturnCode = ReturnCode(42001);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ReturnCode {
    fn from(code: i32) -> Self {
        ReturnCode(code)
    }
}

/// The `{errcode, errmsg}` envelope every platform JSON response carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxJsonResult {
    #[serde(default)]
    pub errcode: i32,
    #[serde(default)]
    pub errmsg: String,
}

impl WxJsonResult {
    pub fn return_code(&self) -> ReturnCode {
        ReturnCode(self.errcode)
    }
}

/// Result of one platform call: either the payload or the platform's error code.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure { code: ReturnCode, message: String },
}

impl<T> ApiResponse<T> {
    pub fn failure(code: impl Into<ReturnCode>, message: impl Into<String>) -> Self {
        ApiResponse::Failure {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Lift a payload using its envelope: errcode 0 is success, anything else a failure.
    pub fn from_envelope(envelope: WxJsonResult, payload: T) -> Self {
        if envelope.return_code().is_success() {
            ApiResponse::Success(payload)
        } else {
            ApiResponse::Failure {
                code: envelope.return_code(),
                message: envelope.errmsg,
            }
        }
    }

    /// The failure code, `None` on success.
    pub fn code(&self) -> Option<ReturnCode> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Failure { code, .. } => Some(*code),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        match self {
            ApiResponse::Success(value) => ApiResponse::Success(f(value)),
            ApiResponse::Failure { code, message } => ApiResponse::Failure { code, message },
        }
    }
}

impl From<WxJsonResult> for ApiResponse<()> {
    fn from(envelope: WxJsonResult) -> Self {
        ApiResponse::from_envelope(envelope, ())
    }
}
