//! Session record types.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// A mini-program login session (the "3rd session") bound to one WeChat user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier handed to the mini-program client.
    pub key: String,
    /// The user's OpenId within this AppId.
    pub open_id: String,
    /// The user's UnionId across the developer's apps, when available.
    pub union_id: Option<String>,
    /// `session_key` returned by `jscode2session`, used to decrypt and verify
    /// client payloads.
    #[serde(serialize_with = "serialize_secret")]
    pub session_key: SecretString,
    /// When the session stops being served.
    pub expire_at: DateTime<Utc>,
    /// Profile decrypted from the client's `encryptedData`.
    #[serde(default)]
    pub decoded_user_info: Option<DecodedUserInfo>,
}

impl SessionRecord {
    /// True once `now` is past `expire_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at < now
    }

    /// Time left until `expire_at`; negative once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expire_at - now
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Decrypted `wx.getUserInfo` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedUserInfo {
    pub open_id: String,
    #[serde(default)]
    pub nick_name: String,
    /// 0 unknown, 1 male, 2 female.
    #[serde(default)]
    pub gender: i32,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub union_id: Option<String>,
    #[serde(default)]
    pub watermark: Watermark,
}

/// Watermark stamped on decrypted data; `appid` should match the caller's AppId.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub appid: String,
    pub timestamp: i64,
}
