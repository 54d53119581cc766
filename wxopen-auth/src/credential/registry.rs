//! Registry of AppIds the process holds credentials for.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Error;

/// WeChat platforms an AppId can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Official account.
    Mp,
    /// Mini-program.
    WxOpen,
    /// Open platform.
    Open,
    /// WeCom.
    Work,
}

impl PlatformKind {
    /// Get the platform identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Mp => "mp",
            PlatformKind::WxOpen => "wx_open",
            PlatformKind::Open => "open",
            PlatformKind::Work => "work",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PlatformKindParseError;

impl FromStr for PlatformKind {
    type Err = PlatformKindParseError;
    fn from_str(value: &str) -> Result<PlatformKind, Self::Err> {
        match value.to_lowercase().as_str() {
            "mp" => Ok(PlatformKind::Mp),
            "wx_open" | "wxopen" => Ok(PlatformKind::WxOpen),
            "open" => Ok(PlatformKind::Open),
            "work" => Ok(PlatformKind::Work),
            _ => Err(PlatformKindParseError),
        }
    }
}

/// Lookup of registered AppIds.
///
/// Implementations are shared process-wide and must handle concurrent access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// The first AppId registered for `platform`, if any.
    async fn first_registered(&self, platform: PlatformKind) -> Result<Option<String>, Error>;

    /// Whether `app_id` has been registered.
    async fn is_registered(&self, app_id: &str) -> Result<bool, Error>;
}

#[async_trait]
impl<R: IdentityRegistry + ?Sized> IdentityRegistry for Arc<R> {
    async fn first_registered(&self, platform: PlatformKind) -> Result<Option<String>, Error> {
        (**self).first_registered(platform).await
    }

    async fn is_registered(&self, app_id: &str) -> Result<bool, Error> {
        (**self).is_registered(app_id).await
    }
}

#[derive(Debug, Clone)]
struct Registration {
    app_id: String,
    platform: PlatformKind,
}

/// Registry held in process memory, preserving registration order.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    registrations: RwLock<Vec<Registration>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an AppId. Re-registering keeps its original position.
    pub async fn register(&self, app_id: impl Into<String>, platform: PlatformKind) {
        let app_id = app_id.into();
        let mut registrations = self.registrations.write().await;
        match registrations.iter_mut().find(|r| r.app_id == app_id) {
            Some(existing) => existing.platform = platform,
            None => {
                debug!("Registering {} for platform {}", app_id, platform);
                registrations.push(Registration { app_id, platform });
            }
        }
    }

    /// Remove an AppId. Returns true if it was registered.
    pub async fn unregister(&self, app_id: &str) -> bool {
        let mut registrations = self.registrations.write().await;
        let before = registrations.len();
        registrations.retain(|r| r.app_id != app_id);
        registrations.len() != before
    }
}

#[async_trait]
impl IdentityRegistry for InMemoryRegistry {
    async fn first_registered(&self, platform: PlatformKind) -> Result<Option<String>, Error> {
        let registrations = self.registrations.read().await;
        Ok(registrations
            .iter()
            .find(|r| r.platform == platform)
            .map(|r| r.app_id.clone()))
    }

    async fn is_registered(&self, app_id: &str) -> Result<bool, Error> {
        let registrations = self.registrations.read().await;
        Ok(registrations.iter().any(|r| r.app_id == app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_kind_round_trip_str() {
        assert_eq!(PlatformKind::WxOpen.as_str(), "wx_open");
        assert_eq!("WX_OPEN".parse::<PlatformKind>(), Ok(PlatformKind::WxOpen));
        assert_eq!("mp".parse::<PlatformKind>(), Ok(PlatformKind::Mp));
        assert!("qq".parse::<PlatformKind>().is_err());
    }

    #[tokio::test]
    async fn test_first_registered_is_per_platform_and_ordered() {
        let registry = InMemoryRegistry::new();
        registry.register("wx_mp_1", PlatformKind::Mp).await;
        registry.register("wx_open_1", PlatformKind::WxOpen).await;
        registry.register("wx_open_2", PlatformKind::WxOpen).await;

        let first = registry.first_registered(PlatformKind::WxOpen).await.unwrap();
        assert_eq!(first.as_deref(), Some("wx_open_1"));

        let none = registry.first_registered(PlatformKind::Work).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = InMemoryRegistry::new();
        registry.register("wx_open_1", PlatformKind::WxOpen).await;
        assert!(registry.is_registered("wx_open_1").await.unwrap());

        assert!(registry.unregister("wx_open_1").await);
        assert!(!registry.unregister("wx_open_1").await);
        assert!(!registry.is_registered("wx_open_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_reregister_keeps_position() {
        let registry = InMemoryRegistry::new();
        registry.register("a", PlatformKind::WxOpen).await;
        registry.register("b", PlatformKind::WxOpen).await;
        registry.register("a", PlatformKind::WxOpen).await;

        let first = registry.first_registered(PlatformKind::WxOpen).await.unwrap();
        assert_eq!(first.as_deref(), Some("a"));
    }
}
