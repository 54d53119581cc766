//! Session store with rolling expiration.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tracing::debug;

use super::{CacheProvider, DecodedUserInfo, RandomSessionKey, SessionKeyGenerator, SessionRecord};
use crate::clock::{Clock, SystemClock};
use crate::error::{store_error, Error, StoreErrorKind};

/// Attempts at persisting a rolled expiry before giving up on extending it.
const ROLL_ATTEMPTS: usize = 3;

/// Session store configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Lifetime granted on creation and on every successful read.
    pub ttl: Duration,
    /// Prefix applied to session keys in the shared cache.
    pub key_prefix: String,
}

impl SessionSettings {
    pub const DEFAULT_TTL_DAYS: i64 = 5;
    pub const DEFAULT_KEY_PREFIX: &'static str = "WxOpenSession:";
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::days(Self::DEFAULT_TTL_DAYS),
            key_prefix: Self::DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

/// Keyed store of [`SessionRecord`]s.
///
/// Reads are side-effecting: every read of a live record pushes its expiry to
/// `now + ttl`. Expired records are deleted on read and reported as absent.
/// The rolled expiry is written with compare-and-swap, so a read racing an
/// upsert or attach never overwrites the newer record.
pub struct SessionStore<C: CacheProvider> {
    cache: C,
    keys: Box<dyn SessionKeyGenerator>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl<C: CacheProvider> SessionStore<C> {
    /// Create a store with default settings, random keys and the system clock.
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            keys: Box::new(RandomSessionKey),
            clock: Arc::new(SystemClock),
            settings: SessionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_key_generator(mut self, keys: Box<dyn SessionKeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Get a live session and extend its expiry.
    ///
    /// # Returns
    ///
    /// `None` if no record exists under `key` or it has expired (it is then deleted).
    pub async fn get(&self, key: &str) -> Result<Option<SessionRecord>, Error> {
        let cache_key = self.cache_key(key);

        for _ in 0..ROLL_ATTEMPTS {
            let Some((raw, mut record)) = self.read_live(&cache_key).await? else {
                return Ok(None);
            };

            record.expire_at = self.expiry_from(self.clock.now(), self.settings.ttl)?;
            let rolled = serde_json::to_vec(&record)?;
            if self
                .cache
                .compare_and_swap(&cache_key, &raw, rolled, self.settings.ttl)
                .await?
            {
                return Ok(Some(record));
            }
            debug!("Session {} changed while extending its expiry, re-reading", key);
        }

        // Lost every race against concurrent writers: serve their copy as is.
        Ok(self.read_live(&cache_key).await?.map(|(_, record)| record))
    }

    /// Create or replace the session under `key`, generating a key when `None`.
    ///
    /// Fails with `Store(InvalidTtl)` when `ttl` overflows the expiry.
    ///
    /// Always builds a fresh record; nothing from a previous record at the same
    /// key (such as decoded user info) is kept.
    pub async fn upsert(
        &self,
        key: Option<&str>,
        open_id: &str,
        session_key: &str,
        union_id: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<SessionRecord, Error> {
        let key = match key {
            Some(key) => key.to_string(),
            None => self.keys.new_session_key(),
        };
        let ttl = ttl.unwrap_or(self.settings.ttl);
        let expire_at = self.expiry_from(self.clock.now(), ttl)?;

        let record = SessionRecord {
            key,
            open_id: open_id.to_string(),
            union_id: union_id.map(str::to_string),
            session_key: SecretString::new(session_key.to_string()),
            expire_at,
            decoded_user_info: None,
        };

        self.cache
            .put(&self.cache_key(&record.key), serde_json::to_vec(&record)?, ttl)
            .await?;
        debug!("Stored session {} for {}", record.key, record.open_id);

        Ok(record)
    }

    /// Attach decrypted user info and persist the record.
    ///
    /// Expiry is not extended: the record is written with its remaining
    /// lifetime `expire_at - now`. A record already past `expire_at` is
    /// written with zero TTL and will be gone on the next read.
    pub async fn attach_decoded_user_info(
        &self,
        record: &mut SessionRecord,
        info: DecodedUserInfo,
    ) -> Result<(), Error> {
        record.decoded_user_info = Some(info);

        let remaining = record.remaining_at(self.clock.now()).max(Duration::zero());
        self.cache
            .put(&self.cache_key(&record.key), serde_json::to_vec(&*record)?, remaining)
            .await
    }

    /// Delete the session under `key`.
    pub async fn remove(&self, key: &str) -> Result<(), Error> {
        self.cache.remove(&self.cache_key(key)).await
    }

    /// Read and decode the record, deleting it if expired.
    async fn read_live(&self, cache_key: &str) -> Result<Option<(Vec<u8>, SessionRecord)>, Error> {
        let Some(raw) = self.cache.get(cache_key).await? else {
            return Ok(None);
        };
        let record: SessionRecord = serde_json::from_slice(&raw)?;

        if record.is_expired_at(self.clock.now()) {
            debug!("Session {} expired, removing", record.key);
            self.cache.remove(cache_key).await?;
            return Ok(None);
        }
        Ok(Some((raw, record)))
    }

    fn expiry_from(&self, now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, Error> {
        now.checked_add_signed(ttl).ok_or_else(|| {
            store_error(
                StoreErrorKind::InvalidTtl,
                &format!("session ttl of {} is out of range", ttl),
            )
        })
    }

    fn cache_key(&self, key: &str) -> String {
        format!("{}{}", self.settings.key_prefix, key)
    }
}
