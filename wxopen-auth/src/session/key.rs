//! Session key generation.

use rand::Rng;

/// Produces identifiers for new session records. Keys must be unique process-wide.
pub trait SessionKeyGenerator: Send + Sync {
    fn new_session_key(&self) -> String;
}

/// 20 cryptographically random bytes, hex encoded (40 characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSessionKey;

impl SessionKeyGenerator for RandomSessionKey {
    fn new_session_key(&self) -> String {
        let random_bytes: [u8; 20] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}
