//! Mini-program session ("3rd session") storage.

mod cache;
mod key;
mod record;
mod store;

pub use cache::{CacheProvider, MemoryCache};
pub use key::{RandomSessionKey, SessionKeyGenerator};
pub use record::{DecodedUserInfo, SessionRecord, Watermark};
pub use store::{SessionSettings, SessionStore};
