use log::{error, info};
use service::{config::Config, logging::Logger};
use wxopen_auth::session::MemoryCache;

/// Round-trips a throwaway session through a store built from the current
/// configuration, so TTL and key prefix settings can be checked before deploy.
#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
        std::process::exit(1);
    }

    let store = service::session_store(&config, MemoryCache::new());

    let created = match store
        .upsert(None, "session-check-openid", "session-check-key", None, None)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to store session: {e}");
            std::process::exit(1);
        }
    };

    match store.get(&created.key).await {
        Ok(Some(record)) => info!(
            "Session {} is live until {}",
            record.key,
            record.expire_at.to_rfc3339()
        ),
        Ok(None) => {
            error!("Session {} was not readable after storing it", created.key);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to read session: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = store.remove(&created.key).await {
        error!("Failed to remove session: {e}");
        std::process::exit(1);
    }
}
