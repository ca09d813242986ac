//! Shared queue, lock and event backends selected from settings.

use std::sync::Arc;

use tracing::warn;

use crate::config::Settings;
use crate::lock::{InMemoryLockBackend, LockBackend};
use crate::queue::{InMemoryQueue, QueueStore};
use crate::repository::DieselPipelineRepository;
use crate::status::{BroadcastSink, EventSink};

pub struct Backends {
    pub queue: Arc<dyn QueueStore>,
    pub lock: Arc<dyn LockBackend>,
    pub events: Arc<dyn EventSink>,
}

/// Connect to Redis when configured, otherwise use in-process backends.
pub async fn connect(settings: &Settings) -> anyhow::Result<Backends> {
    match settings.redis_url {
        Some(ref url) => connect_redis(url).await,
        None => {
            warn!("No Redis URL configured, using in-process queue, locks and events");
            Ok(Backends {
                queue: Arc::new(InMemoryQueue::new()),
                lock: Arc::new(InMemoryLockBackend::new()),
                events: Arc::new(BroadcastSink::new(256)),
            })
        }
    }
}

#[cfg(feature = "redis-backend")]
async fn connect_redis(url: &str) -> anyhow::Result<Backends> {
    use crate::lock::RedisLockBackend;
    use crate::queue::RedisQueue;
    use crate::status::RedisPubSubSink;

    // The queue keeps its own connections; locks and events share one.
    let queue = RedisQueue::new(url).await?;
    let client = redis::Client::open(url)?;
    let conn = redis::aio::ConnectionManager::new(client).await?;
    Ok(Backends {
        queue: Arc::new(queue),
        lock: Arc::new(RedisLockBackend::from_connection(conn.clone())),
        events: Arc::new(RedisPubSubSink::from_connection(conn)),
    })
}

#[cfg(not(feature = "redis-backend"))]
async fn connect_redis(url: &str) -> anyhow::Result<Backends> {
    anyhow::bail!(
        "Redis URL {} configured but lectern was built without the redis-backend feature",
        url
    )
}

/// Open the job database, creating the data directory if needed.
pub async fn open_repository(settings: &Settings) -> anyhow::Result<DieselPipelineRepository> {
    if settings.database_url.is_none() {
        settings.ensure_directories()?;
    }
    Ok(DieselPipelineRepository::open(&settings.database_url()).await?)
}
