//! Redis list-backed queue for distributed workers.
//!
//! Producers `LPUSH`, workers `BRPOP` across every type queue, which gives
//! FIFO order per queue and an atomic hand-off of each entry.
//!
//! A connection blocked in `BRPOP` answers nothing else until the pop
//! returns, so blocking pops never share the multiplexed connection used
//! for pushes, locks and publishes. Each pop borrows a dedicated
//! connection and hands it back when the command completes.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::AsyncCommands;
use tracing::debug;

use super::{decode, encode, Delivery, QueueError, QueueStore};
use crate::models::Job;

pub struct RedisQueue {
    client: redis::Client,
    conn: ConnectionManager,
    /// Idle connections reserved for `BRPOP`.
    blocking: Mutex<Vec<MultiplexedConnection>>,
}

impl RedisQueue {
    /// Connect to Redis (e.g., "redis://localhost:6379").
    pub async fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::Backend(format!("Redis connection error: {}", e)))?;
        let conn = ConnectionManager::new(client.clone()).await.map_err(|e| {
            QueueError::Backend(format!("Redis connection manager error: {}", e))
        })?;
        Ok(Self {
            client,
            conn,
            blocking: Mutex::new(Vec::new()),
        })
    }

    async fn checkout(&self) -> Result<MultiplexedConnection, QueueError> {
        let idle = self.blocking.lock().ok().and_then(|mut idle| idle.pop());
        match idle {
            Some(conn) => Ok(conn),
            None => {
                debug!("opening dedicated connection for blocking pop");
                Ok(self.client.get_multiplexed_async_connection().await?)
            }
        }
    }

    fn checkin(&self, conn: MultiplexedConnection) {
        if let Ok(mut idle) = self.blocking.lock() {
            idle.push(conn);
        }
    }

    /// Connections currently parked for reuse.
    pub fn idle_blocking_connections(&self) -> usize {
        self.blocking.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

#[async_trait]
impl QueueStore for RedisQueue {
    async fn push(&self, queue: &str, job: &Job) -> Result<(), QueueError> {
        let payload = encode(job)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(queue, payload).await?;
        Ok(())
    }

    async fn pop(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.checkout().await?;
        // BRPOP treats 0 as "block forever"; keep the wait bounded.
        let timeout_secs = timeout.as_secs().max(1);

        // A connection that failed mid-command is dropped, not reused.
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(queues)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        self.checkin(conn);

        match popped {
            Some((queue, payload)) => {
                let job = decode(&queue, &payload)?;
                Ok(Some(Delivery { queue, job }))
            }
            None => Ok(None),
        }
    }

    async fn len(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(queue).await?;
        Ok(len)
    }
}
