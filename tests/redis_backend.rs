//! Redis backends against a live server.
//!
//! Ignored by default; run with `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.

#![cfg(feature = "redis-backend")]

use std::time::Duration;

use lectern::lock::{LockBackend, RedisLockBackend};
use lectern::queue::{QueueStore, RedisQueue};
use lectern::status::{EventSink, RedisPubSubSink};

fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok()
}

#[tokio::test]
#[ignore]
async fn test_blocking_pop_does_not_stall_locks_or_publishes() {
    let Some(url) = redis_url() else {
        return;
    };
    let suffix = uuid::Uuid::new_v4();
    let queue_name = format!("lectern_test_queue:{}", suffix);
    let lock_key = format!("lectern_test_lock:{}", suffix);

    let queue = std::sync::Arc::new(RedisQueue::new(&url).await.unwrap());
    let client = redis::Client::open(url.as_str()).unwrap();
    let conn = redis::aio::ConnectionManager::new(client).await.unwrap();
    let locks = RedisLockBackend::from_connection(conn.clone());
    let events = RedisPubSubSink::from_connection(conn);

    let popper = {
        let queue = queue.clone();
        let queues = vec![queue_name.clone()];
        tokio::spawn(async move { queue.pop(&queues, Duration::from_secs(3)).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Both complete while the pop above is still blocked on an empty list.
    let acquired = tokio::time::timeout(
        Duration::from_secs(1),
        locks.set_if_absent(&lock_key, "worker-1", Duration::from_secs(30)),
    )
    .await
    .expect("lock acquire stalled behind BRPOP")
    .unwrap();
    assert!(acquired);

    tokio::time::timeout(
        Duration::from_secs(1),
        events.publish("lectern_test_channel", "{}".to_string()),
    )
    .await
    .expect("publish stalled behind BRPOP")
    .unwrap();

    let len = tokio::time::timeout(Duration::from_secs(1), queue.len(&queue_name))
        .await
        .expect("LLEN stalled behind BRPOP")
        .unwrap();
    assert_eq!(len, 0);

    assert!(popper.await.unwrap().unwrap().is_none());
    assert_eq!(queue.idle_blocking_connections(), 1);

    locks.delete(&lock_key).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_push_then_pop_round_trips_a_job() {
    let Some(url) = redis_url() else {
        return;
    };
    let queue_name = format!("lectern_test_queue:{}", uuid::Uuid::new_v4());
    let queue = RedisQueue::new(&url).await.unwrap();

    let job = lectern::models::Job::new(
        "u1",
        lectern::models::JobType::QuizGeneration,
        "q1",
        serde_json::json!({}),
    );
    queue.push(&queue_name, &job).await.unwrap();

    let delivery = queue
        .pop(&[queue_name.clone()], Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery.queue, queue_name);
    assert_eq!(delivery.job.id, job.id);
}
