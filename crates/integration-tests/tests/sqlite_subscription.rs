//! End-to-end subscription against the SQLite transport
//!
//! Uses an in-memory database with a short long-poll so the loops cycle quickly.

use courier_core::application::{Publisher, Subscriber};
use courier_core::domain::{HandlerOptions, SubscriberOptions};
use courier_core::error::AppError;
use courier_core::port::id_provider::mocks::SequentialIdProvider;
use courier_core::port::time_provider::mocks::MockTimeProvider;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_core::port::{handler_fn, HandlerError, TimeProvider, TransportError};
use courier_infra_sqlite::{create_pool, run_migrations, SqliteTransport, SqliteTransportConfig};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::assert_ok;

async fn setup(clock: Arc<dyn TimeProvider>) -> (Arc<SqliteTransport>, SqlitePool) {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let transport = SqliteTransport::new(
        pool.clone(),
        clock,
        Arc::new(SequentialIdProvider::new("id")),
    )
    .with_config(SqliteTransportConfig {
        long_poll_wait: Duration::from_millis(50),
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    });
    (Arc::new(transport), pool)
}

async fn wait_for_depth(transport: &SqliteTransport, queue_id: &String, depth: i64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.queue_depth(queue_id).await.unwrap() != depth {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue depth not reached in time");
}

async fn wait_for_count(counter: &AtomicUsize, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handler count not reached in time");
}

#[tokio::test]
async fn test_handled_messages_are_deleted() {
    let (transport, _pool) = setup(Arc::new(SystemTimeProvider)).await;
    let queue_id = transport.create_queue("orders").await.unwrap();

    let publisher = Publisher::new(transport.clone());
    for n in 0..5 {
        assert_ok!(publisher.send_message("orders", &serde_json::json!({ "n": n })).await);
    }
    assert_eq!(transport.queue_depth(&queue_id).await.unwrap(), 5);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut subscriber = Subscriber::new(transport.clone(), SubscriberOptions::new(2)).unwrap();
    subscriber
        .register(
            "orders",
            handler_fn(move |_, body| {
                let sink = sink.clone();
                async move {
                    let value: serde_json::Value =
                        serde_json::from_str(body.as_deref().unwrap_or("null"))
                            .map_err(|e| HandlerError::new(e.to_string()))?;
                    sink.lock().unwrap().push(value["n"].as_i64().unwrap());
                    Ok::<(), HandlerError>(())
                }
            }),
            HandlerOptions::default(),
        )
        .unwrap();
    let running = tokio::spawn(subscriber.subscribe());

    wait_for_depth(&transport, &queue_id, 0).await;
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    running.abort();
}

#[tokio::test]
async fn test_failed_message_is_redelivered_after_wait_time() {
    let clock = Arc::new(MockTimeProvider::new(1_000_000));
    let (transport, pool) = setup(clock.clone()).await;
    let queue_id = transport.create_queue("flaky").await.unwrap();
    Publisher::new(transport.clone())
        .send_message("flaky", "payload")
        .await
        .unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let mut subscriber = Subscriber::new(transport.clone(), SubscriberOptions::new(1)).unwrap();
    subscriber
        .register(
            "flaky",
            handler_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(HandlerError::new("downstream unavailable")) }
            }),
            HandlerOptions::new(60),
        )
        .unwrap();
    let running = tokio::spawn(subscriber.subscribe());

    wait_for_count(&attempts, 1).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1, "hidden until wait_time passes");

    let (visible_at, receive_count): (i64, i64) =
        sqlx::query_as("SELECT visible_at, receive_count FROM messages WHERE queue_id = ?")
            .bind(&queue_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(visible_at, 1_000_000 + 60_000);
    assert_eq!(receive_count, 1);

    clock.advance_secs(60);
    wait_for_count(&attempts, 2).await;
    assert_eq!(transport.queue_depth(&queue_id).await.unwrap(), 1);
    running.abort();
}

#[tokio::test]
async fn test_topic_fan_out_reaches_every_subscribed_queue() {
    let (transport, _pool) = setup(Arc::new(SystemTimeProvider)).await;
    let first = transport.create_queue("Queue1").await.unwrap();
    let second = transport.create_queue("Queue2").await.unwrap();
    let topic = transport.create_topic("SNSTopic").await.unwrap();
    transport.subscribe_queue(&topic, &first).await.unwrap();
    transport.subscribe_queue(&topic, &second).await.unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let mut subscriber = Subscriber::new(transport.clone(), SubscriberOptions::default()).unwrap();
    for queue in ["Queue1", "Queue2"] {
        let received = received.clone();
        subscriber
            .register(
                queue,
                handler_fn(move |_, body| {
                    let received = received.clone();
                    async move {
                        received.lock().unwrap().push((queue, body));
                        Ok::<(), HandlerError>(())
                    }
                }),
                HandlerOptions::default(),
            )
            .unwrap();
    }
    let running = tokio::spawn(subscriber.subscribe());

    Publisher::new(transport.clone())
        .publish(
            "SNSTopic",
            &serde_json::json!({"title": "test-title", "body": "test-body"}),
        )
        .await
        .unwrap();

    wait_for_depth(&transport, &first, 0).await;
    wait_for_depth(&transport, &second, 0).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let expected = Some(r#"{"body":"test-body","title":"test-title"}"#.to_string());
    let mut received = received.lock().unwrap().clone();
    received.sort();
    assert_eq!(
        received,
        vec![("Queue1", expected.clone()), ("Queue2", expected)]
    );
    running.abort();
}

#[tokio::test]
async fn test_unknown_queue_ends_subscription() {
    let (transport, _pool) = setup(Arc::new(SystemTimeProvider)).await;
    transport.create_queue("known").await.unwrap();

    let mut subscriber = Subscriber::new(transport, SubscriberOptions::new(1)).unwrap();
    for queue in ["known", "missing"] {
        subscriber
            .register(
                queue,
                handler_fn(|_, _| async { Ok::<(), HandlerError>(()) }),
                HandlerOptions::default(),
            )
            .unwrap();
    }

    let err = tokio::time::timeout(Duration::from_secs(2), subscriber.subscribe())
        .await
        .expect("subscribe should return");
    assert!(matches!(
        err,
        AppError::Transport(TransportError::QueueNotFound(ref name)) if name == "missing"
    ));
}
