//! Integration tests for the real-time broker

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_server::broker::{Broker, BrokerError, SubscriberToken};
use chat_server::types::{ChatId, Message, UserPublic};
use chrono::Utc;
use tokio::sync::mpsc::error::TryRecvError;

fn message(chat_id: ChatId, id: i64, text: &str) -> Arc<Message> {
    Arc::new(Message {
        id,
        chat_id,
        user: UserPublic {
            id: 1,
            name: "alice".to_string(),
        },
        text: text.to_string(),
        timestamp: Utc::now(),
    })
}

#[tokio::test]
async fn test_hi_then_bye_after_unsubscribe() {
    let broker = Broker::new();
    broker.declare_room(7);

    let mut sub = broker.subscribe(7).unwrap();
    broker.publish(7, message(7, 1, "hi")).unwrap();
    assert!(broker.unsubscribe(7, sub.token()));
    broker.publish(7, message(7, 2, "bye")).unwrap();

    let got: Vec<String> = std::iter::from_fn(|| sub.try_recv().ok())
        .map(|m| m.text.clone())
        .collect();
    assert_eq!(got, vec!["hi"]);
}

#[tokio::test]
async fn test_two_subscribers_same_order() {
    let broker = Broker::new();
    broker.declare_room(3);

    let mut a = broker.subscribe(3).unwrap();
    let mut b = broker.subscribe(3).unwrap();
    assert_ne!(a.token(), b.token());

    broker.publish(3, message(3, 1, "M1")).unwrap();
    broker.publish(3, message(3, 2, "M2")).unwrap();

    for sub in [&mut a, &mut b] {
        assert_eq!(sub.recv().await.unwrap().text, "M1");
        assert_eq!(sub.recv().await.unwrap().text, "M2");
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let broker = Broker::new();
    broker.declare_room(1);
    broker.declare_room(2);

    let mut one = broker.subscribe(1).unwrap();
    let mut two = broker.subscribe(2).unwrap();

    broker.publish(1, message(1, 1, "for one")).unwrap();

    assert_eq!(one.recv().await.unwrap().text, "for one");
    assert!(matches!(two.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_unknown_room_and_token() {
    let broker = Broker::new();
    assert_eq!(
        broker.subscribe(42).unwrap_err(),
        BrokerError::UnknownRoom(42)
    );
    assert!(!broker.unsubscribe(42, SubscriberToken::new()));

    broker.declare_room(42);
    let sub = broker.subscribe(42).unwrap();
    let token = sub.token();
    assert!(broker.unsubscribe(42, token));
    // Second removal is a no-op
    assert!(!broker.unsubscribe(42, token));
}

#[tokio::test]
async fn test_interleaved_publishes_keep_per_subscriber_order() {
    let broker = Broker::new();
    broker.declare_room(5);

    let mut first = broker.subscribe(5).unwrap();
    broker.publish(5, message(5, 1, "a")).unwrap();
    let mut second = broker.subscribe(5).unwrap();
    broker.publish(5, message(5, 2, "b")).unwrap();
    assert_eq!(first.recv().await.unwrap().id, 1);
    broker.publish(5, message(5, 3, "c")).unwrap();

    let rest: Vec<i64> = std::iter::from_fn(|| first.try_recv().ok()).map(|m| m.id).collect();
    assert_eq!(rest, vec![2, 3]);
    let seen: Vec<i64> = std::iter::from_fn(|| second.try_recv().ok()).map(|m| m.id).collect();
    assert_eq!(seen, vec![2, 3]);
}

#[tokio::test]
async fn test_subscription_drains_as_stream() {
    use futures::StreamExt;

    let broker = Broker::new();
    broker.declare_room(9);

    let sub = broker.subscribe(9).unwrap();
    let token = sub.token();
    for id in 1..=3 {
        broker.publish(9, message(9, id, "s")).unwrap();
    }
    assert!(broker.unsubscribe(9, token));
    broker.publish(9, message(9, 4, "late")).unwrap();

    // Queued messages come out in order, then the stream ends
    let ids: Vec<i64> = sub.map(|m| m.id).collect().await;
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_publish_unsubscribe() {
    const ROOMS: i64 = 4;
    const PUBLISHES: i64 = 200;
    const LISTENERS: usize = 16;

    let broker = Broker::new();
    for room in 1..=ROOMS {
        broker.declare_room(room);
    }

    // Highest id each room's publisher has started to publish
    let started: Arc<Vec<AtomicI64>> =
        Arc::new((0..=ROOMS).map(|_| AtomicI64::new(0)).collect());

    // Listeners come and go while publishers run
    let mut listeners = Vec::new();
    for i in 0..LISTENERS {
        let broker = broker.clone();
        let started = started.clone();
        let room = (i as i64 % ROOMS) + 1;
        listeners.push(tokio::spawn(async move {
            let mut sub = broker.subscribe(room).unwrap();
            let mut ids = Vec::new();
            let deadline = tokio::time::sleep(Duration::from_millis(5 * (i as u64 % 4 + 1)));
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    next = sub.recv() => match next {
                        Some(m) => {
                            assert_eq!(m.chat_id, room);
                            ids.push(m.id);
                        }
                        None => break,
                    },
                }
            }

            let token = sub.token();
            assert!(broker.unsubscribe(room, token));
            let watermark = started[room as usize].load(Ordering::SeqCst);
            assert!(!broker.unsubscribe(room, token));

            // Only publishes already under way when unsubscribe returned may
            // still land; anything started later must not.
            while let Ok(m) = sub.try_recv() {
                assert!(
                    m.id <= watermark,
                    "listener {} got id {} after unsubscribe (watermark {})",
                    i,
                    m.id,
                    watermark
                );
                ids.push(m.id);
            }
            ids
        }));
    }

    let mut publishers = Vec::new();
    for room in 1..=ROOMS {
        let broker = broker.clone();
        let started = started.clone();
        publishers.push(tokio::spawn(async move {
            // Ids increase per room, so any reordering is visible
            for id in 1..=PUBLISHES {
                started[room as usize].store(id, Ordering::SeqCst);
                broker.publish(room, message(room, id, "x")).unwrap();
                if id % 20 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    for publisher in publishers {
        publisher.await.unwrap();
    }

    let mut seen_per_listener = HashMap::new();
    for (i, listener) in listeners.into_iter().enumerate() {
        let ids = listener.await.unwrap();
        assert!(
            ids.windows(2).all(|w| w[0] < w[1]),
            "listener {} saw out-of-order ids: {:?}",
            i,
            ids
        );
        seen_per_listener.insert(i, ids.len());
    }

    for room in 1..=ROOMS {
        assert_eq!(broker.subscriber_count(room), 0);
    }
    assert_eq!(seen_per_listener.len(), LISTENERS);
}
