// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::StoreExt;
use serde::{Deserialize, Serialize};

const MS: Duration = Duration::from_millis(1);

#[tokio::test]
async fn values_expire_after_ttl() {
    tokio::time::pause();
    let store = MemoryStore::new();
    store
        .set("k", "v", Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
    assert!(store.keys("*").await.unwrap().is_empty());
}

#[tokio::test]
async fn keys_match_glob_patterns() {
    let store = MemoryStore::new();
    store.set("hooks:events:a", "1", None).await.unwrap();
    store.set("hooks:events:b", "2", None).await.unwrap();
    store.set("hooks:lock:a", "3", None).await.unwrap();

    let keys = store.keys("hooks:events:*").await.unwrap();
    assert_eq!(keys, vec!["hooks:events:a", "hooks:events:b"]);
}

#[tokio::test]
async fn keys_rejects_invalid_pattern() {
    let store = MemoryStore::new();
    let err = store.keys("[").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn queue_is_fifo() {
    let store = MemoryStore::new();
    for v in ["a", "b", "c"] {
        store.enqueue("q", v).await.unwrap();
    }
    assert_eq!(store.queue_len("q").await.unwrap(), 3);

    let mut popped = Vec::new();
    while let Some(v) = store.dequeue("q", MS).await.unwrap() {
        popped.push(v);
    }
    assert_eq!(popped, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn dequeue_times_out_on_empty_queue() {
    tokio::time::pause();
    let store = MemoryStore::new();
    let got = store
        .dequeue("q", Duration::from_millis(250))
        .await
        .unwrap();
    assert_eq!(got, None);
}

#[tokio::test]
async fn dequeue_wakes_on_enqueue() {
    let store = MemoryStore::new();
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.dequeue("q", Duration::from_secs(5)).await })
    };
    tokio::task::yield_now().await;
    store.enqueue("q", "late").await.unwrap();

    let got = waiter.await.unwrap().unwrap();
    assert_eq!(got.as_deref(), Some("late"));
}

#[tokio::test]
async fn set_add_stores_value_and_remove_keeps_it() {
    let store = MemoryStore::new();
    store.set_add("s", "m1", "v1").await.unwrap();
    store.set_add("s", "m2", "v2").await.unwrap();

    assert_eq!(store.set_card("s").await.unwrap(), 2);
    assert_eq!(store.set_members("s").await.unwrap(), vec!["m1", "m2"]);
    assert_eq!(store.set_scan("s").await.unwrap(), vec!["v1", "v2"]);

    store.set_remove("s", "m1").await.unwrap();
    assert_eq!(store.set_card("s").await.unwrap(), 1);
    assert_eq!(store.get("m1").await.unwrap().as_deref(), Some("v1"));
}

#[tokio::test]
async fn set_scan_skips_members_without_value() {
    let store = MemoryStore::new();
    store.set_add("s", "m1", "v1").await.unwrap();
    store.set_add("s", "m2", "v2").await.unwrap();
    store.delete("m1").await.unwrap();

    assert_eq!(store.set_scan("s").await.unwrap(), vec!["v2"]);
    assert_eq!(store.set_card("s").await.unwrap(), 2);
}

#[tokio::test]
async fn lock_is_exclusive_until_unlocked() {
    let store = MemoryStore::new();
    let ttl = Duration::from_secs(30);
    assert!(store.lock("l", ttl, MS, 0).await.unwrap());
    assert!(!store.lock("l", ttl, MS, 2).await.unwrap());

    store.unlock("l").await.unwrap();
    assert!(store.lock("l", ttl, MS, 0).await.unwrap());
}

#[tokio::test]
async fn lock_expires_after_ttl() {
    tokio::time::pause();
    let store = MemoryStore::new();
    assert!(store
        .lock("l", Duration::from_secs(10), MS, 0)
        .await
        .unwrap());

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(store
        .lock("l", Duration::from_secs(10), MS, 0)
        .await
        .unwrap());
}

#[tokio::test]
async fn lock_retries_until_released() {
    tokio::time::pause();
    let store = MemoryStore::new();
    let ttl = Duration::from_secs(30);
    assert!(store.lock("l", ttl, MS, 0).await.unwrap());

    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .lock("l", ttl, Duration::from_millis(100), 10)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(250)).await;
    store.unlock("l").await.unwrap();

    assert!(contender.await.unwrap().unwrap());
}

#[tokio::test]
async fn publish_reaches_subscribers() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe("chan").await.unwrap();
    store.publish("chan", "hello").await.unwrap();

    let msg = sub.get_message(Duration::from_secs(1)).await.unwrap();
    assert_eq!(msg.as_deref(), Some("hello"));
}

#[tokio::test]
async fn publish_without_subscribers_is_ok() {
    let store = MemoryStore::new();
    store.publish("nobody", "hello").await.unwrap();
}

#[tokio::test]
async fn get_message_times_out() {
    tokio::time::pause();
    let store = MemoryStore::new();
    let mut sub = store.subscribe("chan").await.unwrap();
    let msg = sub.get_message(Duration::from_millis(50)).await.unwrap();
    assert_eq!(msg, None);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
}

#[tokio::test]
async fn json_helpers_report_corrupt_records() {
    let store = MemoryStore::new();
    store
        .set_json("r", &Record { name: "a".into() }, None)
        .await
        .unwrap();
    let back: Option<Record> = store.get_json("r").await.unwrap();
    assert_eq!(back, Some(Record { name: "a".into() }));

    store.set("bad", "{not json", None).await.unwrap();
    let err = store.get_json::<Record>("bad").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "bad"));
}

#[tokio::test]
async fn set_scan_json_skips_undecodable_members() {
    let store = MemoryStore::new();
    store
        .set_add_json("s", "m1", &Record { name: "ok".into() })
        .await
        .unwrap();
    store.set_add("s", "m2", "garbage").await.unwrap();

    let records: Vec<Record> = store.set_scan_json("s").await.unwrap();
    assert_eq!(records, vec![Record { name: "ok".into() }]);
}
