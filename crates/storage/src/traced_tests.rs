// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::MemoryStore;

#[tokio::test]
async fn traced_store_delegates_to_inner() {
    let store = TracedStore::new(MemoryStore::new());
    store.set("k", "v", None).await.unwrap();
    assert_eq!(store.inner().get("k").await.unwrap().as_deref(), Some("v"));

    store.enqueue("q", "a").await.unwrap();
    assert_eq!(
        store
            .dequeue("q", Duration::from_millis(1))
            .await
            .unwrap()
            .as_deref(),
        Some("a")
    );
}

#[tokio::test]
async fn traced_lock_keeps_exclusivity() {
    let store = TracedStore::new(MemoryStore::new());
    let ttl = Duration::from_secs(5);
    let retry = Duration::from_millis(1);
    assert!(store.lock("l", ttl, retry, 0).await.unwrap());
    assert!(!store.inner().lock("l", ttl, retry, 0).await.unwrap());
    store.unlock("l").await.unwrap();
    assert!(store.inner().lock("l", ttl, retry, 0).await.unwrap());
}
