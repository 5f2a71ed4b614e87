// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{Store, StoreError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any [`Store`].
///
/// Locks and queue operations get spans with timing; plain reads and writes
/// only log failures.
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn log_err<T>(op: &str, key: &str, result: &Result<T, StoreError>) {
    if let Err(e) = result {
        tracing::error!(op, key, error = %e, "store operation failed");
    }
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    type Subscription = S::Subscription;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.inner.get(key).await;
        log_err("get", key, &result);
        result
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let result = self.inner.set(key, value, ttl).await;
        log_err("set", key, &result);
        result
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        tracing::debug!(key, "delete");
        let result = self.inner.delete(key).await;
        log_err("delete", key, &result);
        result
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let result = self.inner.keys(pattern).await;
        log_err("keys", pattern, &result);
        result
    }

    async fn enqueue(&self, queue: &str, value: &str) -> Result<(), StoreError> {
        tracing::debug!(queue, value, "enqueue");
        let result = self.inner.enqueue(queue, value).await;
        log_err("enqueue", queue, &result);
        result
    }

    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<String>, StoreError> {
        let result = self.inner.dequeue(queue, wait).await;
        match &result {
            Ok(Some(value)) => tracing::debug!(queue, value = value.as_str(), "dequeued"),
            Ok(None) => {}
            Err(e) => tracing::error!(queue, error = %e, "dequeue failed"),
        }
        result
    }

    async fn queue_len(&self, queue: &str) -> Result<usize, StoreError> {
        self.inner.queue_len(queue).await
    }

    async fn set_add(&self, set: &str, member: &str, value: &str) -> Result<(), StoreError> {
        let result = self.inner.set_add(set, member, value).await;
        log_err("set_add", set, &result);
        result
    }

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        tracing::debug!(set, member, "set_remove");
        let result = self.inner.set_remove(set, member).await;
        log_err("set_remove", set, &result);
        result
    }

    async fn set_card(&self, set: &str) -> Result<usize, StoreError> {
        self.inner.set_card(set).await
    }

    async fn set_scan(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let result = self.inner.set_scan(set).await;
        log_err("set_scan", set, &result);
        result
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let result = self.inner.set_members(set).await;
        log_err("set_members", set, &result);
        result
    }

    async fn lock(
        &self,
        key: &str,
        ttl: Duration,
        retry_interval: Duration,
        retry_count: u32,
    ) -> Result<bool, StoreError> {
        async {
            let start = Instant::now();
            let result = self.inner.lock(key, ttl, retry_interval, retry_count).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(true) => tracing::debug!(elapsed_ms, "acquired"),
                Ok(false) => tracing::debug!(elapsed_ms, "contended"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "lock failed"),
            }
            result
        }
        .instrument(tracing::debug_span!("store.lock", key, ttl_ms = ttl.as_millis() as u64))
        .await
    }

    async fn unlock(&self, key: &str) -> Result<(), StoreError> {
        let result = self.inner.unlock(key).await;
        tracing::debug_span!("store.unlock", key).in_scope(|| match &result {
            Ok(()) => tracing::debug!("released"),
            Err(e) => tracing::error!(error = %e, "unlock failed"),
        });
        result
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        tracing::info!(channel, message, "publish");
        let result = self.inner.publish(channel, message).await;
        log_err("publish", channel, &result);
        result
    }

    async fn subscribe(&self, channel: &str) -> Result<Self::Subscription, StoreError> {
        tracing::info!(channel, "subscribe");
        let result = self.inner.subscribe(channel).await;
        log_err("subscribe", channel, &result);
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
