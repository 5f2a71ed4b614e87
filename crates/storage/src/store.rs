// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared store contract.
//!
//! Everything the hook service shares between worker instances goes through
//! this trait: plain values with TTL, FIFO queues, keyed sets, advisory
//! locks and a pub/sub channel. There are no transactions; callers protect
//! read-modify-write sequences with [`Store::lock`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),
}

/// Shared key/value, queue, set, lock and pub/sub primitives
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Subscription: Subscription;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` at `key`, expiring after `ttl` when given
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete a value, queue or set
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Value keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn enqueue(&self, queue: &str, value: &str) -> Result<(), StoreError>;

    /// Pop the oldest entry, waiting up to `wait`. `None` on timeout.
    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<String>, StoreError>;

    async fn queue_len(&self, queue: &str) -> Result<usize, StoreError>;

    /// Add `member` to `set` and store `value` at the `member` key
    async fn set_add(&self, set: &str, member: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `member` from `set`. The value at `member` is kept.
    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError>;

    async fn set_card(&self, set: &str) -> Result<usize, StoreError>;

    /// Values of the members of `set`, in insertion order. Members whose
    /// value no longer exists are left out.
    async fn set_scan(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Member keys of `set`, in insertion order
    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Try to take the lock at `key` for `ttl`, retrying `retry_count` more
    /// times every `retry_interval`. Locks are not reentrant.
    async fn lock(
        &self,
        key: &str,
        ttl: Duration,
        retry_interval: Duration,
        retry_count: u32,
    ) -> Result<bool, StoreError>;

    async fn unlock(&self, key: &str) -> Result<(), StoreError>;

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError>;

    async fn subscribe(&self, channel: &str) -> Result<Self::Subscription, StoreError>;
}

/// Messages received on a pub/sub channel
#[async_trait]
pub trait Subscription: Send + 'static {
    /// Next message, waiting up to `timeout`. `None` on timeout.
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<String>, StoreError>;
}

/// Typed JSON helpers over any [`Store`]
#[async_trait]
pub trait StoreExt: Store {
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set_json<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        let raw = encode(key, value)?;
        self.set(key, &raw, ttl).await
    }

    async fn set_add_json<T>(&self, set: &str, member: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        let raw = encode(member, value)?;
        self.set_add(set, member, &raw).await
    }

    /// Decoded values of `set`. Undecodable members are logged and skipped.
    async fn set_scan_json<T>(&self, set: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.set_scan(set).await?;
        let mut out = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str(&item) {
                Ok(v) => out.push(v),
                Err(e) => tracing::warn!(set, error = %e, "skipping undecodable set member"),
            }
        }
        Ok(out)
    }
}

impl<S: Store> StoreExt for S {}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}
