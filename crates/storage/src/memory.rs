// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process [`Store`] implementation.
//!
//! Holds every structure behind one mutex. Blocking dequeues park on a
//! [`Notify`] and deadlines use `tokio::time`, so paused-time tests work.

use crate::store::{Store, StoreError, Subscription};
use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::Instant;

/// Buffered messages per pub/sub channel before slow subscribers lag
const CHANNEL_CAPACITY: usize = 64;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct State {
    values: HashMap<String, Entry>,
    queues: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, IndexSet<String>>,
    channels: HashMap<String, broadcast::Sender<String>>,
}

impl State {
    fn live_value(&mut self, key: &str, now: Instant) -> Option<&str> {
        let expired = self.values.get(key).is_some_and(|e| !e.is_live(now));
        if expired {
            self.values.remove(key);
            return None;
        }
        self.values.get(key).map(|e| e.value.as_str())
    }
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    queue_notify: Notify,
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_lock_once(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        if state.live_value(key, now).is_some() {
            return false;
        }
        state.values.insert(
            key.to_string(),
            Entry {
                value: "locked".to_string(),
                expires_at: Some(now + ttl),
            },
        );
        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Subscription = MemorySubscription;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.inner.state.lock();
        Ok(state.live_value(key, Instant::now()).map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|t| Instant::now() + t);
        self.inner.state.lock().values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        state.values.remove(key);
        state.queues.remove(key);
        state.sets.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| StoreError::InvalidArgument(format!("pattern '{}': {}", pattern, e)))?;
        let now = Instant::now();
        let state = self.inner.state.lock();
        let mut keys: Vec<String> = state
            .values
            .iter()
            .filter(|(k, e)| e.is_live(now) && pattern.matches(k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn enqueue(&self, queue: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .state
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(value.to_string());
        self.inner.queue_notify.notify_waiters();
        Ok(())
    }

    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + wait;
        loop {
            // Registered before checking the queue so an enqueue in between
            // is not missed.
            let notified = self.inner.queue_notify.notified();
            {
                let mut state = self.inner.state.lock();
                if let Some(value) = state.queues.get_mut(queue).and_then(|q| q.pop_front()) {
                    return Ok(Some(value));
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn queue_len(&self, queue: &str) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .state
            .lock()
            .queues
            .get(queue)
            .map_or(0, VecDeque::len))
    }

    async fn set_add(&self, set: &str, member: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        state.values.insert(
            member.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        state
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        if let Some(members) = state.sets.get_mut(set) {
            members.shift_remove(member);
            if members.is_empty() {
                state.sets.remove(set);
            }
        }
        Ok(())
    }

    async fn set_card(&self, set: &str) -> Result<usize, StoreError> {
        Ok(self.inner.state.lock().sets.get(set).map_or(0, IndexSet::len))
    }

    async fn set_scan(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        let members: Vec<String> = match state.sets.get(set) {
            Some(m) => m.iter().cloned().collect(),
            None => return Ok(Vec::new()),
        };
        Ok(members
            .iter()
            .filter_map(|m| state.live_value(m, now).map(str::to_string))
            .collect())
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .state
            .lock()
            .sets
            .get(set)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn lock(
        &self,
        key: &str,
        ttl: Duration,
        retry_interval: Duration,
        retry_count: u32,
    ) -> Result<bool, StoreError> {
        for attempt in 0..=retry_count {
            if self.try_lock_once(key, ttl) {
                return Ok(true);
            }
            if attempt < retry_count {
                tokio::time::sleep(retry_interval).await;
            }
        }
        Ok(false)
    }

    async fn unlock(&self, key: &str) -> Result<(), StoreError> {
        self.inner.state.lock().values.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        let state = self.inner.state.lock();
        if let Some(tx) = state.channels.get(channel) {
            // No receivers is not an error
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MemorySubscription, StoreError> {
        let mut state = self.inner.state.lock();
        let tx = state
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(MemorySubscription {
            channel: channel.to_string(),
            rx: tx.subscribe(),
        })
    }
}

/// Subscription to a [`MemoryStore`] channel
pub struct MemorySubscription {
    channel: String,
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return Ok(None),
                Ok(Ok(message)) => return Ok(Some(message)),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(channel = %self.channel, skipped, "subscriber lagged");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(StoreError::SubscriptionClosed(self.channel.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
