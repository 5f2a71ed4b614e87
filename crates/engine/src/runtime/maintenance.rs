// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maintenance mode.
//!
//! The flag is persisted in the store and broadcast on a pub/sub channel.
//! Each instance caches it; dispatch loops stop popping while it is on.

use super::Runtime;
use crate::error::RuntimeError;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{keys, Clock};
use hk_storage::{Store, Subscription};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

impl<S, H, A, K, W, C> Runtime<S, H, A, K, W, C>
where
    S: Store,
    H: HookResolver,
    A: AnalysisAdapter,
    K: SigningKeyAdapter,
    W: WorkflowRunAdapter,
    C: Clock,
{
    /// Persist the flag and broadcast it to every instance.
    pub async fn set_maintenance(&self, enabled: bool) -> Result<(), RuntimeError> {
        let value = if enabled { "true" } else { "false" };
        self.store.set(keys::MAINTENANCE_FLAG, value, None).await?;
        self.store.publish(keys::MAINTENANCE_CHANNEL, value).await?;
        self.maintenance.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "maintenance mode set");
        Ok(())
    }

    /// Refresh the cached flag from the store.
    pub async fn load_maintenance(&self) -> Result<bool, RuntimeError> {
        let enabled = self
            .store
            .get(keys::MAINTENANCE_FLAG)
            .await?
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);
        self.maintenance.store(enabled, Ordering::SeqCst);
        Ok(enabled)
    }

    /// Follow maintenance toggles published by any instance until `cancel`
    /// fires.
    pub async fn run_maintenance_listener(
        &self,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let mut subscription = self.store.subscribe(keys::MAINTENANCE_CHANNEL).await?;
        // Loaded after subscribing so a toggle in between is not missed
        let enabled = self.load_maintenance().await?;
        tracing::info!(enabled, "maintenance listener started");

        while !cancel.is_cancelled() {
            let Some(message) = subscription
                .get_message(self.config.dequeue_timeout)
                .await?
            else {
                continue;
            };
            match parse_flag(&message) {
                Some(enabled) => {
                    self.maintenance.store(enabled, Ordering::SeqCst);
                    tracing::info!(enabled, "maintenance mode changed");
                }
                None => tracing::warn!(message = %message, "ignoring maintenance message"),
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}
