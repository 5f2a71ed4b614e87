// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake signing key adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    KeyOwner, OperationStatus, SigningKeyAdapter, SigningKeyError, SigningKeyOperation,
    SigningKeyRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded signing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningCall {
    Start { commit: String },
    Get { uuid: String },
    KeyOwner { key_id: String },
}

struct FakeSigningState {
    /// Outcome every new operation eventually reports
    outcome: SigningKeyOperation,
    /// Polls answering `Pending` before the outcome is reported
    pending_polls: u32,
    operations: HashMap<String, u32>,
    owners: HashMap<String, KeyOwner>,
    unavailable: bool,
    calls: Vec<SigningCall>,
    next_id: u64,
}

/// Scripted signing key service
#[derive(Clone)]
pub struct FakeSigningKeyAdapter {
    inner: Arc<Mutex<FakeSigningState>>,
}

impl Default for FakeSigningKeyAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSigningState {
                outcome: SigningKeyOperation {
                    uuid: String::new(),
                    status: OperationStatus::Done,
                    signer_key_id: "key-1".to_string(),
                    verified: true,
                    error: String::new(),
                },
                pending_polls: 0,
                operations: HashMap::new(),
                owners: HashMap::from([(
                    "key-1".to_string(),
                    KeyOwner {
                        user_id: "u-1".to_string(),
                        username: "alice".to_string(),
                    },
                )]),
                unavailable: false,
                calls: Vec::new(),
                next_id: 1,
            })),
        }
    }
}

impl FakeSigningKeyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations resolve to `key_id`, verified or not
    pub fn resolve_to(&self, key_id: &str, verified: bool) {
        let mut state = self.inner.lock();
        state.outcome.status = OperationStatus::Done;
        state.outcome.signer_key_id = key_id.to_string();
        state.outcome.verified = verified;
    }

    /// Operations fail with `error`
    pub fn fail_with(&self, error: &str) {
        let mut state = self.inner.lock();
        state.outcome.status = OperationStatus::Error;
        state.outcome.error = error.to_string();
    }

    /// Number of polls answering `Pending` before the outcome
    pub fn pending_for(&self, polls: u32) {
        self.inner.lock().pending_polls = polls;
    }

    pub fn add_owner(&self, key_id: &str, user_id: &str, username: &str) {
        self.inner.lock().owners.insert(
            key_id.to_string(),
            KeyOwner {
                user_id: user_id.to_string(),
                username: username.to_string(),
            },
        );
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<SigningCall> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, call: SigningCall) -> Result<(), SigningKeyError> {
        let mut state = self.inner.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(SigningKeyError::Unavailable("fake signing offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SigningKeyAdapter for FakeSigningKeyAdapter {
    async fn start_operation(
        &self,
        request: &SigningKeyRequest,
    ) -> Result<SigningKeyOperation, SigningKeyError> {
        self.record(SigningCall::Start {
            commit: request.commit.clone(),
        })?;
        let mut state = self.inner.lock();
        let uuid = format!("op-{}", state.next_id);
        state.next_id += 1;
        let pending = state.pending_polls;
        state.operations.insert(uuid.clone(), pending);
        Ok(SigningKeyOperation {
            uuid,
            status: OperationStatus::Pending,
            signer_key_id: String::new(),
            verified: false,
            error: String::new(),
        })
    }

    async fn get_operation(&self, uuid: &str) -> Result<SigningKeyOperation, SigningKeyError> {
        self.record(SigningCall::Get {
            uuid: uuid.to_string(),
        })?;
        let mut state = self.inner.lock();
        let remaining = state
            .operations
            .get_mut(uuid)
            .ok_or_else(|| SigningKeyError::NotFound(uuid.to_string()))?;
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(SigningKeyOperation {
                uuid: uuid.to_string(),
                status: OperationStatus::Pending,
                signer_key_id: String::new(),
                verified: false,
                error: String::new(),
            });
        }
        Ok(SigningKeyOperation {
            uuid: uuid.to_string(),
            ..state.outcome.clone()
        })
    }

    async fn key_owner(&self, key_id: &str) -> Result<KeyOwner, SigningKeyError> {
        self.record(SigningCall::KeyOwner {
            key_id: key_id.to_string(),
        })?;
        self.inner
            .lock()
            .owners
            .get(key_id)
            .cloned()
            .ok_or_else(|| SigningKeyError::NotFound(key_id.to_string()))
    }
}
