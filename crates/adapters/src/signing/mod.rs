// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit signer resolution.
//!
//! Resolving who signed a commit is asynchronous on the collaborator side:
//! an operation is started, then polled until it reports a key.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSigningKeyAdapter, SigningCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningKeyError {
    #[error("signing key not found: {0}")]
    NotFound(String),
    #[error("signing key service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeyRequest {
    pub vcs_server_name: String,
    pub repository_name: String,
    pub git_ref: String,
    pub commit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Done,
    Error,
}

/// State of a signer resolution operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeyOperation {
    pub uuid: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub signer_key_id: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub error: String,
}

/// User owning a signing key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOwner {
    pub user_id: String,
    pub username: String,
}

#[async_trait]
pub trait SigningKeyAdapter: Clone + Send + Sync + 'static {
    async fn start_operation(
        &self,
        request: &SigningKeyRequest,
    ) -> Result<SigningKeyOperation, SigningKeyError>;

    async fn get_operation(&self, uuid: &str) -> Result<SigningKeyOperation, SigningKeyError>;

    async fn key_owner(&self, key_id: &str) -> Result<KeyOwner, SigningKeyError>;
}
