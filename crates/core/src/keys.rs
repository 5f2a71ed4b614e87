// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store key layout.
//!
//! Every key, queue, set and lock name used against the shared store is
//! derived here. Event identities are built from the VCS server *name*,
//! repository and UUID, lower-cased, and lock keys reuse that identity.

/// Queue of repository event keys awaiting processing
pub const REPOSITORY_EVENT_QUEUE: &str = "hooks:queue:repository:event";
/// Repository event keys currently owned by some worker
pub const REPOSITORY_EVENT_IN_PROGRESS: &str = "hooks:inprogress:repository:event";

/// Queue of outgoing (workflow run) event keys
pub const OUTGOING_EVENT_QUEUE: &str = "hooks:queue:outgoing:event";
/// Outgoing event keys currently owned by some worker
pub const OUTGOING_EVENT_IN_PROGRESS: &str = "hooks:inprogress:outgoing:event";

/// All scheduler executions, across workflows
pub const SCHEDULER_EXECUTIONS: &str = "hooks:scheduler:executions";

/// Pub/sub channel carrying maintenance toggles
pub const MAINTENANCE_CHANNEL: &str = "hooks:maintenance";
/// Persisted maintenance flag
pub const MAINTENANCE_FLAG: &str = "hooks:maintenance:enabled";

/// Lower-cased `vcs-repo-uuid`
pub fn event_identity(vcs: &str, repo: &str, uuid: &str) -> String {
    format!("{}-{}-{}", vcs, repo, uuid).to_lowercase()
}

pub fn repository_event(vcs: &str, repo: &str, uuid: &str) -> String {
    format!("hooks:events:repository:{}", event_identity(vcs, repo, uuid))
}

/// Index of the events of one repository
pub fn repository_events_index(vcs: &str, repo: &str) -> String {
    format!("hooks:events:repository-index:{}-{}", vcs, repo).to_lowercase()
}

pub fn repository_event_lock(vcs: &str, repo: &str, uuid: &str) -> String {
    format!(
        "hooks:lock:repository:event:{}",
        event_identity(vcs, repo, uuid)
    )
}

/// Lock key for the event stored at `event_key`
pub fn repository_event_lock_for_key(event_key: &str) -> String {
    let identity = event_key
        .strip_prefix("hooks:events:repository:")
        .unwrap_or(event_key);
    format!("hooks:lock:repository:event:{}", identity)
}

/// Lower-cased `project-workflow-uuid`
pub fn outgoing_identity(project: &str, workflow: &str, uuid: &str) -> String {
    format!("{}-{}-{}", project, workflow, uuid).to_lowercase()
}

pub fn outgoing_event(project: &str, workflow: &str, uuid: &str) -> String {
    format!(
        "hooks:events:outgoing:{}",
        outgoing_identity(project, workflow, uuid)
    )
}

/// Index of the outgoing events of one upstream workflow
pub fn outgoing_events_index(project: &str, workflow: &str) -> String {
    format!("hooks:events:outgoing-index:{}-{}", project, workflow).to_lowercase()
}

/// Lock key for the outgoing event stored at `event_key`
pub fn outgoing_event_lock_for_key(event_key: &str) -> String {
    let identity = event_key
        .strip_prefix("hooks:events:outgoing:")
        .unwrap_or(event_key);
    format!("hooks:lock:outgoing:event:{}", identity)
}

/// Set of scheduler definitions of one workflow
pub fn scheduler_definitions(vcs: &str, repo: &str, workflow: &str) -> String {
    format!("hooks:scheduler:definitions:{}-{}-{}", vcs, repo, workflow).to_lowercase()
}

pub fn scheduler_definition(hook_id: &str) -> String {
    format!("hooks:scheduler:definition:{}", hook_id)
}

pub fn scheduler_execution(hook_id: &str) -> String {
    format!("hooks:scheduler:execution:{}", hook_id)
}

pub fn scheduler_lock(hook_id: &str) -> String {
    format!("hooks:lock:scheduler:{}", hook_id)
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
