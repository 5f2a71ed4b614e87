// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-step lifecycle transitions

use super::*;
use crate::TransitionError;
use hk_adapters::{AnalysisCall, SigningCall};
use hk_core::test_support::{
    manual_event, pull_request_event, push_event, repository_hook, scheduler_hook,
    workflow_run_hook, TEST_REPO, TEST_VCS,
};
use hk_core::{
    AnalysisStatus, EventName, EventStatus, HookStatus, HookType, WebhookTrigger, WorkflowHook,
};

fn webhook_event(uuid: &str, hook_id: &str) -> HookRepositoryEvent {
    let mut event = push_event(uuid, "main", "abc");
    event.event_name = EventName::Webhook;
    event.extracted_data.webhook = Some(WebhookTrigger {
        hook_id: hook_id.into(),
    });
    event
}

fn webhook_hook(id: &str, workflow: &str) -> WorkflowHook {
    WorkflowHook::new(id, HookType::Webhook, "PROJ", workflow).on_repository(TEST_VCS, TEST_REPO)
}

/// Advance until the event finishes or suspends
async fn run_to_rest(ctx: &TestContext, event: &mut HookRepositoryEvent) -> Step {
    for _ in 0..10 {
        let step = ctx.runtime.advance(event).await.unwrap();
        if step == Step::Suspend || event.is_terminal() {
            return step;
        }
    }
    panic!("event did not come to rest: {:?}", event.status);
}

// ── Scheduled ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn push_goes_through_analysis() {
    let ctx = setup();
    let mut event = push_event("e-1", "main", "abc");

    let step = ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(step, Step::Continue);
    assert_eq!(event.status, EventStatus::Analysis);
}

#[tokio::test]
async fn pull_request_skips_analysis() {
    let ctx = setup();
    let mut event = pull_request_event("e-1", "main", "abc");

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::WorkflowHooks);
}

#[tokio::test]
async fn stopped_repository_is_skipped() {
    let ctx = setup();
    ctx.hooks.stop_repository(TEST_VCS, TEST_REPO);
    let mut event = push_event("e-1", "main", "abc");

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Skipped);
    assert!(event.last_error.contains("stopped"));
}

#[tokio::test]
async fn scheduled_keeps_error_count() {
    let ctx = setup();
    let mut event = push_event("e-1", "main", "abc");
    event.record_error("boom");

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.nb_errors, 1);
    assert!(event.last_error.is_empty());
}

#[tokio::test]
async fn manual_trigger_user_is_copied() {
    let ctx = setup();
    let mut event = manual_event("e-1", "deploy", "u-7");

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.user_id, "u-7");
    assert_eq!(event.username, "user-u-7");
}

#[tokio::test]
async fn unavailable_hook_service_is_a_transition_error() {
    let ctx = setup();
    ctx.hooks.set_unavailable(true);
    let mut event = push_event("e-1", "main", "abc");

    let err = ctx.runtime.advance(&mut event).await.unwrap_err();

    assert!(matches!(err, TransitionError::Hook(_)));
    assert_eq!(event.status, EventStatus::Scheduled);
}

// ── Analysis ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_analysed_project_goes_to_hooks() {
    let ctx = setup();
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::Analysis;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::WorkflowHooks);
    assert!(event.analyses.is_empty());
}

#[tokio::test]
async fn succeeded_analysis_goes_to_hooks() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ"]);
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::Analysis;

    let step = ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(step, Step::Continue);
    assert_eq!(event.status, EventStatus::WorkflowHooks);
    assert_eq!(event.analyses.len(), 1);
    assert_eq!(event.analyses[0].status, Some(AnalysisStatus::Succeed));
}

#[tokio::test]
async fn pending_analysis_suspends_and_is_polled_not_relaunched() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ", "LIB"]);
    ctx.analysis.start_with("LIB", AnalysisStatus::InProgress);
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::Analysis;

    assert_eq!(ctx.runtime.advance(&mut event).await.unwrap(), Step::Suspend);
    assert_eq!(event.status, EventStatus::Analysis);

    ctx.analysis.complete("analysis-LIB-abc", AnalysisStatus::Failed);
    assert_eq!(ctx.runtime.advance(&mut event).await.unwrap(), Step::Continue);

    assert_eq!(event.status, EventStatus::WorkflowHooks);
    assert_eq!(ctx.analysis.started("PROJ"), 1);
    assert_eq!(ctx.analysis.started("LIB"), 1);
    assert!(ctx.analysis.calls().contains(&AnalysisCall::Get {
        project: "LIB".to_string(),
        analysis_id: "analysis-LIB-abc".to_string(),
    }));
}

#[tokio::test]
async fn reentering_analysis_does_not_relaunch() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ"]);
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::Analysis;
    ctx.runtime.advance(&mut event).await.unwrap();
    assert_eq!(event.status, EventStatus::WorkflowHooks);

    // Same state again converges without a second launch
    event.status = EventStatus::Analysis;
    ctx.runtime.advance(&mut event).await.unwrap();
    assert_eq!(ctx.analysis.started("PROJ"), 1);
}

// ── WorkflowHooks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_matching_hooks_is_done() {
    let ctx = setup();
    let mut event = pull_request_event("e-1", "main", "abc");
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Done);
}

#[tokio::test]
async fn repository_hooks_are_resolved_then_signed() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    ctx.hooks.add_hook(repository_hook("h-2", "test"));
    let mut event = pull_request_event("e-1", "main", "abc");
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::SignKey);
    assert_eq!(event.workflow_hooks.len(), 2);
}

#[tokio::test]
async fn resolved_hooks_are_not_resolved_again() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    let mut event = pull_request_event("e-1", "main", "abc");
    event.status = EventStatus::WorkflowHooks;
    ctx.runtime.advance(&mut event).await.unwrap();

    ctx.hooks.add_hook(repository_hook("h-2", "test"));
    event.status = EventStatus::WorkflowHooks;
    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.workflow_hooks.len(), 1);
}

#[tokio::test]
async fn webhook_goes_straight_to_workflow() {
    let ctx = setup();
    ctx.hooks.add_hook(webhook_hook("h-1", "deploy"));
    let mut event = webhook_event("e-1", "h-1");
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Workflow);
    assert_eq!(event.workflow_hooks[0].workflow_name, "deploy");
}

#[tokio::test]
async fn deleted_webhook_hook_is_skipped() {
    let ctx = setup();
    let mut event = webhook_event("e-1", "h-gone");
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Skipped);
    assert_eq!(event.last_error, "hook h-gone is missing or disabled");
}

#[tokio::test]
async fn disabled_workflow_run_hook_is_skipped() {
    let ctx = setup();
    let mut hook = workflow_run_hook("h-1", "deploy", "build");
    hook.disabled = true;
    ctx.hooks.add_hook(hook.clone());
    let mut event = pull_request_event("e-1", "main", "abc");
    event.event_name = EventName::WorkflowRun;
    event.extracted_data.workflow_run = Some(hk_core::WorkflowRunTrigger {
        outgoing_uuid: "o-1".to_string(),
        hook,
        upstream_project: "PROJ".to_string(),
        upstream_workflow: "build".to_string(),
        upstream_run_id: "r-1".to_string(),
        upstream_run_number: 1,
        upstream_status: "Success".to_string(),
    });
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Skipped);
}

#[tokio::test]
async fn scheduler_event_without_trigger_is_skipped() {
    let ctx = setup();
    ctx.hooks.add_hook(scheduler_hook("h-1", "nightly", "0 0 * * *"));
    let mut event = push_event("e-1", "main", "abc");
    event.event_name = EventName::Scheduler;
    event.status = EventStatus::WorkflowHooks;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Skipped);
}

// ── SignKey ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn known_user_skips_signing() {
    let ctx = setup();
    let mut event = manual_event("e-1", "deploy", "u-7");
    event.user_id = "u-7".to_string();
    event.status = EventStatus::SignKey;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Workflow);
    assert!(ctx.signing.calls().is_empty());
}

#[tokio::test]
async fn verified_signer_is_recorded() {
    let ctx = setup();
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::SignKey;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Workflow);
    assert_eq!(event.sign_key, "key-1");
    assert_eq!(event.signing_key_operation, "op-1");
}

#[tokio::test]
async fn unverified_signer_is_skipped() {
    let ctx = setup();
    ctx.signing.resolve_to("key-9", false);
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::SignKey;

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Skipped);
    assert_eq!(event.last_error, "commit abc is not signed by a verified key");
}

#[tokio::test]
async fn pending_operation_is_polled_not_restarted() {
    let ctx = setup();
    ctx.signing.pending_for(1);
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::SignKey;

    assert_eq!(ctx.runtime.advance(&mut event).await.unwrap(), Step::Suspend);
    assert_eq!(ctx.runtime.advance(&mut event).await.unwrap(), Step::Continue);

    let starts = ctx
        .signing
        .calls()
        .iter()
        .filter(|c| matches!(c, SigningCall::Start { .. }))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(event.status, EventStatus::Workflow);
}

#[tokio::test]
async fn failed_operation_is_dropped_for_the_retry() {
    let ctx = setup();
    ctx.signing.fail_with("gpg exploded");
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::SignKey;

    let err = ctx.runtime.advance(&mut event).await.unwrap_err();

    assert!(matches!(err, TransitionError::SigningOperation(ref m) if m == "gpg exploded"));
    assert!(event.signing_key_operation.is_empty());
    assert_eq!(event.status, EventStatus::SignKey);
}

// ── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn key_owner_triggers_the_runs() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    let mut event = push_event("e-1", "main", "abc");

    run_to_rest(&ctx, &mut event).await;

    assert_eq!(event.status, EventStatus::Done);
    assert_eq!(event.user_id, "u-1");
    let runs = ctx.workflows.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].username, "alice");
    assert_eq!(runs[0].hook_event_uuid, "e-1");
    assert_eq!(event.workflow_hooks[0].run_id, "run-build-1");
    assert_eq!(event.workflow_hooks[0].status, HookStatus::Done);
}

#[tokio::test]
async fn partial_trigger_failure_only_retries_the_failed_run() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    ctx.hooks.add_hook(repository_hook("h-2", "test"));
    ctx.workflows.fail("test", 1);
    let mut event = pull_request_event("e-1", "main", "abc");
    event.user_id = "u-1".to_string();
    event.status = EventStatus::WorkflowHooks;
    ctx.runtime.advance(&mut event).await.unwrap();
    ctx.runtime.advance(&mut event).await.unwrap();

    let err = ctx.runtime.advance(&mut event).await.unwrap_err();
    assert!(matches!(err, TransitionError::Workflow(ref m) if m.contains("test")));
    assert_eq!(event.status, EventStatus::Workflow);
    assert_eq!(event.workflow_hooks[1].status, HookStatus::Scheduled);
    assert!(!event.workflow_hooks[1].error.is_empty());

    ctx.runtime.advance(&mut event).await.unwrap();

    assert_eq!(event.status, EventStatus::Done);
    assert_eq!(ctx.workflows.runs_of("build"), 1);
    assert_eq!(ctx.workflows.runs_of("test"), 1);
}

#[tokio::test]
async fn rejected_run_is_skipped_not_retried() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    ctx.hooks.add_hook(repository_hook("h-2", "test"));
    ctx.workflows.reject("test", "400: workflow disabled");
    let mut event = pull_request_event("e-1", "main", "abc");
    event.user_id = "u-1".to_string();

    run_to_rest(&ctx, &mut event).await;

    assert_eq!(event.status, EventStatus::Done);
    assert_eq!(event.nb_errors, 0);
    assert_eq!(event.workflow_hooks[0].status, HookStatus::Done);
    assert_eq!(event.workflow_hooks[1].status, HookStatus::Skipped);
    assert_eq!(event.workflow_hooks[1].error, "400: workflow disabled");
    assert_eq!(ctx.workflows.runs_of("build"), 1);
}

#[tokio::test]
async fn every_run_rejected_skips_the_event() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    ctx.workflows.reject("build", "403: forbidden");
    let mut event = pull_request_event("e-1", "main", "abc");
    event.user_id = "u-1".to_string();

    run_to_rest(&ctx, &mut event).await;

    assert_eq!(event.status, EventStatus::Skipped);
    assert!(ctx.workflows.runs().is_empty());
}

#[tokio::test]
async fn manual_payload_is_forwarded() {
    let ctx = setup();
    let mut event = manual_event("e-1", "deploy", "u-7");
    if let Some(manual) = event.extracted_data.manual.as_mut() {
        manual.payload = serde_json::json!({"env": "prod"});
    }

    run_to_rest(&ctx, &mut event).await;

    let runs = ctx.workflows.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].workflow_name, "deploy");
    assert_eq!(runs[0].user_id, "u-7");
    assert_eq!(runs[0].payload["env"], "prod");
}

#[tokio::test]
async fn terminal_states_do_not_move() {
    let ctx = setup();
    for status in [EventStatus::Done, EventStatus::Skipped, EventStatus::Error] {
        let mut event = push_event("e-1", "main", "abc");
        event.status = status;
        assert_eq!(ctx.runtime.advance(&mut event).await.unwrap(), Step::Suspend);
        assert_eq!(event.status, status);
    }
    assert!(ctx.hooks.calls().is_empty());
}
