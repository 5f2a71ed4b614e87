// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hk_adapters::{
    FakeAnalysisAdapter, FakeHookResolver, FakeSigningKeyAdapter, FakeWorkflowRunAdapter,
};
use hk_core::test_support::{push_event, repository_hook};
use hk_core::{EventStatus, FakeClock};
use serial_test::serial;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "HK_STATE_DIR",
    "HK_API_URL",
    "HK_API_TOKEN",
    "HK_API_TIMEOUT",
    "HK_RETRY_ERROR",
    "HK_RETRY_DELAY",
    "HK_SCHEDULER_TICK",
    "HK_DEQUEUE_TIMEOUT_MS",
    "HK_RECOVERY_INTERVAL",
    "HK_WORKERS",
    "HK_LOCK_TTL",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

fn base_env(dir: &TempDir) {
    clear_env();
    std::env::set_var("HK_STATE_DIR", dir.path());
    std::env::set_var("HK_API_URL", "http://localhost:8080/api");
}

#[test]
#[serial]
fn load_uses_engine_defaults() {
    let dir = TempDir::new().unwrap();
    base_env(&dir);

    let config = Config::load().unwrap();

    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.log_path, dir.path().join("hkd.log"));
    assert_eq!(config.workers, DEFAULT_WORKERS);
    assert_eq!(config.api_timeout, DEFAULT_API_TIMEOUT);
    assert_eq!(config.api_token, "");
    assert_eq!(config.runtime.retry_error, 3);
    assert_eq!(config.runtime.retry_delay, Duration::from_secs(60));
    clear_env();
}

#[test]
#[serial]
fn load_applies_overrides() {
    let dir = TempDir::new().unwrap();
    base_env(&dir);
    std::env::set_var("HK_API_TOKEN", "secret");
    std::env::set_var("HK_RETRY_ERROR", "5");
    std::env::set_var("HK_RETRY_DELAY", "2m");
    std::env::set_var("HK_SCHEDULER_TICK", "1s");
    std::env::set_var("HK_DEQUEUE_TIMEOUT_MS", "100");
    std::env::set_var("HK_WORKERS", "8");
    std::env::set_var("HK_LOCK_TTL", "10s");

    let config = Config::load().unwrap();

    assert_eq!(config.api_token, "secret");
    assert_eq!(config.workers, 8);
    assert_eq!(config.runtime.retry_error, 5);
    assert_eq!(config.runtime.retry_delay, Duration::from_secs(120));
    assert_eq!(config.runtime.scheduler_tick, Duration::from_secs(1));
    assert_eq!(config.runtime.dequeue_timeout, Duration::from_millis(100));
    assert_eq!(config.runtime.lock_ttl, Duration::from_secs(10));
    clear_env();
}

#[test]
#[serial]
fn load_requires_api_url() {
    let dir = TempDir::new().unwrap();
    base_env(&dir);
    std::env::remove_var("HK_API_URL");

    assert!(matches!(
        Config::load(),
        Err(LifecycleError::MissingSetting("HK_API_URL"))
    ));
    clear_env();
}

#[yare::parameterized(
    scheduler_tick = { "HK_SCHEDULER_TICK", "0s" },
    recovery_interval = { "HK_RECOVERY_INTERVAL", "0" },
    dequeue_timeout = { "HK_DEQUEUE_TIMEOUT_MS", "0" },
    workers = { "HK_WORKERS", "0" },
    retry_error = { "HK_RETRY_ERROR", "0" },
)]
#[serial]
fn load_rejects_zero(var: &str, value: &str) {
    let dir = TempDir::new().unwrap();
    base_env(&dir);
    std::env::set_var(var, value);

    let err = Config::load().unwrap_err();

    assert!(
        matches!(err, LifecycleError::InvalidSetting { name, .. } if name == var),
        "unexpected error: {err}"
    );
    clear_env();
}

#[test]
fn startup_rejects_bad_api_url() {
    let config = Config {
        state_dir: PathBuf::from("/tmp/hk"),
        log_path: PathBuf::from("/tmp/hk/hkd.log"),
        api_url: "not a url".to_string(),
        api_token: String::new(),
        api_timeout: DEFAULT_API_TIMEOUT,
        workers: 1,
        runtime: RuntimeConfig::default(),
    };

    assert!(matches!(startup(&config), Err(LifecycleError::Api(_))));
}

type TestRuntime = Runtime<
    MemoryStore,
    FakeHookResolver,
    FakeAnalysisAdapter,
    FakeSigningKeyAdapter,
    FakeWorkflowRunAdapter,
    FakeClock,
>;

fn test_runtime(hooks: FakeHookResolver, workflows: FakeWorkflowRunAdapter) -> Arc<TestRuntime> {
    Arc::new(Runtime::new(
        RuntimeDeps {
            store: MemoryStore::new(),
            hooks,
            analysis: FakeAnalysisAdapter::new(),
            signing: FakeSigningKeyAdapter::new(),
            workflows,
        },
        FakeClock::new(),
        RuntimeConfig {
            dequeue_timeout: Duration::from_millis(10),
            lock_retry_interval: Duration::from_millis(1),
            scheduler_tick: Duration::from_millis(10),
            recovery_interval: Duration::from_millis(10),
            ..RuntimeConfig::default()
        },
    ))
}

#[tokio::test]
async fn spawned_tasks_process_events_and_stop_on_cancel() {
    let hooks = FakeHookResolver::new();
    hooks.add_hook(repository_hook("h-1", "build"));
    let workflows = FakeWorkflowRunAdapter::new();
    let runtime = test_runtime(hooks, workflows.clone());
    let event = push_event("e-1", "main", "abc");
    runtime.events().create_and_enqueue(&event).await.unwrap();
    let cancel = CancellationToken::new();

    let mut tasks = spawn_tasks(&runtime, 2, &cancel);

    tokio::time::timeout(Duration::from_secs(5), async {
        while runtime.events().get(&event.key()).await.unwrap().map(|e| e.status)
            != Some(EventStatus::Done)
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(workflows.runs_of("build"), 1);

    cancel.cancel();
    let mut names = Vec::new();
    while let Some(exit) = tasks.join_next().await {
        let (name, result) = exit.unwrap();
        assert!(result.is_ok(), "{name} failed");
        names.push(name);
    }
    names.sort();
    assert_eq!(
        names,
        vec![
            "cascade",
            "dispatch-0",
            "dispatch-1",
            "maintenance",
            "recovery",
            "scheduler"
        ]
    );
}

#[tokio::test]
async fn shutdown_joins_every_task() {
    let runtime = test_runtime(FakeHookResolver::new(), FakeWorkflowRunAdapter::new());
    let cancel = CancellationToken::new();
    let tasks = spawn_tasks(&runtime, 3, &cancel);

    tokio::time::timeout(Duration::from_secs(5), shutdown(&cancel, tasks))
        .await
        .unwrap();

    assert!(cancel.is_cancelled());
}
