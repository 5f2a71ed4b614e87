// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hk_adapters::{
    AnalysisAdapter, ApiClient, ApiError, HookResolver, SigningKeyAdapter, WorkflowRunAdapter,
};
use hk_core::{Clock, SystemClock};
use hk_engine::{Runtime, RuntimeConfig, RuntimeDeps, RuntimeError};
use hk_storage::{MemoryStore, Store, TracedStore};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::env;

/// Daemon runtime with concrete collaborator types
pub type DaemonRuntime = Runtime<
    TracedStore<MemoryStore>,
    ApiClient,
    ApiClient,
    ApiClient,
    ApiClient,
    SystemClock,
>;

/// Default platform API request timeout
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of dispatch workers
const DEFAULT_WORKERS: usize = 4;

/// Errors during daemon startup
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("{0} must be set")]
    MissingSetting(&'static str),

    #[error("invalid {name}={value:?}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("api client: {0}")]
    Api(#[from] ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/hk)
    pub state_dir: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub api_url: String,
    pub api_token: String,
    pub api_timeout: Duration,
    /// Number of dispatch loops
    pub workers: usize,
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Load configuration from `HK_*` variables, with engine defaults for
    /// anything unset.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let defaults = RuntimeConfig::default();

        let runtime = RuntimeConfig {
            retry_error: env::retry_error()?.unwrap_or(defaults.retry_error),
            retry_delay: env::retry_delay()?.unwrap_or(defaults.retry_delay),
            dequeue_timeout: positive(
                "HK_DEQUEUE_TIMEOUT_MS",
                env::dequeue_timeout()?.unwrap_or(defaults.dequeue_timeout),
            )?,
            lock_ttl: positive("HK_LOCK_TTL", env::lock_ttl()?.unwrap_or(defaults.lock_ttl))?,
            scheduler_tick: positive(
                "HK_SCHEDULER_TICK",
                env::scheduler_tick()?.unwrap_or(defaults.scheduler_tick),
            )?,
            recovery_interval: positive(
                "HK_RECOVERY_INTERVAL",
                env::recovery_interval()?.unwrap_or(defaults.recovery_interval),
            )?,
            ..defaults
        };
        if runtime.retry_error == 0 {
            return Err(LifecycleError::InvalidSetting {
                name: "HK_RETRY_ERROR",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let workers = env::workers()?.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(LifecycleError::InvalidSetting {
                name: "HK_WORKERS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            log_path: state_dir.join("hkd.log"),
            api_url: env::api_url()?,
            api_token: env::api_token().unwrap_or_default(),
            api_timeout: env::api_timeout()?.unwrap_or(DEFAULT_API_TIMEOUT),
            workers,
            runtime,
            state_dir,
        })
    }
}

/// Intervals feed `tokio::time::interval` and queue waits, so zero is refused
fn positive(name: &'static str, value: Duration) -> Result<Duration, LifecycleError> {
    if value.is_zero() {
        return Err(LifecycleError::InvalidSetting {
            name,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Build the runtime against the platform API.
pub fn startup(config: &Config) -> Result<Arc<DaemonRuntime>, LifecycleError> {
    let api = ApiClient::new(&config.api_url, &config.api_token, config.api_timeout)?;
    let runtime = Runtime::new(
        RuntimeDeps {
            store: TracedStore::new(MemoryStore::new()),
            hooks: api.clone(),
            analysis: api.clone(),
            signing: api.clone(),
            workflows: api,
        },
        SystemClock,
        config.runtime.clone(),
    );
    info!(api = %config.api_url, workers = config.workers, "runtime ready");
    Ok(Arc::new(runtime))
}

/// How a background task ended
pub type TaskExit = (String, Result<(), RuntimeError>);

/// Spawn `workers` dispatch loops plus the cascade, scheduler, recovery
/// and maintenance tasks. Every task stops once `cancel` fires.
pub fn spawn_tasks<S, H, A, K, W, C>(
    runtime: &Arc<Runtime<S, H, A, K, W, C>>,
    workers: usize,
    cancel: &CancellationToken,
) -> JoinSet<TaskExit>
where
    S: Store,
    H: HookResolver,
    A: AnalysisAdapter,
    K: SigningKeyAdapter,
    W: WorkflowRunAdapter,
    C: Clock,
{
    let mut tasks = JoinSet::new();

    for worker in 0..workers {
        let rt = Arc::clone(runtime);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            (format!("dispatch-{worker}"), rt.run_dispatch_loop(cancel).await)
        });
    }

    let rt = Arc::clone(runtime);
    let c = cancel.clone();
    tasks.spawn(async move { ("cascade".to_string(), rt.run_cascade_loop(c).await) });

    let rt = Arc::clone(runtime);
    let c = cancel.clone();
    tasks.spawn(async move { ("scheduler".to_string(), rt.run_scheduler_loop(c).await) });

    let rt = Arc::clone(runtime);
    let c = cancel.clone();
    tasks.spawn(async move { ("recovery".to_string(), rt.run_recovery_loop(c).await) });

    let rt = Arc::clone(runtime);
    let c = cancel.clone();
    tasks.spawn(async move {
        ("maintenance".to_string(), rt.run_maintenance_listener(c).await)
    });

    tasks
}

/// Log how a task ended.
pub fn report_exit(exit: Result<TaskExit, tokio::task::JoinError>) {
    match exit {
        Ok((name, Ok(()))) => info!(task = %name, "task stopped"),
        Ok((name, Err(e))) => error!(task = %name, error = %e, "task failed"),
        Err(e) => error!(error = %e, "task aborted"),
    }
}

/// Cancel every task and wait for all of them.
pub async fn shutdown(cancel: &CancellationToken, mut tasks: JoinSet<TaskExit>) {
    cancel.cancel();
    while let Some(exit) = tasks.join_next().await {
        report_exit(exit);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
