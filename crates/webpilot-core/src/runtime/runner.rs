//! Background execution runner.
//!
//! Execute requests become jobs on a command channel. The runner runs each
//! job on its own tokio task, bounded by a semaphore, and guarantees that
//! every job ends with a terminal write: the executor's result when the
//! execution path completes, or a fallback `failed` write when it errors or
//! panics.

use anyhow::{Result, anyhow};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use webpilot_models::{TaskEvent, TaskEventType, TaskStatus};

use super::events::EventRecorder;
use super::executor::{TaskExecutor, elapsed_ms};
use crate::error::TaskError;
use crate::storage::BrowserTaskStorage;

/// Configuration for the TaskRunner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum concurrent task executions
    pub max_concurrent_executions: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 4,
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub task_id: String,
    /// Status after the terminal write; `None` if nothing could be written
    pub status: Option<TaskStatus>,
    /// Whether the fallback failure write was needed
    pub fallback_used: bool,
}

/// One queued execution
#[derive(Debug)]
pub struct ExecutionJob {
    pub task_id: String,
    /// Attempt number assigned when the task was moved to `running`
    pub attempt: u32,
    /// Receives the report once the job is done; dropping the receiver is fine
    pub done: Option<oneshot::Sender<ExecutionReport>>,
}

/// Message types for controlling the runner
#[derive(Debug)]
pub enum RunnerCommand {
    Execute(ExecutionJob),
    /// Stop accepting jobs and wait for in-flight ones
    Stop(oneshot::Sender<()>),
}

/// Handle to control a running TaskRunner
#[derive(Clone)]
pub struct RunnerHandle {
    command_tx: mpsc::Sender<RunnerCommand>,
}

impl RunnerHandle {
    pub async fn enqueue(&self, job: ExecutionJob) -> Result<()> {
        self.command_tx
            .send(RunnerCommand::Execute(job))
            .await
            .map_err(|e| anyhow!("Failed to send execute command: {}", e))
    }

    /// Stop the runner once in-flight jobs have finished
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(RunnerCommand::Stop(tx))
            .await
            .map_err(|e| anyhow!("Failed to send stop command: {}", e))?;
        rx.await
            .map_err(|_| anyhow!("Runner stopped without acknowledging"))
    }
}

pub struct TaskRunner {
    storage: BrowserTaskStorage,
    executor: Arc<dyn TaskExecutor>,
    events: EventRecorder,
    config: RunnerConfig,
}

impl TaskRunner {
    pub fn new(
        storage: BrowserTaskStorage,
        executor: Arc<dyn TaskExecutor>,
        events: EventRecorder,
        config: RunnerConfig,
    ) -> Self {
        Self {
            storage,
            executor,
            events,
            config,
        }
    }

    /// Start the runner and return a handle for controlling it
    pub fn start(self: Arc<Self>) -> RunnerHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        tokio::spawn(self.run_loop(command_rx));
        RunnerHandle { command_tx }
    }

    async fn run_loop(self: Arc<Self>, mut command_rx: mpsc::Receiver<RunnerCommand>) {
        let limit = self.config.max_concurrent_executions.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut jobs = JoinSet::new();
        info!(max_concurrent = limit, "TaskRunner started");

        let stop_ack = loop {
            tokio::select! {
                Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(join_error) = joined {
                        error!(error = %join_error, "Runner job aborted");
                    }
                }
                cmd = command_rx.recv() => match cmd {
                    Some(RunnerCommand::Execute(job)) => {
                        debug!(task_id = %job.task_id, "Execution job queued");
                        let runner = self.clone();
                        let semaphore = semaphore.clone();
                        jobs.spawn(async move {
                            let _permit = semaphore.acquire_owned().await.ok();
                            runner.run_job(job).await;
                        });
                    }
                    Some(RunnerCommand::Stop(ack)) => break Some(ack),
                    None => break None,
                }
            }
        };

        drop(command_rx);
        info!(in_flight = jobs.len(), "TaskRunner stopping");
        while let Some(joined) = jobs.join_next().await {
            if let Err(join_error) = joined {
                error!(error = %join_error, "Runner job aborted");
            }
        }
        if let Some(ack) = stop_ack {
            let _ = ack.send(());
        }
        info!("TaskRunner stopped");
    }

    async fn run_job(self: Arc<Self>, job: ExecutionJob) {
        let started = Instant::now();
        let task_id = job.task_id.clone();
        let attempt = job.attempt;

        let runner = self.clone();
        let primary_id = task_id.clone();
        let primary =
            tokio::spawn(async move { runner.execute_and_record(&primary_id, attempt).await });

        let report = match primary.await {
            Ok(Ok(status)) => ExecutionReport {
                task_id: task_id.clone(),
                status,
                fallback_used: false,
            },
            Ok(Err(error)) => {
                error!(task_id = %task_id, error = %error, "Task execution path failed");
                self.fallback(&task_id, attempt, &error.to_string(), started).await
            }
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    format!("Executor panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "Execution was cancelled".to_string()
                };
                error!(task_id = %task_id, error = %message, "Task execution aborted");
                self.fallback(&task_id, attempt, &message, started).await
            }
        };

        if let Some(done) = job.done {
            let _ = done.send(report);
        }
    }

    /// Primary path: reload, execute, write the outcome.
    ///
    /// Action events are recorded only once the terminal write has landed,
    /// so a superseded or deleted attempt leaves nothing in the event log.
    async fn execute_and_record(&self, task_id: &str, attempt: u32) -> Result<Option<TaskStatus>> {
        let Some(task) = self.storage.get_task(task_id)? else {
            warn!(task_id, "Task disappeared before execution, skipping");
            return Ok(None);
        };
        if task.attempt != attempt {
            warn!(task_id, attempt, current = task.attempt, "Execution attempt superseded, skipping");
            return Ok(None);
        }

        let outcome = self.executor.execute(&task).await?;

        let actions = outcome.browser_actions();
        let finished = match self
            .storage
            .finish_execution(task_id, attempt, outcome.result, &actions)
        {
            Ok(task) => task,
            Err(TaskError::NotFound(_)) => {
                warn!(task_id, "Task deleted during execution, discarding result");
                return Ok(None);
            }
            Err(TaskError::Conflict(reason)) => {
                warn!(task_id, attempt, reason = %reason, "Discarding superseded execution result");
                return Ok(None);
            }
            Err(other) => return Err(other.into()),
        };

        for action in &outcome.actions {
            let (event_type, message) = match &action.error {
                None => (TaskEventType::ActionCompleted, action.action.description.clone()),
                Some(error) => (TaskEventType::ActionFailed, error.clone()),
            };
            let event = TaskEvent::new(task_id, event_type)
                .with_message(message)
                .with_data(serde_json::json!({
                    "action": action.action.action_type,
                    "order": action.action.order,
                    "selector": action.action.selector,
                }))
                .with_duration(action.duration_ms);
            self.events.record(event).await;
        }

        let result = finished.result.as_ref();
        let success = result.is_some_and(|r| r.success);
        let duration = result.map(|r| r.execution_time_ms).unwrap_or_default();
        let mut event = if success {
            TaskEvent::new(task_id, TaskEventType::Completed).with_message("Task execution completed")
        } else {
            let error = result
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| "Task execution failed".to_string());
            TaskEvent::new(task_id, TaskEventType::Failed).with_message(error)
        };
        event = event
            .with_duration(duration)
            .with_data(serde_json::json!({ "status": finished.status, "attempt": attempt }));
        self.events.record(event).await;

        info!(task_id, attempt, status = %finished.status, elapsed_ms = duration, "Task finished");
        Ok(Some(finished.status))
    }

    /// Best-effort failure write. Its own failure is only logged.
    async fn fallback(
        &self,
        task_id: &str,
        attempt: u32,
        message: &str,
        started: Instant,
    ) -> ExecutionReport {
        let elapsed = elapsed_ms(started);
        match self.storage.mark_failed(task_id, attempt, message, elapsed) {
            Ok(task) => {
                let event = TaskEvent::new(task_id, TaskEventType::Failed)
                    .with_message(message)
                    .with_duration(elapsed)
                    .with_data(serde_json::json!({ "status": task.status, "fallback": true }));
                self.events.record(event).await;
                ExecutionReport {
                    task_id: task_id.to_string(),
                    status: Some(task.status),
                    fallback_used: true,
                }
            }
            Err(TaskError::Conflict(reason)) => {
                warn!(task_id, attempt, reason = %reason, "Skipping fallback for superseded attempt");
                ExecutionReport {
                    task_id: task_id.to_string(),
                    status: None,
                    fallback_used: true,
                }
            }
            Err(error) => {
                error!(task_id, error = %error, "Fallback failure write failed");
                ExecutionReport {
                    task_id: task_id.to_string(),
                    status: None,
                    fallback_used: true,
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
