//! Task lifecycle controller.
//!
//! Foreground operations (create, read, update, delete, execute request)
//! run here and report `NotFound`, `Conflict` and `Validation` directly to
//! the caller. An execute request only flips the task to `running` and
//! queues a job; the outcome is written by the runner.

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};
use url::Url;
use webpilot_ai::{ActionPlanner, Plan};
use webpilot_models::{BrowserTask, NewTask, TaskEvent, TaskEventType, TaskPatch, TaskStatus};

use super::events::EventRecorder;
use super::runner::{ExecutionJob, ExecutionReport, RunnerHandle};
use crate::error::{Result, TaskError};
use crate::storage::BrowserTaskStorage;

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Pending completion of a queued execution.
///
/// Dropping the handle does not affect the execution.
pub struct ExecutionHandle {
    /// The task as it was right after it entered `running`
    pub task: BrowserTask,
    done: oneshot::Receiver<ExecutionReport>,
}

impl ExecutionHandle {
    pub fn task_id(&self) -> &str {
        &self.task.id
    }

    /// Wait for the job's terminal write
    pub async fn wait(self) -> Result<ExecutionReport> {
        self.done
            .await
            .map_err(|_| TaskError::Internal(anyhow::anyhow!("Execution job was dropped")))
    }
}

pub struct TaskController {
    storage: BrowserTaskStorage,
    runner: RunnerHandle,
    events: EventRecorder,
    planner: Arc<dyn ActionPlanner>,
}

impl TaskController {
    pub fn new(
        storage: BrowserTaskStorage,
        runner: RunnerHandle,
        events: EventRecorder,
        planner: Arc<dyn ActionPlanner>,
    ) -> Self {
        Self {
            storage,
            runner,
            events,
            planner,
        }
    }

    pub async fn create(&self, new_task: NewTask) -> Result<BrowserTask> {
        validate_text("name", &new_task.name)?;
        validate_text("description", &new_task.description)?;
        validate_url(&new_task.url)?;

        let task = BrowserTask::new(new_task.name, new_task.description, new_task.url);
        self.storage.insert_task(&task)?;
        self.events
            .record(TaskEvent::new(&task.id, TaskEventType::Created).with_message("Task created"))
            .await;

        info!(task_id = %task.id, name = %task.name, "Task created");
        Ok(task)
    }

    /// Page through tasks, newest first
    pub fn list(&self, skip: usize, limit: usize) -> Result<Vec<BrowserTask>> {
        if limit > MAX_LIST_LIMIT {
            return Err(TaskError::validation(format!(
                "limit must be at most {MAX_LIST_LIMIT}"
            )));
        }
        Ok(self.storage.list_tasks(skip, limit)?)
    }

    pub fn get(&self, id: &str) -> Result<BrowserTask> {
        self.storage
            .get_task(id)?
            .ok_or_else(|| TaskError::not_found(id))
    }

    /// Apply a partial update.
    ///
    /// Only `pending` and `cancelled` can be set directly; the other
    /// statuses belong to execution. A running task can be cancelled but not
    /// reset to `pending`.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<BrowserTask> {
        if let Some(name) = &patch.name {
            validate_text("name", name)?;
        }
        if let Some(description) = &patch.description {
            validate_text("description", description)?;
        }
        if let Some(url) = &patch.url {
            validate_url(url)?;
        }
        if let Some(status) = patch.status
            && !matches!(status, TaskStatus::Pending | TaskStatus::Cancelled)
        {
            return Err(TaskError::validation(format!(
                "status '{status}' cannot be set directly"
            )));
        }
        if patch.is_empty() {
            return self.get(id);
        }

        let updated = self.storage.update_task(id, None, |task| {
            if patch.status == Some(TaskStatus::Pending) && task.is_running() {
                return Err(TaskError::conflict("Task is running and cannot be reset to pending").into());
            }
            task.apply_fields(&patch);
            if let Some(status) = patch.status {
                task.status = status;
            }
            Ok(())
        })?;
        let task = updated.ok_or_else(|| TaskError::not_found(id))?;

        let event = if patch.status == Some(TaskStatus::Cancelled) {
            TaskEvent::new(id, TaskEventType::Cancelled).with_message("Task cancelled")
        } else {
            TaskEvent::new(id, TaskEventType::Updated).with_message("Task updated")
        };
        self.events
            .record(event.with_data(serde_json::json!({ "status": task.status })))
            .await;

        Ok(task)
    }

    /// Delete a task with its actions and events
    pub fn delete(&self, id: &str) -> Result<()> {
        if !self.storage.delete_task(id)? {
            return Err(TaskError::not_found(id));
        }
        info!(task_id = id, "Task deleted");
        Ok(())
    }

    /// Move the task to `running` and queue its execution.
    ///
    /// Returns as soon as the job is queued. Fails with `Conflict` if the
    /// task is already running, leaving it untouched.
    pub async fn execute(&self, id: &str) -> Result<ExecutionHandle> {
        let task = self.storage.start_execution(id)?;
        self.events
            .record(
                TaskEvent::new(id, TaskEventType::Started)
                    .with_message("Task execution started")
                    .with_data(serde_json::json!({ "attempt": task.attempt })),
            )
            .await;

        let (done_tx, done_rx) = oneshot::channel();
        let job = ExecutionJob {
            task_id: id.to_string(),
            attempt: task.attempt,
            done: Some(done_tx),
        };

        if let Err(enqueue_error) = self.runner.enqueue(job).await {
            error!(task_id = id, error = %enqueue_error, "Failed to queue execution");
            let message = "Execution queue unavailable";
            match self.storage.mark_failed(id, task.attempt, message, 0) {
                Ok(_) => {
                    self.events
                        .record(TaskEvent::new(id, TaskEventType::Failed).with_message(message))
                        .await;
                }
                Err(write_error) => {
                    error!(task_id = id, error = %write_error, "Fallback failure write failed");
                }
            }
            return Err(TaskError::Internal(enqueue_error));
        }

        info!(task_id = id, attempt = task.attempt, "Task execution queued");
        Ok(ExecutionHandle {
            task,
            done: done_rx,
        })
    }

    /// Event log of a task, newest first
    pub fn events(&self, id: &str) -> Result<Vec<TaskEvent>> {
        if self.storage.get_task(id)?.is_none() {
            return Err(TaskError::not_found(id));
        }
        Ok(self.storage.list_events(id)?)
    }

    /// Plan a description without creating a task
    pub async fn analyze(&self, description: &str, url: &str) -> Result<Plan> {
        validate_text("description", description)?;
        validate_url(url)?;
        Ok(self.planner.plan(description, url).await)
    }
}

fn validate_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TaskError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_url(value: &str) -> Result<()> {
    let url = Url::parse(value.trim())
        .map_err(|e| TaskError::validation(format!("url is invalid: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(TaskError::validation("url must be an http(s) address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testkit::{MockExecutor, test_app_core};
    use std::time::Duration;

    fn new_task() -> NewTask {
        NewTask {
            name: "Search flights".to_string(),
            description: "search for flights to Tokyo".to_string(),
            url: "https://example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let controller = &core.controller;

        let mut blank = new_task();
        blank.name = "  ".to_string();
        assert!(matches!(controller.create(blank).await, Err(TaskError::Validation(_))));

        let mut bad_url = new_task();
        bad_url.url = "ftp://example.com".to_string();
        assert!(matches!(controller.create(bad_url).await, Err(TaskError::Validation(_))));

        let task = controller.create(new_task()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        let events = controller.events(&task.id).unwrap();
        assert_eq!(events[0].event_type, TaskEventType::Created);
    }

    #[tokio::test]
    async fn test_execute_running_task_conflicts_without_mutation() {
        let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(50)));
        let (core, _dir) = test_app_core(executor.clone()).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();

        let handle = controller.execute(&task.id).await.unwrap();
        assert_eq!(handle.task.status, TaskStatus::Running);
        let before = controller.get(&task.id).unwrap();

        let second = controller.execute(&task.id).await;
        assert!(matches!(second, Err(TaskError::Conflict(_))));
        assert_eq!(controller.get(&task.id).unwrap(), before);

        let report = handle.wait().await.unwrap();
        assert_eq!(report.status, Some(TaskStatus::Completed));
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_missing_task() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let result = core.controller.execute("missing").await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_result_marks_task_failed() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::failing("navigation timed out"))).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();

        let report = controller.execute(&task.id).await.unwrap().wait().await.unwrap();
        assert!(!report.fallback_used);

        let stored = controller.get(&task.id).unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(
            stored.result.unwrap().error.as_deref(),
            Some("navigation timed out")
        );
    }

    #[tokio::test]
    async fn test_rerun_after_completion() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();

        controller.execute(&task.id).await.unwrap().wait().await.unwrap();
        let report = controller.execute(&task.id).await.unwrap().wait().await.unwrap();
        assert_eq!(report.status, Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_cancel_while_running_is_kept() {
        let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(50)));
        let (core, _dir) = test_app_core(executor).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();

        let handle = controller.execute(&task.id).await.unwrap();
        let reset = controller
            .update(&task.id, TaskPatch { status: Some(TaskStatus::Pending), ..TaskPatch::default() })
            .await;
        assert!(matches!(reset, Err(TaskError::Conflict(_))));

        let cancelled = controller
            .update(&task.id, TaskPatch { status: Some(TaskStatus::Cancelled), ..TaskPatch::default() })
            .await
            .unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        let report = handle.wait().await.unwrap();
        assert_eq!(report.status, Some(TaskStatus::Cancelled));
        let stored = controller.get(&task.id).unwrap();
        assert_eq!(stored.status, TaskStatus::Cancelled);
        assert!(stored.result.is_some());
        assert!(stored.completed_at.is_some());

        let kinds: Vec<_> = controller
            .events(&task.id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert!(kinds.contains(&TaskEventType::Cancelled));
    }

    #[tokio::test]
    async fn test_rerun_after_cancel_owns_the_task() {
        let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(100)));
        let (core, _dir) = test_app_core(executor.clone()).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();
        let cancel = TaskPatch {
            status: Some(TaskStatus::Cancelled),
            ..TaskPatch::default()
        };

        let first = controller.execute(&task.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.update(&task.id, cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = controller.execute(&task.id).await.unwrap();
        assert_eq!(second.task.attempt, first.task.attempt + 1);

        let stale = first.wait().await.unwrap();
        assert_eq!(stale.status, None);
        assert_eq!(controller.get(&task.id).unwrap().status, TaskStatus::Running);
        assert!(matches!(
            controller.execute(&task.id).await,
            Err(TaskError::Conflict(_))
        ));

        let report = second.wait().await.unwrap();
        assert_eq!(report.status, Some(TaskStatus::Completed));
        assert_eq!(executor.call_count(), 2);
        let completed = controller
            .events(&task.id)
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == TaskEventType::Completed)
            .count();
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let controller = &core.controller;
        let task = controller.create(new_task()).await.unwrap();

        let forced = controller
            .update(&task.id, TaskPatch { status: Some(TaskStatus::Completed), ..TaskPatch::default() })
            .await;
        assert!(matches!(forced, Err(TaskError::Validation(_))));

        let renamed = controller
            .update(&task.id, TaskPatch { name: Some("Find hotels".to_string()), ..TaskPatch::default() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Find hotels");
        assert_eq!(renamed.description, task.description);

        let missing = controller
            .update("missing", TaskPatch { name: Some("x".to_string()), ..TaskPatch::default() })
            .await;
        assert!(matches!(missing, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let controller = &core.controller;
        let first = controller.create(new_task()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = controller.create(new_task()).await.unwrap();

        let page = controller.list(0, DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(page[0].id, second.id);
        assert_eq!(page[1].id, first.id);
        assert!(matches!(controller.list(0, MAX_LIST_LIMIT + 1), Err(TaskError::Validation(_))));

        controller.delete(&first.id).unwrap();
        assert!(matches!(controller.get(&first.id), Err(TaskError::NotFound(_))));
        assert!(matches!(controller.delete(&first.id), Err(TaskError::NotFound(_))));
        assert!(matches!(controller.events(&first.id), Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_analyze_offline() {
        let (core, _dir) = test_app_core(Arc::new(MockExecutor::succeeding())).await;
        let plan = core
            .controller
            .analyze("extract data from page", "https://example.com")
            .await
            .unwrap();
        assert_eq!(plan.analysis.task_type, "data_extract");
        assert!(!plan.actions.is_empty());
    }
}
