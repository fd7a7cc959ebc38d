//! Typed browser task storage wrapper.
//!
//! Task records are stored without their action list; actions live in their
//! own table and are attached on read.

use anyhow::Result;
use webpilot_models::{BrowserAction, BrowserTask, TaskEvent, TaskResult};
use webpilot_storage::RawAction;

use crate::error::TaskError;

/// Typed browser task storage wrapper around webpilot-storage::BrowserTaskStorage.
#[derive(Clone)]
pub struct BrowserTaskStorage {
    inner: webpilot_storage::BrowserTaskStorage,
}

impl BrowserTaskStorage {
    pub fn new(inner: webpilot_storage::BrowserTaskStorage) -> Self {
        Self { inner }
    }

    // ============== Task Operations ==============

    /// Persist a new task
    pub fn insert_task(&self, task: &BrowserTask) -> Result<()> {
        let json_bytes = encode_task(task)?;
        self.inner.put_task_raw(&task.id, task.created_at, &json_bytes)
    }

    /// Get a task by ID, with its actions attached
    pub fn get_task(&self, id: &str) -> Result<Option<BrowserTask>> {
        let Some(bytes) = self.inner.get_task_raw(id)? else {
            return Ok(None);
        };
        let mut task: BrowserTask = serde_json::from_slice(&bytes)?;
        task.actions = self.list_actions(id)?;
        Ok(Some(task))
    }

    /// List tasks newest first
    pub fn list_tasks(&self, offset: usize, limit: usize) -> Result<Vec<BrowserTask>> {
        let tasks = self.inner.list_tasks_page_raw(offset, limit)?;
        let mut result = Vec::with_capacity(tasks.len());
        for (id, bytes) in tasks {
            let mut task: BrowserTask = serde_json::from_slice(&bytes)?;
            task.actions = self.list_actions(&id)?;
            result.push(task);
        }
        Ok(result)
    }

    pub fn count_tasks(&self) -> Result<u64> {
        self.inner.count_tasks()
    }

    /// Apply `update` to the stored task inside one write transaction.
    ///
    /// When `actions` is given the task's action records are replaced in the
    /// same transaction. An error from `update` aborts without writing.
    pub fn update_task<F>(
        &self,
        id: &str,
        actions: Option<&[BrowserAction]>,
        update: F,
    ) -> Result<Option<BrowserTask>>
    where
        F: FnOnce(&mut BrowserTask) -> Result<()>,
    {
        let raw_actions = actions.map(encode_actions).transpose()?;

        let updated = self
            .inner
            .update_task_raw(id, raw_actions.as_deref(), |bytes| {
                let mut task: BrowserTask = serde_json::from_slice(bytes)?;
                update(&mut task)?;
                encode_task(&task)
            })?;

        let Some(bytes) = updated else {
            return Ok(None);
        };
        let mut task: BrowserTask = serde_json::from_slice(&bytes)?;
        task.actions = match actions {
            Some(actions) => actions.to_vec(),
            None => self.list_actions(id)?,
        };
        Ok(Some(task))
    }

    /// Delete a task together with its actions and events
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        self.inner.delete_task(id)
    }

    /// Actions of the last execution, in execution order
    pub fn list_actions(&self, task_id: &str) -> Result<Vec<BrowserAction>> {
        self.inner
            .list_actions_raw(task_id)?
            .iter()
            .map(|bytes| Ok(serde_json::from_slice(bytes)?))
            .collect()
    }

    // ============== Lifecycle Operations ==============

    /// Move a task to `running` unless it already is.
    ///
    /// The status check and the write happen in one transaction, so two
    /// concurrent calls cannot both succeed.
    pub fn start_execution(&self, id: &str) -> crate::error::Result<BrowserTask> {
        let started = self.update_task(id, None, |task| {
            if task.is_running() {
                return Err(TaskError::conflict("Task is already running").into());
            }
            task.set_running();
            Ok(())
        })?;
        started.ok_or_else(|| TaskError::not_found(id))
    }

    /// Record the outcome of execution `attempt` and its action records.
    ///
    /// Only the attempt that currently owns the task may write. An older
    /// attempt, overtaken by a cancel and re-execute, gets `Conflict` and
    /// nothing is written.
    pub fn finish_execution(
        &self,
        id: &str,
        attempt: u32,
        result: TaskResult,
        actions: &[BrowserAction],
    ) -> crate::error::Result<BrowserTask> {
        let finished = self.update_task(id, Some(actions), |task| {
            ensure_current_attempt(task, attempt)?;
            task.finish(result);
            Ok(())
        })?;
        finished.ok_or_else(|| TaskError::not_found(id))
    }

    /// Best-effort failure write used when the execution path itself broke.
    ///
    /// Leaves recorded actions untouched and keeps a `cancelled` status.
    /// Guarded by `attempt` like [`Self::finish_execution`].
    pub fn mark_failed(
        &self,
        id: &str,
        attempt: u32,
        error: &str,
        execution_time_ms: i64,
    ) -> crate::error::Result<BrowserTask> {
        let failed = self.update_task(id, None, |task| {
            ensure_current_attempt(task, attempt)?;
            task.finish(TaskResult::failure(error, execution_time_ms));
            Ok(())
        })?;
        failed.ok_or_else(|| TaskError::not_found(id))
    }

    // ============== Task Event Operations ==============

    /// Append an event; returns `false` if the task is gone and nothing was
    /// stored
    pub fn add_event(&self, event: &TaskEvent) -> Result<bool> {
        let json_bytes = serde_json::to_vec(event)?;
        self.inner
            .put_event_raw(&event.id, &event.task_id, event.timestamp, &json_bytes)
    }

    /// Events for a task, newest first
    pub fn list_events(&self, task_id: &str) -> Result<Vec<TaskEvent>> {
        let mut events = self
            .inner
            .list_events_raw(task_id)?
            .iter()
            .map(|bytes| Ok(serde_json::from_slice(bytes)?))
            .collect::<Result<Vec<TaskEvent>>>()?;
        events.reverse();
        Ok(events)
    }
}

fn ensure_current_attempt(task: &BrowserTask, attempt: u32) -> Result<()> {
    if task.attempt != attempt {
        return Err(TaskError::conflict(format!(
            "Execution attempt {attempt} was superseded by attempt {}",
            task.attempt
        ))
        .into());
    }
    Ok(())
}

fn encode_task(task: &BrowserTask) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(task)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("actions");
    }
    Ok(serde_json::to_vec(&value)?)
}

fn encode_actions(actions: &[BrowserAction]) -> Result<Vec<RawAction>> {
    actions
        .iter()
        .map(|action| {
            Ok(RawAction {
                id: action.id.clone(),
                order: action.order,
                data: serde_json::to_vec(action)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use tempfile::tempdir;
    use webpilot_models::{ActionType, PlannedAction, TaskEventType, TaskStatus};

    fn setup() -> (BrowserTaskStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(temp_dir.path().join("test.db")).unwrap();
        (storage.tasks, temp_dir)
    }

    fn sample_task() -> BrowserTask {
        BrowserTask::new("Search flights", "search for flights to Tokyo", "https://example.com")
    }

    fn sample_actions(task_id: &str) -> Vec<BrowserAction> {
        vec![
            BrowserAction::from_planned(
                task_id,
                &PlannedAction::new(ActionType::Navigate, "Open", 0).with_value("https://example.com"),
            )
            .with_completed(true),
            BrowserAction::from_planned(
                task_id,
                &PlannedAction::new(ActionType::Click, "Click", 1).with_selector("#go"),
            ),
        ]
    }

    #[test]
    fn test_insert_and_get() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();

        let loaded = storage.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        assert!(storage.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let (storage, _dir) = setup();
        let mut first = sample_task();
        first.created_at = 1_000;
        let mut second = sample_task();
        second.created_at = 2_000;
        storage.insert_task(&first).unwrap();
        storage.insert_task(&second).unwrap();

        let tasks = storage.list_tasks(0, 10).unwrap();
        assert_eq!(tasks[0].id, second.id);
        assert_eq!(tasks[1].id, first.id);
        assert_eq!(storage.list_tasks(1, 10).unwrap().len(), 1);
        assert_eq!(storage.count_tasks().unwrap(), 2);
    }

    #[test]
    fn test_start_execution_is_compare_and_set() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();

        let running = storage.start_execution(&task.id).unwrap();
        assert_eq!(running.status, TaskStatus::Running);
        let before = storage.get_task(&task.id).unwrap().unwrap();

        let error = storage.start_execution(&task.id).unwrap_err();
        assert!(matches!(error, TaskError::Conflict(_)));
        assert_eq!(storage.get_task(&task.id).unwrap().unwrap(), before);

        let missing = storage.start_execution("missing").unwrap_err();
        assert!(matches!(missing, TaskError::NotFound(_)));
    }

    #[test]
    fn test_finish_execution_writes_actions() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();
        let running = storage.start_execution(&task.id).unwrap();
        assert_eq!(running.attempt, 1);

        let result = TaskResult {
            success: true,
            data: None,
            screenshots: None,
            error: None,
            execution_time_ms: 42,
            actions_completed: Some(1),
        };
        let actions = sample_actions(&task.id);
        let finished = storage
            .finish_execution(&task.id, running.attempt, result, &actions)
            .unwrap();
        assert_eq!(finished.status, TaskStatus::Completed);
        assert!(finished.completed_at.is_some());

        let loaded = storage.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded.actions, actions);
        assert_eq!(loaded.result.unwrap().execution_time_ms, 42);
    }

    #[test]
    fn test_mark_failed_keeps_cancelled() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();
        let running = storage.start_execution(&task.id).unwrap();
        storage
            .update_task(&task.id, None, |task| {
                task.status = TaskStatus::Cancelled;
                Ok(())
            })
            .unwrap();

        let failed = storage
            .mark_failed(&task.id, running.attempt, "executor panicked", 5)
            .unwrap();
        assert_eq!(failed.status, TaskStatus::Cancelled);
        assert_eq!(failed.result.unwrap().error.as_deref(), Some("executor panicked"));
    }

    #[test]
    fn test_superseded_attempt_cannot_finish() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();

        let first = storage.start_execution(&task.id).unwrap();
        storage
            .update_task(&task.id, None, |task| {
                task.status = TaskStatus::Cancelled;
                Ok(())
            })
            .unwrap();
        let second = storage.start_execution(&task.id).unwrap();
        assert_eq!(second.attempt, first.attempt + 1);

        let late = TaskResult::failure("late", 9);
        let stale = storage
            .finish_execution(&task.id, first.attempt, late, &sample_actions(&task.id))
            .unwrap_err();
        assert!(matches!(stale, TaskError::Conflict(_)));
        let stale = storage.mark_failed(&task.id, first.attempt, "late", 9).unwrap_err();
        assert!(matches!(stale, TaskError::Conflict(_)));

        let current = storage.get_task(&task.id).unwrap().unwrap();
        assert_eq!(current.status, TaskStatus::Running);
        assert!(current.result.is_none());
        assert!(current.actions.is_empty());
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();

        let result = storage.update_task(&task.id, None, |task| {
            task.name = "changed".to_string();
            anyhow::bail!("rejected")
        });
        assert!(result.is_err());
        assert_eq!(storage.get_task(&task.id).unwrap().unwrap().name, "Search flights");
    }

    #[test]
    fn test_events_newest_first_and_cascade() {
        let (storage, _dir) = setup();
        let task = sample_task();
        storage.insert_task(&task).unwrap();

        let mut created = TaskEvent::new(&task.id, TaskEventType::Created);
        created.timestamp = 1_000;
        let mut started = TaskEvent::new(&task.id, TaskEventType::Started);
        started.timestamp = 2_000;
        storage.add_event(&created).unwrap();
        storage.add_event(&started).unwrap();
        storage
            .update_task(&task.id, Some(sample_actions(&task.id).as_slice()), |_| Ok(()))
            .unwrap();

        let events = storage.list_events(&task.id).unwrap();
        assert_eq!(events[0].event_type, TaskEventType::Started);
        assert_eq!(events[1].event_type, TaskEventType::Created);

        assert!(storage.delete_task(&task.id).unwrap());
        assert!(storage.get_task(&task.id).unwrap().is_none());
        assert!(storage.list_actions(&task.id).unwrap().is_empty());
        assert!(storage.list_events(&task.id).unwrap().is_empty());
        assert!(!storage.add_event(&TaskEvent::new(&task.id, TaskEventType::Completed)).unwrap());
        assert!(storage.list_events(&task.id).unwrap().is_empty());
        assert!(!storage.delete_task(&task.id).unwrap());
    }
}
