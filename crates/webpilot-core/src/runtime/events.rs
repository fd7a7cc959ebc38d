//! Task event fan-out.
//!
//! Every lifecycle transition is written to the task's event log and then
//! published to in-process subscribers (the WebSocket stream).

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use webpilot_models::TaskEvent;

use crate::storage::BrowserTaskStorage;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receives task events as they happen
#[async_trait]
pub trait TaskEventEmitter: Send + Sync {
    async fn emit(&self, event: &TaskEvent);
}

/// Emitter that drops every event
pub struct NoopEventEmitter;

#[async_trait]
impl TaskEventEmitter for NoopEventEmitter {
    async fn emit(&self, _event: &TaskEvent) {}
}

/// Publishes events on a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastEventEmitter {
    sender: broadcast::Sender<TaskEvent>,
}

impl BroadcastEventEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskEventEmitter for BroadcastEventEmitter {
    async fn emit(&self, event: &TaskEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event.clone());
    }
}

/// Persists an event, then hands it to the emitter.
///
/// Recording never fails the caller: a storage error is logged and the
/// event is still emitted. Events for deleted tasks are emitted but not
/// stored.
#[derive(Clone)]
pub struct EventRecorder {
    storage: BrowserTaskStorage,
    emitter: std::sync::Arc<dyn TaskEventEmitter>,
}

impl EventRecorder {
    pub fn new(storage: BrowserTaskStorage, emitter: std::sync::Arc<dyn TaskEventEmitter>) -> Self {
        Self { storage, emitter }
    }

    pub async fn record(&self, event: TaskEvent) {
        match self.storage.add_event(&event) {
            Ok(true) => {}
            Ok(false) => debug!(
                task_id = %event.task_id,
                event_type = ?event.event_type,
                "Task no longer exists, event not persisted"
            ),
            Err(error) => warn!(
                task_id = %event.task_id,
                event_type = ?event.event_type,
                error = %error,
                "Failed to persist task event"
            ),
        }
        self.emitter.emit(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testkit::create_test_storage;
    use std::sync::Arc;
    use webpilot_models::{BrowserTask, TaskEventType};

    #[tokio::test]
    async fn test_record_persists_and_broadcasts() {
        let (storage, _dir) = create_test_storage();
        let task = BrowserTask::new("t", "d", "https://example.com");
        storage.tasks.insert_task(&task).unwrap();

        let emitter = Arc::new(BroadcastEventEmitter::new());
        let mut rx = emitter.subscribe();
        let recorder = EventRecorder::new(storage.tasks.clone(), emitter);

        recorder
            .record(TaskEvent::new(&task.id, TaskEventType::Started).with_message("started"))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, TaskEventType::Started);
        assert_eq!(storage.tasks.list_events(&task.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_event_for_deleted_task_is_not_stored() {
        let (storage, _dir) = create_test_storage();
        let task = BrowserTask::new("t", "d", "https://example.com");
        storage.tasks.insert_task(&task).unwrap();
        storage.tasks.delete_task(&task.id).unwrap();

        let emitter = Arc::new(BroadcastEventEmitter::new());
        let mut rx = emitter.subscribe();
        let recorder = EventRecorder::new(storage.tasks.clone(), emitter);
        recorder
            .record(TaskEvent::new(&task.id, TaskEventType::ActionCompleted))
            .await;

        assert_eq!(rx.recv().await.unwrap().event_type, TaskEventType::ActionCompleted);
        assert!(storage.tasks.list_events(&task.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let emitter = BroadcastEventEmitter::new();
        emitter.emit(&TaskEvent::new("t", TaskEventType::Created)).await;
    }
}
