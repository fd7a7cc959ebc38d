//! Test utilities for deterministic lifecycle tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::time::{Duration, sleep};
use webpilot_ai::AiPlanner;
use webpilot_browser::mock::{MockLauncher, MockPageDriver};
use webpilot_browser::{BrowserConfig, BrowserService};
use webpilot_models::{ActionType, BrowserAction, BrowserTask, PlannedAction, TaskResult};

use crate::AppCore;
use crate::config::AppConfig;
use crate::runtime::executor::{ActionOutcome, ExecutionOutcome, TaskExecutor};
use crate::storage::Storage;

/// Creates a temporary storage instance for tests.
pub fn create_test_storage() -> (Arc<Storage>, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = temp_dir.path().join("webpilot-test.db");
    (
        Arc::new(Storage::new(db_path).expect("failed to init storage")),
        temp_dir,
    )
}

/// Browser service backed by a mock page driver.
pub fn mock_browser(driver: MockPageDriver) -> Arc<BrowserService> {
    Arc::new(BrowserService::with_launcher(
        BrowserConfig::default(),
        Arc::new(MockLauncher::new(driver)),
    ))
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Succeed,
    Fail(String),
    Error(String),
    Panic,
}

/// Scripted executor.
///
/// Successful runs report one completed navigate action.
pub struct MockExecutor {
    behavior: MockBehavior,
    delay: Duration,
    calls: AtomicU32,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockExecutor {
    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_behavior(MockBehavior::Succeed)
    }

    /// Returns an unsuccessful result, as a browser failure would
    pub fn failing(error: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(error.into()))
    }

    /// Returns `Err`, as a broken execution path would
    pub fn erroring(error: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Error(error.into()))
    }

    pub fn panicking() -> Self {
        Self::with_behavior(MockBehavior::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of executions observed at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, task: &BrowserTask) -> Result<ExecutionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Succeed => {
                let planned = PlannedAction::new(ActionType::Navigate, "Open target", 0)
                    .with_value(task.url.clone());
                let result = TaskResult {
                    success: true,
                    data: None,
                    screenshots: None,
                    error: None,
                    execution_time_ms: 1,
                    actions_completed: Some(1),
                };
                Ok(ExecutionOutcome {
                    result,
                    actions: vec![ActionOutcome {
                        action: BrowserAction::from_planned(&task.id, &planned).with_completed(true),
                        error: None,
                        duration_ms: 1,
                    }],
                })
            }
            MockBehavior::Fail(error) => Ok(ExecutionOutcome {
                result: TaskResult::failure(error.clone(), 1),
                actions: Vec::new(),
            }),
            MockBehavior::Error(error) => bail!("{error}"),
            MockBehavior::Panic => panic!("mock executor panic for task {}", task.id),
        }
    }
}

/// Application core over temporary storage, a mock browser and an offline
/// planner, driven by `executor`.
pub async fn test_app_core(executor: Arc<dyn TaskExecutor>) -> (Arc<AppCore>, tempfile::TempDir) {
    let (storage, temp_dir) = create_test_storage();
    let core = AppCore::with_components(
        AppConfig::default(),
        storage,
        mock_browser(MockPageDriver::new()),
        Arc::new(AiPlanner::offline()),
        executor,
    );
    (Arc::new(core), temp_dir)
}
