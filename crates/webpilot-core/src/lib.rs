pub mod config;
pub mod error;
pub mod http;
pub mod paths;
pub mod runtime;
pub mod storage;

pub use webpilot_models as models;

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use webpilot_ai::{ActionPlanner, AiPlanner, KeywordPlanner, create_inference_client};
use webpilot_browser::BrowserService;
use webpilot_models::TaskEvent;

use config::{AppConfig, PlanSource};
use runtime::{
    BroadcastEventEmitter, BrowserTaskExecutor, EventRecorder, RunnerConfig, RunnerHandle,
    TaskController, TaskExecutor, TaskRunner,
};
use storage::Storage;

/// Core application state shared by the HTTP layer and the binary
///
/// Built once at startup; every collaborator is injected so tests can swap
/// the browser, planner and executor.
pub struct AppCore {
    pub config: AppConfig,
    pub storage: Arc<Storage>,
    pub browser: Arc<BrowserService>,
    pub planner: Arc<dyn ActionPlanner>,
    pub controller: TaskController,
    events: BroadcastEventEmitter,
    runner: RunnerHandle,
}

impl AppCore {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_path = config.db_path()?;
        let storage = Arc::new(Storage::new(&db_path)?);
        info!(db_path = %db_path.display(), "Storage ready");

        let browser = Arc::new(BrowserService::new(config.browser.clone()));

        let planner: Arc<dyn ActionPlanner> = match config.executor.plan_source {
            PlanSource::Ai => {
                let client = create_inference_client(&config.inference);
                Arc::new(AiPlanner::from_config(client, &config.inference))
            }
            PlanSource::Keyword => Arc::new(KeywordPlanner::new()),
        };

        let executor = Arc::new(BrowserTaskExecutor::new(
            browser.clone(),
            planner.clone(),
            config.environment,
        ));

        info!(
            environment = config.environment.as_str(),
            planner = planner.name(),
            headless = config.browser.headless,
            "Initializing WebPilot"
        );

        Ok(Self::with_components(
            config, storage, browser, planner, executor,
        ))
    }

    /// Assemble the core from ready-made components and start the runner.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_components(
        config: AppConfig,
        storage: Arc<Storage>,
        browser: Arc<BrowserService>,
        planner: Arc<dyn ActionPlanner>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        let events = BroadcastEventEmitter::new();
        let recorder = EventRecorder::new(storage.tasks.clone(), Arc::new(events.clone()));

        let runner = Arc::new(TaskRunner::new(
            storage.tasks.clone(),
            executor,
            recorder.clone(),
            RunnerConfig {
                max_concurrent_executions: config.executor.max_concurrent_executions,
            },
        ))
        .start();

        let controller =
            TaskController::new(storage.tasks.clone(), runner.clone(), recorder, planner.clone());

        Self {
            config,
            storage,
            browser,
            planner,
            controller,
            events,
            runner,
        }
    }

    /// Live stream of task events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Whether plans come from an inference backend
    pub fn inference_enabled(&self) -> bool {
        self.config.executor.plan_source == PlanSource::Ai && self.config.inference.is_enabled()
    }

    /// Drain queued executions and close the browser
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        info!("Shutting down WebPilot core");
        if let Err(error) = self.runner.stop().await {
            tracing::warn!(error = %error, "Runner already stopped");
        }
        self.browser.shutdown().await
    }
}
