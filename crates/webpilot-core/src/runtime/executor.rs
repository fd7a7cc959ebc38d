//! Browser task execution.
//!
//! [`BrowserTaskExecutor`] drives the shared browser session through one
//! task: open the target URL, ask the planner for a plan, run every action
//! in order and package what happened into a [`TaskResult`].

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webpilot_ai::ActionPlanner;
use webpilot_browser::{BrowserService, PageDriver};
use webpilot_models::{ActionType, BrowserAction, BrowserTask, PlannedAction, TaskAnalysis, TaskResult};

use crate::config::Environment;

const DEFAULT_WAIT_MS: u64 = 1000;

/// Result of running one action of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    Done,
    Screenshot(Vec<u8>),
    Extracted(Vec<String>),
}

/// One executed plan step
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: BrowserAction,
    pub error: Option<String>,
    pub duration_ms: i64,
}

/// Everything an execution attempt produced
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: TaskResult,
    pub actions: Vec<ActionOutcome>,
}

impl ExecutionOutcome {
    /// Action records to persist with the task
    pub fn browser_actions(&self) -> Vec<BrowserAction> {
        self.actions.iter().map(|outcome| outcome.action.clone()).collect()
    }
}

/// Runs a task to a result.
///
/// An `Err` means the execution path itself broke; ordinary browser
/// failures are reported as an unsuccessful result instead.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &BrowserTask) -> Result<ExecutionOutcome>;
}

/// Executor backed by the shared browser session
pub struct BrowserTaskExecutor {
    browser: Arc<BrowserService>,
    planner: Arc<dyn ActionPlanner>,
    environment: Environment,
}

#[derive(Default)]
struct Progress {
    analysis: Option<TaskAnalysis>,
    actions: Vec<ActionOutcome>,
    screenshots: Vec<Vec<u8>>,
    extracted: Map<String, Value>,
}

impl Progress {
    fn completed(&self) -> u32 {
        let count = self.actions.iter().filter(|o| o.action.completed).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn encoded_screenshots(&self) -> Option<Vec<String>> {
        if self.screenshots.is_empty() {
            return None;
        }
        Some(self.screenshots.iter().map(|png| BASE64.encode(png)).collect())
    }
}

impl BrowserTaskExecutor {
    pub fn new(
        browser: Arc<BrowserService>,
        planner: Arc<dyn ActionPlanner>,
        environment: Environment,
    ) -> Self {
        Self {
            browser,
            planner,
            environment,
        }
    }

    fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.config().navigation_timeout_ms)
    }

    fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.config().action_timeout_ms)
    }

    /// Run a single action against the page.
    ///
    /// Navigation is bounded by the navigation timeout, everything else by
    /// the action timeout. `wait` sleeps for its value in milliseconds and
    /// is not subject to the action timeout.
    pub async fn execute_action(
        &self,
        page: &dyn PageDriver,
        action: &PlannedAction,
    ) -> Result<ActionOutput> {
        let limit = self.action_timeout();
        match action.action_type {
            ActionType::Navigate => {
                let url = required(&action.value, "navigate", "value")?;
                bounded(self.navigation_timeout(), "navigate", page.navigate(url)).await?;
                Ok(ActionOutput::Done)
            }
            ActionType::Click => {
                let selector = required(&action.selector, "click", "selector")?;
                bounded(limit, "click", page.click(selector)).await?;
                Ok(ActionOutput::Done)
            }
            ActionType::Type => {
                let selector = required(&action.selector, "type", "selector")?;
                let value = required(&action.value, "type", "value")?;
                bounded(limit, "type", page.fill(selector, value)).await?;
                Ok(ActionOutput::Done)
            }
            ActionType::Scroll => {
                bounded(limit, "scroll", page.scroll_to_bottom()).await?;
                Ok(ActionOutput::Done)
            }
            ActionType::Wait => {
                let millis = match action.value.as_deref().map(str::trim) {
                    None | Some("") => DEFAULT_WAIT_MS,
                    Some(raw) => raw
                        .parse::<u64>()
                        .map_err(|_| anyhow!("wait value '{raw}' is not a number of milliseconds"))?,
                };
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(ActionOutput::Done)
            }
            ActionType::Screenshot => {
                let png = bounded(limit, "screenshot", page.screenshot(false)).await?;
                Ok(ActionOutput::Screenshot(png))
            }
            ActionType::Extract => {
                let selector = required(&action.selector, "extract", "selector")?;
                let texts = bounded(limit, "extract", page.extract_text(selector)).await?;
                Ok(ActionOutput::Extracted(texts))
            }
        }
    }

    async fn run(&self, task: &BrowserTask, progress: &mut Progress) -> Result<()> {
        let page = self.browser.acquire().await?;

        bounded(self.navigation_timeout(), "navigation", page.navigate(&task.url)).await?;

        if self.environment.is_development() {
            let png = bounded(self.action_timeout(), "screenshot", page.screenshot(true)).await?;
            progress.screenshots.push(png);
        }

        let plan = self.planner.plan(&task.description, &task.url).await;
        let mut actions = plan.actions;
        PlannedAction::sort_by_order(&mut actions);
        debug!(
            task_id = %task.id,
            planner = self.planner.name(),
            task_type = %plan.analysis.task_type,
            actions = actions.len(),
            "Plan ready"
        );
        progress.analysis = Some(plan.analysis);

        for planned in &actions {
            let action_started = Instant::now();
            let output = self.execute_action(&*page, planned).await;
            let duration_ms = elapsed_ms(action_started);
            let record = BrowserAction::from_planned(&task.id, planned);

            match output {
                Ok(output) => {
                    match output {
                        ActionOutput::Done => {}
                        ActionOutput::Screenshot(png) => progress.screenshots.push(png),
                        ActionOutput::Extracted(texts) => {
                            let key = planned.selector.clone().unwrap_or_default();
                            progress.extracted.insert(key, json!(texts));
                        }
                    }
                    progress.actions.push(ActionOutcome {
                        action: record.with_completed(true),
                        error: None,
                        duration_ms,
                    });
                }
                Err(error) => {
                    warn!(
                        task_id = %task.id,
                        action = %planned.action_type,
                        order = planned.order,
                        error = %error,
                        "Action failed, continuing"
                    );
                    progress.actions.push(ActionOutcome {
                        action: record,
                        error: Some(error.to_string()),
                        duration_ms,
                    });
                }
            }
        }

        if self.environment.is_development() {
            let png = bounded(self.action_timeout(), "screenshot", page.screenshot(true)).await?;
            progress.screenshots.push(png);
        }

        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for BrowserTaskExecutor {
    async fn execute(&self, task: &BrowserTask) -> Result<ExecutionOutcome> {
        let started = Instant::now();
        let mut progress = Progress::default();

        let outcome = self.run(task, &mut progress).await;
        let execution_time_ms = elapsed_ms(started);

        let result = match outcome {
            Ok(()) => {
                let data = json!({
                    "analysis": progress.analysis,
                    "extracted": Value::Object(std::mem::take(&mut progress.extracted)),
                });
                TaskResult {
                    success: true,
                    data: Some(data),
                    screenshots: progress.encoded_screenshots(),
                    error: None,
                    execution_time_ms,
                    actions_completed: Some(progress.completed()),
                }
            }
            Err(error) => {
                warn!(task_id = %task.id, error = %error, "Task execution failed");
                let mut result = TaskResult::failure(error.to_string(), execution_time_ms);
                if !progress.actions.is_empty() {
                    result.actions_completed = Some(progress.completed());
                }
                result.screenshots = progress.encoded_screenshots();
                result
            }
        };

        info!(
            task_id = %task.id,
            success = result.success,
            elapsed_ms = execution_time_ms,
            actions_completed = ?result.actions_completed,
            "Task execution finished"
        );

        Ok(ExecutionOutcome {
            result,
            actions: progress.actions,
        })
    }
}

fn required<'a>(field: &'a Option<String>, action: &str, name: &str) -> Result<&'a str> {
    match field.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("{action} action requires a {name}"),
    }
}

async fn bounded<T>(limit: Duration, what: &str, operation: impl Future<Output = Result<T>>) -> Result<T> {
    match timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => bail!("{what} timed out after {}ms", limit.as_millis()),
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
