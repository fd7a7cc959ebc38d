//! Task execution runtime: executor, background runner, lifecycle
//! controller and event fan-out.

pub mod controller;
pub mod events;
pub mod executor;
pub mod runner;
pub mod testkit;

pub use controller::{ExecutionHandle, TaskController};
pub use events::{BroadcastEventEmitter, EventRecorder, NoopEventEmitter, TaskEventEmitter};
pub use executor::{ActionOutcome, ActionOutput, BrowserTaskExecutor, ExecutionOutcome, TaskExecutor};
pub use runner::{ExecutionJob, ExecutionReport, RunnerConfig, RunnerHandle, TaskRunner};
