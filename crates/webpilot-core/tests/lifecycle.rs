use std::sync::Arc;
use webpilot_ai::{AiPlanner, KeywordPlanner};
use webpilot_browser::mock::MockPageDriver;
use webpilot_core::AppCore;
use webpilot_core::config::{AppConfig, Environment};
use webpilot_core::models::{NewTask, TaskStatus};
use webpilot_core::runtime::BrowserTaskExecutor;
use webpilot_core::runtime::testkit::{MockExecutor, create_test_storage, mock_browser, test_app_core};

fn flight_search() -> NewTask {
    NewTask {
        name: "Search flights".to_string(),
        description: "search for flights to Tokyo".to_string(),
        url: "https://example.com".to_string(),
    }
}

fn offline_core(driver: MockPageDriver, environment: Environment) -> (AppCore, tempfile::TempDir) {
    let (storage, dir) = create_test_storage();
    let browser = mock_browser(driver);
    let planner = Arc::new(AiPlanner::offline());
    let executor = Arc::new(BrowserTaskExecutor::new(browser.clone(), planner.clone(), environment));
    let config = AppConfig {
        environment,
        ..AppConfig::default()
    };
    (
        AppCore::with_components(config, storage, browser, planner, executor),
        dir,
    )
}

#[tokio::test]
async fn search_task_round_trip_without_inference() {
    let driver = MockPageDriver::new();
    let state = driver.state();
    let (core, _dir) = offline_core(driver, Environment::Development);

    let task = core.controller.create(flight_search()).await.unwrap();
    let report = core
        .controller
        .execute(&task.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(!report.fallback_used);

    let stored = core.controller.get(&task.id).unwrap();
    assert!(matches!(stored.status, TaskStatus::Completed | TaskStatus::Failed));
    assert_eq!(stored.status, TaskStatus::Completed);

    let result = stored.result.unwrap();
    assert!(result.execution_time_ms >= 0);
    assert_eq!(result.data.unwrap()["analysis"]["task_type"], "search");
    assert!(result.screenshots.unwrap().len() >= 2);
    assert!(!stored.actions.is_empty());
    assert!(stored.actions.iter().all(|a| a.task_id == task.id));
    assert!(stored.completed_at.is_some());

    assert_eq!(state.calls()[0], "navigate:https://example.com");
    core.shutdown().await.unwrap();
    assert!(state.is_closed());
}

#[tokio::test]
async fn navigation_failure_persists_failed_status() {
    let (core, _dir) = offline_core(MockPageDriver::new().failing_navigation(), Environment::Production);

    let task = core.controller.create(flight_search()).await.unwrap();
    let report = core
        .controller
        .execute(&task.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.status, Some(TaskStatus::Failed));
    assert!(!report.fallback_used);
    let stored = core.controller.get(&task.id).unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.result.unwrap().error.unwrap().contains("navigation"));
}

#[tokio::test]
async fn keyword_planner_search_flow() {
    let (storage, _dir) = create_test_storage();
    let driver = MockPageDriver::new();
    let state = driver.state();
    let browser = mock_browser(driver);
    let planner = Arc::new(KeywordPlanner::new());
    let executor = Arc::new(BrowserTaskExecutor::new(
        browser.clone(),
        planner.clone(),
        Environment::Production,
    ));
    let core = AppCore::with_components(AppConfig::default(), storage, browser, planner, executor);

    let task = core.controller.create(flight_search()).await.unwrap();
    core.controller.execute(&task.id).await.unwrap().wait().await.unwrap();

    let stored = core.controller.get(&task.id).unwrap();
    assert_eq!(stored.result.unwrap().actions_completed, Some(3));
    let orders: Vec<_> = stored.actions.iter().map(|a| a.order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert!(state.calls().iter().any(|c| c.starts_with("fill:")));
}

#[tokio::test]
async fn panicking_executor_still_ends_failed() {
    let (core, _dir) = test_app_core(Arc::new(MockExecutor::panicking())).await;

    let task = core.controller.create(flight_search()).await.unwrap();
    let report = core
        .controller
        .execute(&task.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(report.fallback_used);
    let stored = core.controller.get(&task.id).unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.result.unwrap().error.is_some());
}

#[tokio::test]
async fn delete_removes_actions_and_events() {
    let (core, _dir) = offline_core(MockPageDriver::new(), Environment::Production);

    let task = core.controller.create(flight_search()).await.unwrap();
    core.controller.execute(&task.id).await.unwrap().wait().await.unwrap();
    assert!(!core.storage.tasks.list_actions(&task.id).unwrap().is_empty());

    core.controller.delete(&task.id).unwrap();

    assert!(core.storage.tasks.list_actions(&task.id).unwrap().is_empty());
    assert!(core.storage.tasks.list_events(&task.id).unwrap().is_empty());
    assert!(core.controller.get(&task.id).is_err());
}

#[tokio::test]
async fn concurrent_executions_share_one_session() {
    let driver = MockPageDriver::new().with_delay(std::time::Duration::from_millis(5));
    let state = driver.state();
    let (core, _dir) = offline_core(driver, Environment::Production);

    let mut handles = Vec::new();
    for _ in 0..3 {
        let task = core.controller.create(flight_search()).await.unwrap();
        handles.push(core.controller.execute(&task.id).await.unwrap());
    }
    for handle in handles {
        assert_eq!(handle.wait().await.unwrap().status, Some(TaskStatus::Completed));
    }

    assert_eq!(state.max_active(), 1);
}
