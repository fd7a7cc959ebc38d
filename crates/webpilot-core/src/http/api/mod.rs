pub mod tasks;

use axum::Router;

/// Build the versioned API router
pub fn router() -> Router {
    Router::new().nest("/tasks", tasks::router())
}
