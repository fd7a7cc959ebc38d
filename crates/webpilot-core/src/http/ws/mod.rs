pub mod events;

use axum::{Router, routing::get};

pub fn router() -> Router {
    Router::new().route("/ws", get(events::events_handler))
}
