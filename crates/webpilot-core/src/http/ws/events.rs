use crate::AppCore;
use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Stream every task event to the client as a JSON text frame
pub async fn events_handler(
    ws: WebSocketUpgrade,
    Extension(core): Extension<Arc<AppCore>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, core))
}

async fn stream_events(mut socket: WebSocket, core: Arc<AppCore>) {
    let mut events = core.subscribe_events();
    debug!("Event stream client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(error) => {
                            warn!(error = %error, "Failed to serialize task event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream client lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    debug!("Event stream client disconnected");
}
