use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Local;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{debug, info};

use crate::api::AppState;
use crate::store;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut rx) = state.hub.register();
    info!(connection = %id, "websocket connected");
    state.hub.send_to(
        id,
        &json!({ "type": "connected", "connectionId": id.to_string() }),
    );

    let (mut sender, mut receiver) = socket.split();

    // Events flow through the hub channel only, so each connection sees
    // them in send order.
    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => dispatch(&state, id, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.hub.unregister(id);
    send_task.abort();
    info!(connection = %id, "websocket disconnected");
}

async fn dispatch(state: &AppState, id: uuid::Uuid, text: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        debug!(connection = %id, "ignoring non-json websocket message");
        return;
    };
    match value.get("type").and_then(|t| t.as_str()) {
        Some("ping") => {
            state.hub.send_to(id, &json!({ "type": "pong" }));
        }
        Some("terminal_register") => {
            let Some(terminal_id) = value
                .get("terminalId")
                .or_else(|| value.get("terminal_id"))
                .and_then(|t| t.as_str())
            else {
                return;
            };
            state.hub.set_terminal(id, terminal_id);
            info!(connection = %id, terminal_id, "terminal registered");
            let message = format!("terminal registered: {terminal_id}");
            let _ = state
                .db
                .call(move |conn| store::append_log(conn, &message, Local::now().naive_local()))
                .await;
            state.hub.send_to(
                id,
                &json!({ "type": "terminal_registered", "terminalId": terminal_id }),
            );
        }
        // Unrecognized message types are ignored, not fatal.
        _ => {}
    }
}
