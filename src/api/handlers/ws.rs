use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::{api::state::AppState, notifier::ChangeNotifier};

pub async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let notifier = state.notifier.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, notifier))
}

async fn handle_socket(socket: WebSocket, notifier: Arc<ChangeNotifier>) {
    let mut events = notifier.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Acknowledge the connection before anything else.
    let ack = notifier.connection_event();
    if let Ok(text) = serde_json::to_string(&ack) {
        if sender.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sender.send(Message::Text(text)).await.is_err() {
                            // Client is gone; dropping the receiver
                            // unsubscribes it.
                            break;
                        }
                    }
                    // A slow client that missed events just skips them.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Dashboard client lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // The dashboard never sends anything meaningful.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("Dashboard client disconnected");
}
