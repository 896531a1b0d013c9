use super::{AppState, AuthedUser};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

// Upgrade an authenticated connection and register it as one of the
// user's notification channels for as long as the socket lives.
pub async fn connect(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| pump_events(socket, state, user_id))
}

async fn pump_events(socket: WebSocket, state: AppState, user_id: String) {
    let (channel_id, mut events) = state.hub.register(&user_id).await;
    let (mut sink, mut stream) = socket.split();

    debug!(user = %user_id, "websocket connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(user = %user_id, "dropping unserializable event: {err}");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    // Clients only listen; anything except a close/error
                    // keeps the channel open.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unregister(&user_id, channel_id).await;
    debug!(user = %user_id, "websocket closed");
}
