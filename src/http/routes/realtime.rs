use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::application::{actions::ActionError, guard::SessionGuard};
use crate::domain::feed::Subscription;
use crate::http::{session::SessionToken, types::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/realtime", get(realtime))
}

/// Streams the caller's change events as JSON text frames.
async fn realtime(State(state): State<AppState>, token: SessionToken, ws: WebSocketUpgrade) -> Response {
    let user = match SessionGuard::new(state.backend.auth.as_ref()).require_user(token.as_deref()).await {
        Ok(user) => user,
        Err(_) => return ActionError::Unauthorized("You must be logged in".into()).into_response(),
    };
    let subscription = match state.backend.feed.subscribe(user.id) {
        Ok(subscription) => subscription,
        Err(err) => return ActionError::Storage(err.to_string()).into_response(),
    };
    ws.on_upgrade(move |socket| forward_events(socket, subscription))
}

async fn forward_events(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to encode change event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(owner = %subscription.owner(), "realtime socket closed");
}
