//! One WebSocket session: a reader feeding the job queue and a writer
//! draining the session's outbound frames.
//!
//! Lifecycle: connecting → connected (init sent by the worker) → command
//! loop → disconnected. Nothing about the session outlives it except the
//! identity-keyed rate-limit entry.

use axum::{
    Extension,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::hub::{Frame, SessionHandle};
use crate::models::{ClientCommand, Job};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> impl IntoResponse {
    let addr = connect_info.map(|Extension(ConnectInfo(addr))| addr);
    ws.on_upgrade(move |socket| run_session(socket, state, addr))
}

/// Rate-limit key: the peer IP when known, otherwise the session id.
/// Reconnecting from the same IP shares a quota; the fallback does not.
pub fn resolve_identity(addr: Option<SocketAddr>, session_id: Uuid) -> String {
    match addr {
        Some(addr) => addr.ip().to_string(),
        None => session_id.to_string(),
    }
}

async fn run_session(socket: WebSocket, state: Arc<AppState>, addr: Option<SocketAddr>) {
    let session_id = Uuid::new_v4();
    let identity = resolve_identity(addr, session_id);
    let (mut sink, stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Frame>(state.session_buffer.max(1));

    let session = SessionHandle {
        id: session_id,
        identity: identity.clone(),
        tx,
    };
    if state.submit(Job::Join { session }).await.is_err() {
        tracing::warn!(session = %session_id, "worker gone, closing connection");
        return;
    }

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });
    let mut reader = tokio::spawn(read_commands(stream, state.clone(), session_id, identity));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    let _ = state.submit(Job::Leave { session_id }).await;
}

async fn read_commands(
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    state: Arc<AppState>,
    session_id: Uuid,
    identity: String,
) {
    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientCommand>(text.as_str()) {
                Ok(command) => {
                    let job = Job::Command {
                        session_id,
                        identity: identity.clone(),
                        command,
                    };
                    if state.submit(job).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(session = %session_id, error = %err, "malformed frame ignored");
                }
            },
            Message::Close(_) => break,
            // pings are answered by axum; binary frames carry nothing for us
            _ => {}
        }
    }
}
