//! Progress WebSocket with backpressure support.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use vstream_models::{VideoId, WsMessage};
use vstream_pipeline::ProgressSubscription;

use crate::metrics;
use crate::state::AppState;

const ENDPOINT: &str = "progress";
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    /// Only forward snapshots of this video.
    pub video_id: Option<String>,
}

/// Send a message through the bounded outbound channel.
///
/// Waits when the buffer is full; returns false once the socket is gone.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: &WsMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    match tx.try_send(Message::Text(json)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(msg)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(msg).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Live record snapshots from the ingestion pipeline.
pub async fn ws_progress(
    ws: WebSocketUpgrade,
    Query(query): Query<ProgressQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Subscribe before the handshake completes so no snapshot falls in between
    let subscription = state.broadcaster.subscribe();
    let filter = query
        .video_id
        .filter(|id| !id.is_empty())
        .map(VideoId::from_string);

    ws.on_upgrade(move |socket| async move {
        metrics::record_ws_connected(ENDPOINT);
        let _guard = scopeguard::guard((), |_| metrics::record_ws_disconnected());
        handle_progress_socket(socket, subscription, filter).await;
    })
}

async fn handle_progress_socket(
    socket: WebSocket,
    mut subscription: ProgressSubscription,
    filter: Option<VideoId>,
) {
    let (mut ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    info!(video_id = ?filter, "Progress socket opened");

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                let Some(record) = snapshot else { break };
                if filter.as_ref().is_some_and(|id| *id != record.id) {
                    continue;
                }
                let msg = WsMessage::video_progress(record);
                if !send_ws_message(&tx, &msg).await {
                    break;
                }
                metrics::record_ws_message_sent(ENDPOINT, msg.message_type().as_str());
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(
        video_id = ?filter,
        skipped = subscription.skipped(),
        "Progress socket closed"
    );
}
