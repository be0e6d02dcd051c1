use std::path::PathBuf;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use didboard_shared::StrokeBuffer;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::spawn_response;
use crate::logic::{broadcast_except, replay_frames, route_frame};
use crate::state::AppState;

pub fn router(state: AppState, public_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/ws/draw", get(ws_handler))
        .route("/health", get(health_handler));
    let app = match public_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => app,
    };
    app.layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection_id = Uuid::new_v4();

    {
        let mut board = state.board.write().await;
        // Queue the history before joining so no broadcast can overtake it.
        let replay = replay_frames(&board);
        let replayed = replay.len();
        for frame in replay {
            let _ = tx.send(frame);
        }
        board.peers.insert(connection_id, tx);
        info!(
            conn = %connection_id,
            peers = board.peers.len(),
            replayed,
            "peer connected"
        );
    }

    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if socket_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut close_frame = None;

    while let Some(Ok(message)) = socket_receiver.next().await {
        match message {
            Message::Text(text) => {
                let routed = {
                    let mut board = state.board.write().await;
                    let routed = route_frame(&mut board, connection_id, &text);
                    if let Some(frame) = &routed.forward {
                        broadcast_except(&mut board, connection_id, frame);
                    }
                    routed
                };
                if let Some(stroke) = routed.agent_trigger {
                    spawn_response(state.clone(), stroke);
                }
            }
            Message::Binary(data) => {
                warn!(conn = %connection_id, bytes = data.len(), "ignoring binary frame");
            }
            Message::Close(frame) => {
                close_frame = frame;
                break;
            }
            _ => {}
        }
    }

    {
        let mut board = state.board.write().await;
        board.peers.remove(&connection_id);
        info!(
            conn = %connection_id,
            peers = board.peers.len(),
            "peer disconnected"
        );
        if let Some(frame) = &close_frame {
            info!(
                conn = %connection_id,
                code = frame.code,
                reason = %frame.reason,
                "close frame"
            );
        }
        if board.peers.is_empty() {
            info!("last peer left, discarding {} strokes", board.history.len());
            board.history = StrokeBuffer::new();
        }
    }
    send_task.abort();
}
