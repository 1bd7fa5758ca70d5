//! 进度推送 WebSocket 路由
//!
//! 连接建立后先下发一份当前进度快照，之后按编排器的状态更新推送；
//! 终态快照送达后服务端主动关闭连接。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;
use tracing::debug;
use vidcast_core::models::JobProgress;

use crate::state::AppState;

/// GET /ws/progress/:job_id
pub async fn progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, job_id, socket))
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &JobProgress) -> Result<(), ()> {
    let text = serde_json::to_string(snapshot).map_err(|_| ())?;
    socket.send(Message::Text(text)).await.map_err(|_| ())
}

async fn handle_socket(state: AppState, job_id: String, mut socket: WebSocket) {
    let snapshot = match state.tracker.get(&job_id) {
        Ok(snapshot) => snapshot,
        Err(_) => {
            let body = json!({ "error": format!("任务不存在: {job_id}") }).to_string();
            let _ = socket.send(Message::Text(body)).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    // 先订阅再发快照，避免漏掉中间的更新
    let mut receiver = state.connections.subscribe(&job_id);
    if send_snapshot(&mut socket, &snapshot).await.is_err() {
        return;
    }
    if snapshot.status.is_terminal() {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            update = receiver.recv() => {
                match update {
                    Some(progress) => {
                        if send_snapshot(&mut socket, &progress).await.is_err() {
                            return;
                        }
                        if progress.status.is_terminal() {
                            let _ = socket.send(Message::Close(None)).await;
                            return;
                        }
                    }
                    // 推送端已清理该任务的订阅
                    None => {
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = socket.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(job_id = %job_id, "客户端断开进度订阅");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => return,
                }
            }
        }
    }
}
