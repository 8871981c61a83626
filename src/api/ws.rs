use std::pin::Pin;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::select;
use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberRole {
    Student,
    Mover,
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub user_id: Uuid,
    pub role: Option<SubscriberRole>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

/// One connection subscribes its user's room; movers additionally get
/// the open-jobs broadcast. Events missed while disconnected are gone:
/// reconnect-and-refetch is the client's job.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: WsQuery) {
    let (mut sender, mut receiver) = socket.split();

    let user_stream = BroadcastStream::new(state.rooms.subscribe_user(query.user_id));
    let mut stream: Pin<Box<dyn Stream<Item = Result<String, BroadcastStreamRecvError>> + Send>> =
        if query.role == Some(SubscriberRole::Mover) {
            Box::pin(select(
                user_stream,
                BroadcastStream::new(state.rooms.subscribe_movers()),
            ))
        } else {
            Box::pin(user_stream)
        };

    info!(user_id = %query.user_id, role = ?query.role, "websocket client connected");
    state.metrics.ws_clients.inc();

    let send_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            let payload = match result {
                Ok(payload) => payload,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagged behind room buffer");
                    continue;
                }
            };

            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.metrics.ws_clients.dec();
    info!(user_id = %query.user_id, "websocket client disconnected");
}
