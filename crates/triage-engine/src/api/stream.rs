//! Live vitals stream
//!
//! On connect the client receives the current snapshot, then one snapshot per
//! tick. Inbound frames are keepalives and are discarded.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error};

use super::AppState;
use crate::broadcast::Subscription;

pub async fn vitals_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let Subscription { id, mut receiver } = state.hub.connect(|| state.patients.snapshot());
    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            pushed = receiver.recv() => {
                // None: the hub pruned us
                let Some(snapshot) = pushed else { break };
                let text = match snapshot.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode snapshot {}: {}", snapshot.tick, e);
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            frame = inbound.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    state.hub.disconnect(id);
    debug!("Stream for subscriber {} closed", id);
}
