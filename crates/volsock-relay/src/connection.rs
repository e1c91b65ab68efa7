//! Per-connection handler: read `init`, join the group, then forward
//! `setvolume` frames to the other members.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;
use volsock_common::Message;

use crate::groups::GroupStore;

/// How long a new connection has to announce its group.
const INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames buffered per member before new ones are dropped.
const PEER_QUEUE: usize = 256;

/// Handle a single WebSocket connection.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, store: GroupStore) {
    let (mut sink, mut stream) = ws.split();

    // 1. The first frame names the group.
    let group = match read_init(&mut stream, addr).await {
        Some(group) => group,
        None => return,
    };

    // 2. Register our receive channel.
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<String>(PEER_QUEUE);
    store.join(&group, conn_id, tx).await;

    tracing::info!(peer = %addr, group = %group, conn = %conn_id, "Client joined group");

    // 3. Forwarding loop.
    loop {
        tokio::select! {
            // Frames from other members → this client
            Some(msg) = rx.recv() => {
                if sink.send(WsMessage::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client → other members
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => match Message::decode(&text) {
                        Ok(Message::SetVolume { volume }) => {
                            let peers = store.peers(&group, conn_id).await;
                            tracing::debug!(group = %group, volume, peers = peers.len(), "Forwarding volume");
                            for peer in peers {
                                // A member that stops reading must not stall the rest of
                                // the group. Only the latest volume matters.
                                match peer.try_send(text.to_string()) {
                                    Ok(()) => {}
                                    Err(TrySendError::Full(_)) => {
                                        tracing::debug!(group = %group, "Peer queue full, dropping frame");
                                    }
                                    Err(TrySendError::Closed(_)) => {
                                        tracing::debug!(group = %group, "Peer channel closed");
                                    }
                                }
                            }
                        }
                        Ok(other) => {
                            tracing::debug!(peer = %addr, msg = ?other, "Ignoring command");
                        }
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "Bad frame");
                        }
                    },
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    tracing::info!(peer = %addr, group = %group, conn = %conn_id, "Client disconnected");
    if store.leave(&group, conn_id).await {
        tracing::debug!(group = %group, "Group emptied");
    }
}

/// Read and parse the first frame as an `init`.
async fn read_init(
    stream: &mut SplitStream<WebSocketStream<TcpStream>>,
    addr: SocketAddr,
) -> Option<String> {
    let frame = tokio::time::timeout(INIT_TIMEOUT, stream.next()).await;

    match frame {
        Ok(Some(Ok(WsMessage::Text(text)))) => match Message::decode(&text) {
            Ok(Message::Init { kind, group }) => {
                tracing::debug!(peer = %addr, kind = %kind, "Init received");
                Some(group.as_str().to_string())
            }
            Ok(other) => {
                tracing::warn!(peer = %addr, msg = ?other, "Expected init");
                None
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid init message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text init, got another frame type");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during init");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before init");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, "Init timeout (10s)");
            None
        }
    }
}
