//! Background task driving a [`SyncClient`] against a real relay.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use volsock_config::RelayConfig;

use crate::machine::SyncClient;
use crate::types::{ClientEvent, ConnectionState, Effect};

// ---------------------------------------------------------------------------
// Link events
// ---------------------------------------------------------------------------

/// Reports from a socket task. `generation` tells a stale socket's reports
/// apart from the current one's.
enum LinkEvent {
    Opened {
        generation: u64,
        outbound: mpsc::UnboundedSender<WsMessage>,
    },
    Frame {
        generation: u64,
        text: String,
    },
    Closed {
        generation: u64,
    },
}

enum Input {
    Local(ClientEvent),
    Link(LinkEvent),
    ReconnectDue,
}

/// The socket currently in use, if any.
#[derive(Default)]
struct Link {
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<WsMessage>>,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Run `client` until the task is aborted. Every event, local or remote, goes
/// through this single loop in arrival order.
pub(crate) async fn connection_loop(
    mut client: SyncClient,
    relay: RelayConfig,
    mut local_rx: mpsc::UnboundedReceiver<ClientEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let (link_tx, mut link_rx) = mpsc::unbounded_channel::<LinkEvent>();
    let mut link = Link::default();
    let mut reconnect: Option<Pin<Box<Sleep>>> = None;
    let connect_timeout = Duration::from_millis(relay.connect_timeout_ms);

    let mut next = Some(ClientEvent::ConnectRequested);

    loop {
        if let Some(event) = next.take() {
            let effects = client.handle(event);
            publish_state(&state_tx, client.state());
            for effect in effects {
                match effect {
                    Effect::Connect => {
                        link.generation += 1;
                        link.outbound = None;
                        tokio::spawn(open_link(
                            relay.url.clone(),
                            connect_timeout,
                            link.generation,
                            link_tx.clone(),
                        ));
                    }
                    Effect::Send(msg) => send_frame(&link, &msg),
                    Effect::ScheduleReconnect(delay) => {
                        info!(
                            delay_ms = delay.as_millis() as u64,
                            "Reconnecting in {:?}", delay
                        );
                        reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                    }
                }
            }
        }

        let input = tokio::select! {
            Some(event) = local_rx.recv() => Input::Local(event),
            Some(event) = link_rx.recv() => Input::Link(event),
            () = reconnect_due(&mut reconnect) => Input::ReconnectDue,
            else => break,
        };

        next = match input {
            Input::Local(event) => Some(event),
            Input::ReconnectDue => {
                reconnect = None;
                Some(ClientEvent::ConnectRequested)
            }
            Input::Link(LinkEvent::Opened {
                generation,
                outbound,
            }) if generation == link.generation => {
                link.outbound = Some(outbound);
                Some(ClientEvent::Opened)
            }
            Input::Link(LinkEvent::Frame { generation, text }) if generation == link.generation => {
                Some(ClientEvent::Message(text))
            }
            Input::Link(LinkEvent::Closed { generation }) if generation == link.generation => {
                link.outbound = None;
                Some(ClientEvent::Closed)
            }
            Input::Link(_) => {
                debug!("Report from a replaced socket, ignoring");
                None
            }
        };
    }
}

fn publish_state(state_tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    state_tx.send_if_modified(|current| {
        if *current == state {
            false
        } else {
            *current = state;
            true
        }
    });
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

fn send_frame(link: &Link, msg: &volsock_common::Message) {
    let Some(outbound) = &link.outbound else {
        debug!(?msg, "No open socket, dropping frame");
        return;
    };
    match msg.encode() {
        Ok(json) => {
            if outbound.send(WsMessage::Text(json.into())).is_err() {
                debug!("Socket task gone, dropping frame");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode frame"),
    }
}

// ---------------------------------------------------------------------------
// Socket task
// ---------------------------------------------------------------------------

/// Open one socket and pump it until it closes. Always ends with `Closed`,
/// whether or not the handshake succeeded.
async fn open_link(
    url: String,
    connect_timeout: Duration,
    generation: u64,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
) {
    info!(url = %url, "Connecting to relay");

    let ws = match tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(url.as_str()),
    )
    .await
    {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to connect to relay");
            let _ = link_tx.send(LinkEvent::Closed { generation });
            return;
        }
        Err(_elapsed) => {
            warn!(timeout = ?connect_timeout, "Relay connection timed out");
            let _ = link_tx.send(LinkEvent::Closed { generation });
            return;
        }
    };

    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<WsMessage>();
    if link_tx
        .send(LinkEvent::Opened {
            generation,
            outbound: outbound_tx,
        })
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = outbound_rx.recv() => {
                match msg {
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            break;
                        }
                    }
                    // The client dropped this socket.
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = link_tx.send(LinkEvent::Frame {
                            generation,
                            text: text.to_string(),
                        });
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    let _ = link_tx.send(LinkEvent::Closed { generation });
}
