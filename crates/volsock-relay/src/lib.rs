//! volsock-relay: WebSocket relay that fans volume changes out to every
//! other connection in the same group.
//!
//! Connections announce their group with an `init` frame. After that, each
//! `setvolume` frame is forwarded verbatim to the group's other members.

mod connection;
mod groups;

pub use connection::handle_connection;
pub use groups::GroupStore;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Accept connections on `listener` forever, upgrading only requests for `path`.
pub async fn serve(listener: TcpListener, store: GroupStore, path: String) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    let check_path = |req: &Request, resp: Response| {
                        if req.uri().path() == path {
                            Ok(resp)
                        } else {
                            Err(not_found())
                        }
                    };
                    match accept_hdr_async(stream, check_path).await {
                        Ok(ws) => handle_connection(ws, addr, store).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

fn not_found() -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some("not found".into()));
    *resp.status_mut() = StatusCode::NOT_FOUND;
    resp
}
