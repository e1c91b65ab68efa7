//! Public handle for a running sync client.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use volsock_common::GroupId;
use volsock_config::VolsockConfig;

use super::connection::connection_loop;
use super::machine::SyncClient;
use super::surface::SurfaceHost;
use super::types::{ConnectionState, SyncOptions};

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A sync client running on a background task.
///
/// There is no stop method: dropping the handle tears the client down, the
/// way closing a tab does.
pub struct SyncHandle {
    group: GroupId,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Start synchronizing `host`'s surfaces through the configured relay.
    ///
    /// Joins `config.sync.group` when set, otherwise a freshly generated group.
    /// Must be called from within a tokio runtime.
    pub fn start(config: &VolsockConfig, host: Arc<dyn SurfaceHost>) -> Self {
        let group = config
            .sync
            .group
            .clone()
            .map(GroupId::from)
            .unwrap_or_else(GroupId::generate);

        let (local_tx, local_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let client = SyncClient::new(
            group.clone(),
            &config.reconnect,
            SyncOptions::from(&config.sync),
            host,
            local_tx,
        );

        let task = tokio::spawn(connection_loop(
            client,
            config.relay.clone(),
            local_rx,
            state_tx,
        ));

        Self {
            group,
            state_rx,
            task,
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Wait until the client reaches `state`.
    pub async fn wait_for_state(&self, state: ConnectionState) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|current| *current == state).await;
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
