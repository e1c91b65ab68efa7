//! Group store: maps group ids to the senders of every member connection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Thread-safe group store.
#[derive(Clone, Default)]
pub struct GroupStore {
    groups: Arc<RwLock<HashMap<String, HashMap<Uuid, mpsc::Sender<String>>>>>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to `group`, creating the group if needed.
    pub async fn join(&self, group: &str, conn_id: Uuid, tx: mpsc::Sender<String>) {
        let mut map = self.groups.write().await;
        map.entry(group.to_string()).or_default().insert(conn_id, tx);
    }

    /// Remove a connection. Returns true if the group is now gone.
    pub async fn leave(&self, group: &str, conn_id: Uuid) -> bool {
        let mut map = self.groups.write().await;
        if let Some(members) = map.get_mut(group) {
            members.remove(&conn_id);
            if members.is_empty() {
                map.remove(group);
                return true;
            }
        }
        false
    }

    /// Senders of every member of `group` except `conn_id`.
    pub async fn peers(&self, group: &str, conn_id: Uuid) -> Vec<mpsc::Sender<String>> {
        let map = self.groups.read().await;
        map.get(group)
            .map(|members| {
                members
                    .iter()
                    .filter(|(id, _)| **id != conn_id)
                    .map(|(_, tx)| tx.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of connections in `group`.
    pub async fn member_count(&self, group: &str) -> usize {
        self.groups
            .read()
            .await
            .get(group)
            .map_or(0, HashMap::len)
    }

    /// Number of non-empty groups.
    pub async fn count(&self) -> usize {
        self.groups.read().await.len()
    }
}
