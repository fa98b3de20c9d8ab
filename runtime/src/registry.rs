//! Connection registry.
//!
//! Maps each admin to the set of its live connections. An admin may have any
//! number of consoles open at once; no per-admin cap is enforced.
//!
//! All access goes through one `RwLock`. Readers take short snapshots and
//! release the lock before doing any I/O, so network writes never happen
//! while the registry is locked.

use bankadmin_core::{AdminId, Connection, ConnectionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connections of one admin, keyed by instance.
type AdminConnections = HashMap<ConnectionId, Arc<Connection>>;

/// Directory of live admin connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<AdminId, AdminConnections>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` under `admin_id`.
    ///
    /// Returns the total connection count after insertion.
    pub async fn insert(&self, admin_id: AdminId, connection: Arc<Connection>) -> usize {
        let mut connections = self.connections.write().await;
        connections
            .entry(admin_id)
            .or_default()
            .insert(connection.id(), connection);
        total(&connections)
    }

    /// Remove exactly one connection instance.
    ///
    /// Returns the total count after removal, or `None` if the connection was
    /// not registered. Admins left without connections are pruned.
    pub async fn remove(&self, admin_id: &AdminId, connection_id: ConnectionId) -> Option<usize> {
        let mut connections = self.connections.write().await;
        let per_admin = connections.get_mut(admin_id)?;
        per_admin.remove(&connection_id)?;
        if per_admin.is_empty() {
            connections.remove(admin_id);
        }
        Some(total(&connections))
    }

    /// Snapshot of every registered connection.
    pub async fn snapshot_all(&self) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .await
            .values()
            .flat_map(|per_admin| per_admin.values().cloned())
            .collect()
    }

    /// Snapshot of one admin's connections. Empty if the admin has none.
    pub async fn snapshot_for(&self, admin_id: &AdminId) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .await
            .get(admin_id)
            .map(|per_admin| per_admin.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return every connection.
    pub async fn drain(&self) -> Vec<Arc<Connection>> {
        let mut connections = self.connections.write().await;
        connections
            .drain()
            .flat_map(|(_, per_admin)| per_admin.into_values())
            .collect()
    }

    /// Total number of registered connections.
    pub async fn len(&self) -> usize {
        total(&*self.connections.read().await)
    }

    /// Whether no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Number of admins with at least one connection.
    pub async fn admin_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

fn total(connections: &HashMap<AdminId, AdminConnections>) -> usize {
    connections.values().map(HashMap::len).sum()
}
