//! Process-wide live state: who is connected and which rooms they follow.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::connection::{Connection, ConnectionId, ConnectionSession, ConnectionState};
use crate::events::ServerEvent;

struct ConnectionEntry {
    connection: Arc<Connection>,
    rooms: BTreeSet<String>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    room_subscribers: HashMap<String, HashSet<ConnectionId>>,
    user_connections: HashMap<i64, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn connections_of(&self, ids: &HashSet<ConnectionId>) -> Vec<Arc<Connection>> {
        ids.iter()
            .filter_map(|id| self.connections.get(id))
            .map(|entry| entry.connection.clone())
            .collect()
    }
}

/// Removed connection plus the rooms it had joined.
#[derive(Debug)]
pub struct RemovedConnection {
    pub connection: Arc<Connection>,
    pub rooms: Vec<String>,
}

/// Connection, room-subscriber and user-connection maps behind one lock so
/// each mutation is atomic across all three.
///
/// Fan-out snapshots recipients under the read lock and enqueues after
/// releasing it. A subscriber whose queue is full or closed is evicted:
/// it is removed here and closed, so its socket task tears it down and the
/// client reconnects instead of silently missing events.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: Arc<Connection>) {
        let mut inner = self.inner.write().await;
        let id = connection.id();
        let user_id = connection.user().id;

        inner.user_connections.entry(user_id).or_default().insert(id);
        inner.connections.insert(
            id,
            ConnectionEntry {
                connection,
                rooms: BTreeSet::new(),
            },
        );
        debug!(connection_id = %id, user_id, "connection registered");
    }

    /// Subscribe a connection to a room. Returns `false` if the connection
    /// is not registered.
    pub async fn join(&self, connection_id: ConnectionId, room_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.connections.get_mut(&connection_id) else {
            return false;
        };
        entry.rooms.insert(room_id.to_string());
        inner
            .room_subscribers
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id);
        true
    }

    /// Returns whether the connection was subscribed.
    pub async fn leave(&self, connection_id: ConnectionId, room_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let was_member = inner
            .connections
            .get_mut(&connection_id)
            .map(|entry| entry.rooms.remove(room_id))
            .unwrap_or(false);

        if let Some(subscribers) = inner.room_subscribers.get_mut(room_id) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                inner.room_subscribers.remove(room_id);
            }
        }
        was_member
    }

    /// Drop a connection everywhere. Calling it twice is harmless; the
    /// second call returns `None`.
    pub async fn remove(&self, connection_id: ConnectionId) -> Option<RemovedConnection> {
        let mut inner = self.inner.write().await;
        let entry = inner.connections.remove(&connection_id)?;

        for room_id in &entry.rooms {
            if let Some(subscribers) = inner.room_subscribers.get_mut(room_id) {
                subscribers.remove(&connection_id);
                if subscribers.is_empty() {
                    inner.room_subscribers.remove(room_id);
                }
            }
        }

        let user_id = entry.connection.user().id;
        if let Some(connections) = inner.user_connections.get_mut(&user_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                inner.user_connections.remove(&user_id);
            }
        }

        debug!(connection_id = %connection_id, user_id, "connection removed");
        Some(RemovedConnection {
            connection: entry.connection,
            rooms: entry.rooms.into_iter().collect(),
        })
    }

    pub async fn connection(&self, connection_id: ConnectionId) -> Option<Arc<Connection>> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(&connection_id)
            .map(|entry| entry.connection.clone())
    }

    pub async fn session(&self, connection_id: ConnectionId) -> Option<ConnectionSession> {
        let inner = self.inner.read().await;
        inner.connections.get(&connection_id).map(|entry| {
            let user = entry.connection.user();
            ConnectionSession {
                connection_id,
                user_id: user.id,
                user_public_id: user.public_id.clone(),
                joined_room_ids: entry.rooms.iter().cloned().collect(),
                state: ConnectionState::Authenticated,
            }
        })
    }

    pub async fn is_subscribed(&self, connection_id: ConnectionId, room_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .room_subscribers
            .get(room_id)
            .is_some_and(|subscribers| subscribers.contains(&connection_id))
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        let inner = self.inner.read().await;
        inner
            .user_connections
            .get(&user_id)
            .is_some_and(|connections| !connections.is_empty())
    }

    pub async fn online_users(&self, user_ids: &[i64]) -> HashSet<i64> {
        let inner = self.inner.read().await;
        user_ids
            .iter()
            .copied()
            .filter(|id| inner.user_connections.contains_key(id))
            .collect()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn room_subscriber_count(&self, room_id: &str) -> usize {
        let inner = self.inner.read().await;
        inner.room_subscribers.get(room_id).map_or(0, HashSet::len)
    }

    /// Deliver to every subscriber of the room. Returns how many queues
    /// accepted the event.
    pub async fn broadcast_to_room(&self, room_id: &str, event: &ServerEvent) -> usize {
        let recipients = {
            let inner = self.inner.read().await;
            match inner.room_subscribers.get(room_id) {
                Some(subscribers) => inner.connections_of(subscribers),
                None => Vec::new(),
            }
        };
        self.deliver_all(&recipients, event).await
    }

    /// Deliver to room subscribers and to every connection of `user_id`,
    /// each connection at most once.
    pub async fn broadcast_to_room_and_user(
        &self,
        room_id: &str,
        user_id: i64,
        event: &ServerEvent,
    ) -> usize {
        let recipients = {
            let inner = self.inner.read().await;
            let mut ids: HashSet<ConnectionId> = inner
                .room_subscribers
                .get(room_id)
                .cloned()
                .unwrap_or_default();
            if let Some(own) = inner.user_connections.get(&user_id) {
                ids.extend(own.iter().copied());
            }
            inner.connections_of(&ids)
        };
        self.deliver_all(&recipients, event).await
    }

    /// Deliver to room subscribers that do not belong to `user_id`.
    pub async fn broadcast_to_room_except_user(
        &self,
        room_id: &str,
        user_id: i64,
        event: &ServerEvent,
    ) -> usize {
        let recipients: Vec<Arc<Connection>> = {
            let inner = self.inner.read().await;
            match inner.room_subscribers.get(room_id) {
                Some(subscribers) => inner
                    .connections_of(subscribers)
                    .into_iter()
                    .filter(|connection| connection.user().id != user_id)
                    .collect(),
                None => Vec::new(),
            }
        };
        self.deliver_all(&recipients, event).await
    }

    pub async fn send_to_user(&self, user_id: i64, event: &ServerEvent) -> usize {
        let recipients = {
            let inner = self.inner.read().await;
            match inner.user_connections.get(&user_id) {
                Some(connections) => inner.connections_of(connections),
                None => Vec::new(),
            }
        };
        self.deliver_all(&recipients, event).await
    }

    async fn deliver_all(&self, recipients: &[Arc<Connection>], event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for connection in recipients {
            match connection.try_deliver(event.clone()) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(
                        connection_id = %connection.id(),
                        user_id = connection.user().id,
                        event = event.kind(),
                        %error,
                        "evicting subscriber that cannot keep up"
                    );
                    failed.push(connection);
                }
            }
        }

        for connection in failed {
            connection.close();
            self.remove(connection.id()).await;
        }
        delivered
    }
}
