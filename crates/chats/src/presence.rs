//! Presence and typing indicators.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use storefront_database::User;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionId};
use crate::error::{ChatError, ChatResult};
use crate::events::ServerEvent;
use crate::registry::ConnectionRegistry;

/// Room public id plus internal user id.
type TypingKey = (String, i64);

#[derive(Debug, Clone)]
struct TypingEntry {
    connection_id: ConnectionId,
    user_public_id: String,
    display_name: String,
    expires_at: Instant,
}

impl TypingEntry {
    fn stop_event(&self, room_id: &str) -> ServerEvent {
        typing_event(room_id, &self.user_public_id, &self.display_name, false)
    }
}

fn typing_event(room_id: &str, user_public_id: &str, display_name: &str, is_typing: bool) -> ServerEvent {
    ServerEvent::UserTyping {
        room_id: room_id.to_string(),
        user_id: user_public_id.to_string(),
        display_name: display_name.to_string(),
        is_typing,
    }
}

/// Typing state for every room.
///
/// Typing broadcasts go out while the map is locked, so a stop is never
/// overtaken by the start it cancels. The registry never takes this lock.
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    typing: Mutex<HashMap<TypingKey, TypingEntry>>,
    typing_timeout: Duration,
}

impl PresenceTracker {
    pub fn new(registry: Arc<ConnectionRegistry>, typing_timeout: Duration) -> Self {
        Self {
            registry,
            typing: Mutex::new(HashMap::new()),
            typing_timeout,
        }
    }

    /// Start or stop the typing indicator for this connection's user.
    ///
    /// The connection must have joined the room. Other users in the room are
    /// told; the typing user's own connections are not.
    pub async fn set_typing(
        &self,
        connection: &Connection,
        room_id: &str,
        is_typing: bool,
    ) -> ChatResult<()> {
        let mut typing = self.typing.lock().await;

        // Checked under the typing lock: a disconnect clears indicators only
        // after this returns, so it cannot miss the entry inserted below.
        if !self.registry.is_subscribed(connection.id(), room_id).await {
            return Err(ChatError::authorization(format!(
                "connection has not joined room {room_id}"
            )));
        }

        let user = connection.user();
        let key = (room_id.to_string(), user.id);
        if is_typing {
            typing.insert(
                key,
                TypingEntry {
                    connection_id: connection.id(),
                    user_public_id: user.public_id.clone(),
                    display_name: user.display_name.clone(),
                    expires_at: Instant::now() + self.typing_timeout,
                },
            );
        } else {
            typing.remove(&key);
        }

        let event = typing_event(room_id, &user.public_id, &user.display_name, is_typing);
        self.registry
            .broadcast_to_room_except_user(room_id, user.id, &event)
            .await;
        Ok(())
    }

    /// Implicit stop, used when the user sends a message. Only broadcasts if
    /// the user was marked as typing.
    pub async fn clear_typing(&self, user: &User, room_id: &str) -> bool {
        let mut typing = self.typing.lock().await;
        match typing.remove(&(room_id.to_string(), user.id)) {
            Some(entry) => {
                self.registry
                    .broadcast_to_room_except_user(room_id, user.id, &entry.stop_event(room_id))
                    .await;
                true
            }
            None => false,
        }
    }

    /// Drop every indicator owned by a connection, optionally limited to one
    /// room, broadcasting a stop for each.
    pub async fn clear_connection(&self, connection_id: ConnectionId, room_id: Option<&str>) -> usize {
        let mut typing = self.typing.lock().await;
        let removed = take_where(&mut typing, |key, entry| {
            entry.connection_id == connection_id && room_id.map_or(true, |room| key.0 == room)
        });

        self.broadcast_stops(&removed).await;
        removed.len()
    }

    /// Expire indicators whose deadline is at or before `now`.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut typing = self.typing.lock().await;
        let expired = take_where(&mut typing, |_, entry| entry.expires_at <= now);

        if !expired.is_empty() {
            debug!(expired = expired.len(), "typing indicators expired");
        }
        self.broadcast_stops(&expired).await;
        expired.len()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) on a fixed interval until
    /// the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        info!(interval_ms = interval.as_millis() as u64, "starting typing sweeper");
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracker.sweep_expired(Instant::now()).await;
            }
        })
    }

    pub async fn typing_users(&self, room_id: &str) -> Vec<String> {
        let typing = self.typing.lock().await;
        let mut users: Vec<String> = typing
            .iter()
            .filter(|(key, _)| key.0 == room_id)
            .map(|(_, entry)| entry.user_public_id.clone())
            .collect();
        users.sort();
        users
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        self.registry.is_online(user_id).await
    }

    pub async fn online_users(&self, user_ids: &[i64]) -> HashSet<i64> {
        self.registry.online_users(user_ids).await
    }

    async fn broadcast_stops(&self, entries: &[(TypingKey, TypingEntry)]) {
        for ((room_id, user_id), entry) in entries {
            self.registry
                .broadcast_to_room_except_user(room_id, *user_id, &entry.stop_event(room_id))
                .await;
        }
    }
}

fn take_where(
    typing: &mut HashMap<TypingKey, TypingEntry>,
    matches: impl Fn(&TypingKey, &TypingEntry) -> bool,
) -> Vec<(TypingKey, TypingEntry)> {
    let keys: Vec<TypingKey> = typing
        .iter()
        .filter(|(key, entry)| matches(key, entry))
        .map(|(key, _)| key.clone())
        .collect();
    keys.into_iter()
        .filter_map(|key| typing.remove(&key).map(|entry| (key, entry)))
        .collect()
}
