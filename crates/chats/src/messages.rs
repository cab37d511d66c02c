//! Message pipeline: validate, authorize, persist, then fan out.

use std::collections::HashMap;
use std::sync::Arc;

use storefront_database::{Message, MessageRepository, MessageType, Room, SqlitePool, User};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::{ChatError, ChatResult};
use crate::events::ServerEvent;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

pub struct MessagePipeline {
    messages: MessageRepository,
    rooms: Arc<RoomDirectory>,
    presence: Arc<PresenceTracker>,
    registry: Arc<ConnectionRegistry>,
    max_message_length: usize,
    room_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl MessagePipeline {
    pub fn new(
        pool: SqlitePool,
        rooms: Arc<RoomDirectory>,
        presence: Arc<PresenceTracker>,
        registry: Arc<ConnectionRegistry>,
        max_message_length: usize,
    ) -> Self {
        Self {
            messages: MessageRepository::new(pool),
            rooms,
            presence,
            registry,
            max_message_length,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The single entry point for new messages, shared by the socket and
    /// REST transports.
    ///
    /// Persist and fan-out run under a per-room lock, so every subscriber
    /// sees a room's messages in id order. Content is stored exactly as
    /// sent; surrounding whitespace only matters for validation.
    pub async fn send_message(
        &self,
        sender: &User,
        room_id: &str,
        content: &str,
        message_type: MessageType,
    ) -> ChatResult<Message> {
        self.validate(sender, content, message_type)?;
        let room = self.rooms.participant_room(sender, room_id).await?;

        let lock = self.room_lock(room.id).await;
        let sent = {
            let _guard = lock.lock().await;
            self.persist_and_fan_out(sender, &room, content, message_type)
                .await
        };
        self.release_room_lock(room.id, lock).await;
        sent
    }

    async fn persist_and_fan_out(
        &self,
        sender: &User,
        room: &Room,
        content: &str,
        message_type: MessageType,
    ) -> ChatResult<Message> {
        let message = self
            .messages
            .append(room.id, sender.id, content, message_type)
            .await
            .map_err(|e| {
                error!(room_id = %room.public_id, sender_id = sender.id, error = %e, "failed to persist message");
                ChatError::from(e)
            })?;

        self.presence.clear_typing(sender, &room.public_id).await;

        let event = ServerEvent::NewMessage {
            message: (&message).into(),
        };
        let delivered = self
            .registry
            .broadcast_to_room_and_user(&room.public_id, sender.id, &event)
            .await;

        debug!(
            message_id = message.id,
            room_id = %room.public_id,
            delivered,
            "message fanned out"
        );
        Ok(message)
    }

    /// A page of history, oldest first. `before` is an exclusive message id.
    pub async fn list_messages(
        &self,
        user: &User,
        room_id: &str,
        before: Option<i64>,
        limit: Option<u32>,
    ) -> ChatResult<Vec<Message>> {
        let room = self.rooms.participant_room(user, room_id).await?;
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Ok(self.messages.list_for_room(room.id, before, limit).await?)
    }

    fn validate(&self, sender: &User, content: &str, message_type: MessageType) -> ChatResult<()> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation("message content must not be empty"));
        }

        let length = trimmed.chars().count();
        if length > self.max_message_length {
            return Err(ChatError::validation(format!(
                "message is {length} characters, limit is {}",
                self.max_message_length
            )));
        }

        if message_type == MessageType::System && !sender.is_staff() {
            warn!(user_id = sender.id, "rejected system message from non-staff user");
            return Err(ChatError::authorization(
                "only support staff may send system messages",
            ));
        }

        Ok(())
    }

    async fn room_lock(&self, room_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        locks.entry(room_id).or_default().clone()
    }

    /// Forget a room's lock once no other sender holds or waits on it.
    /// Clones are only handed out under the map lock, so the count is exact.
    async fn release_room_lock(&self, room_id: i64, lock: Arc<Mutex<()>>) {
        let mut locks = self.room_locks.lock().await;
        let unused = locks
            .get(&room_id)
            .is_some_and(|tracked| Arc::ptr_eq(tracked, &lock) && Arc::strong_count(&lock) == 2);
        if unused {
            locks.remove(&room_id);
        }
    }

    #[cfg(test)]
    async fn tracked_room_locks(&self) -> usize {
        self.room_locks.lock().await.len()
    }
}
