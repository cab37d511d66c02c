//! Room directory: room lookup, creation and live subscriptions.

use std::sync::Arc;

use storefront_database::{Room, RoomKind, RoomRepository, SqlitePool, User, UserRepository};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{ChatError, ChatResult};
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;

pub struct RoomDirectory {
    rooms: RoomRepository,
    users: UserRepository,
    registry: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
}

impl RoomDirectory {
    pub fn new(
        pool: SqlitePool,
        registry: Arc<ConnectionRegistry>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            registry,
            presence,
        }
    }

    /// Find or create the room between `requester` and the partner.
    ///
    /// Idempotent for the unordered pair and kind. A support room needs a
    /// support or admin user on one side.
    pub async fn get_or_create_room(
        &self,
        requester: &User,
        partner_public_id: &str,
        kind: RoomKind,
    ) -> ChatResult<Room> {
        let partner = self
            .users
            .find_by_public_id(partner_public_id)
            .await?
            .ok_or_else(|| ChatError::validation(format!("unknown partner {partner_public_id}")))?;

        if partner.id == requester.id {
            return Err(ChatError::validation("cannot open a room with yourself"));
        }

        if kind == RoomKind::Support && !(requester.is_staff() || partner.is_staff()) {
            return Err(ChatError::validation(
                "support rooms require a support or admin participant",
            ));
        }

        let room = self.rooms.get_or_create(requester.id, partner.id, kind).await?;
        debug!(room_id = %room.public_id, kind = %kind, "room resolved");
        Ok(room)
    }

    /// Subscribe a live connection to a room it participates in.
    pub async fn join_room(&self, connection: &Connection, room_id: &str) -> ChatResult<Room> {
        let user = connection.user();
        let room = self
            .rooms
            .find_by_public_id(room_id)
            .await?
            .ok_or_else(|| ChatError::room_not_found(room_id))?;

        if !room.has_participant(user.id) {
            return Err(ChatError::authorization(format!(
                "not a participant of room {room_id}"
            )));
        }

        if !self.registry.join(connection.id(), &room.public_id).await {
            return Err(ChatError::authentication("connection is not registered"));
        }

        info!(
            connection_id = %connection.id(),
            user_id = user.id,
            room_id = %room.public_id,
            "joined room"
        );
        Ok(room)
    }

    /// Unsubscribe and drop any typing indicator this connection held in the
    /// room. Leaving a room that was never joined is a no-op.
    pub async fn leave_room(&self, connection: &Connection, room_id: &str) -> bool {
        let was_member = self.registry.leave(connection.id(), room_id).await;
        self.presence
            .clear_connection(connection.id(), Some(room_id))
            .await;
        if was_member {
            info!(connection_id = %connection.id(), room_id, "left room");
        }
        was_member
    }

    pub async fn list_rooms(&self, user_id: i64) -> ChatResult<Vec<Room>> {
        Ok(self.rooms.list_for_user(user_id).await?)
    }

    pub async fn get_room(&self, user: &User, room_id: &str) -> ChatResult<Room> {
        let room = self
            .rooms
            .find_by_public_id(room_id)
            .await?
            .ok_or_else(|| ChatError::room_not_found(room_id))?;

        if !room.has_participant(user.id) {
            return Err(ChatError::authorization(format!(
                "not a participant of room {room_id}"
            )));
        }
        Ok(room)
    }

    /// Membership check for reads and writes. Unknown rooms are reported as
    /// unauthorized so room ids cannot be enumerated.
    pub(crate) async fn participant_room(&self, user: &User, room_id: &str) -> ChatResult<Room> {
        match self.rooms.find_by_public_id(room_id).await? {
            Some(room) if room.has_participant(user.id) => Ok(room),
            _ => Err(ChatError::authorization(format!(
                "not a participant of room {room_id}"
            ))),
        }
    }
}
