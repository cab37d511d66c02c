//! Connection gateway: authenticates sockets and routes their events.

use std::sync::Arc;

use storefront_auth::Authenticator;
use storefront_config::RealtimeConfig;
use storefront_database::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionId};
use crate::error::{ChatError, ChatResult};
use crate::events::{ClientEvent, ServerEvent};
use crate::messages::MessagePipeline;
use crate::notifications::NotificationFanout;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;

pub struct ChatHub {
    authenticator: Authenticator,
    registry: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
    rooms: Arc<RoomDirectory>,
    messages: MessagePipeline,
    notifications: NotificationFanout,
    config: RealtimeConfig,
}

impl ChatHub {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        registry: Arc<ConnectionRegistry>,
        config: RealtimeConfig,
    ) -> Self {
        let presence = Arc::new(PresenceTracker::new(
            registry.clone(),
            config.typing_timeout(),
        ));
        let rooms = Arc::new(RoomDirectory::new(
            pool.clone(),
            registry.clone(),
            presence.clone(),
        ));
        let messages = MessagePipeline::new(
            pool.clone(),
            rooms.clone(),
            presence.clone(),
            registry.clone(),
            config.max_message_length,
        );
        let notifications = NotificationFanout::new(pool, registry.clone());

        Self {
            authenticator,
            registry,
            presence,
            rooms,
            messages,
            notifications,
            config,
        }
    }

    /// Bounded queue feeding one socket's writer.
    pub fn outbound_channel(&self) -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(self.config.outbound_buffer.max(1))
    }

    /// Authenticate a token and register a new connection.
    ///
    /// Nothing is registered when authentication fails. On success a
    /// `joined` event is queued on `outbound`.
    pub async fn connect(
        &self,
        token: &str,
        outbound: mpsc::Sender<ServerEvent>,
    ) -> ChatResult<Arc<Connection>> {
        let (user, _session) = self.authenticator.authenticate_token(token).await?;

        let connection = Arc::new(Connection::new(user, outbound));
        self.registry.register(connection.clone()).await;

        let joined = ServerEvent::Joined {
            connection_id: connection.id(),
            user: connection.user().into(),
        };
        if let Err(error) = connection.try_deliver(joined) {
            self.registry.remove(connection.id()).await;
            return Err(error.into());
        }

        info!(
            connection_id = %connection.id(),
            user_id = connection.user().id,
            "connection authenticated"
        );
        Ok(connection)
    }

    /// Handle one event and return the direct reply, if the event has one.
    /// Broadcast results reach the caller through the registry instead.
    pub async fn dispatch(
        &self,
        connection: &Connection,
        event: ClientEvent,
    ) -> ChatResult<Option<ServerEvent>> {
        match event {
            ClientEvent::Join { .. } => Err(ChatError::validation(
                "connection is already authenticated",
            )),
            ClientEvent::JoinRoom { room_id } => {
                let room = self.rooms.join_room(connection, &room_id).await?;
                Ok(Some(ServerEvent::RoomJoined {
                    room_id: room.public_id,
                }))
            }
            ClientEvent::LeaveRoom { room_id } => {
                self.rooms.leave_room(connection, &room_id).await;
                Ok(Some(ServerEvent::RoomLeft { room_id }))
            }
            ClientEvent::SendMessage {
                room_id,
                content,
                message_type,
            } => {
                self.messages
                    .send_message(
                        connection.user(),
                        &room_id,
                        &content,
                        message_type.unwrap_or_default(),
                    )
                    .await?;
                Ok(None)
            }
            ClientEvent::Typing { room_id, is_typing } => {
                self.presence
                    .set_typing(connection, &room_id, is_typing)
                    .await?;
                Ok(None)
            }
            ClientEvent::MarkNotificationRead { notification_id } => {
                self.notifications
                    .mark_read(connection.user().id, notification_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::Ping => Ok(Some(ServerEvent::Pong)),
        }
    }

    /// Dispatch and queue the outcome on the requesting connection only.
    /// Errors never close the connection.
    pub async fn handle_event(&self, connection: &Connection, event: ClientEvent) {
        let kind = event.kind();
        let outcome = match self.dispatch(connection, event).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(error) => {
                if error.is_internal() {
                    warn!(connection_id = %connection.id(), event = kind, %error, "event failed");
                } else {
                    debug!(connection_id = %connection.id(), event = kind, %error, "event rejected");
                }
                ServerEvent::error(&error)
            }
        };

        if let Err(error) = connection.try_deliver(outcome) {
            warn!(connection_id = %connection.id(), %error, "could not queue reply, closing");
            connection.close();
            self.disconnect(connection.id()).await;
        }
    }

    /// Tear down a connection: subscriptions, typing indicators, registry
    /// entry. Safe to call more than once. Returns `false` when the registry
    /// no longer knew the connection, which is the case after a fan-out
    /// eviction; its typing indicators are still cleared.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> bool {
        let removed = self.registry.remove(connection_id).await;
        let cleared = self.presence.clear_connection(connection_id, None).await;

        let Some(removed) = removed else {
            if cleared > 0 {
                debug!(connection_id = %connection_id, typing_cleared = cleared, "evicted connection cleaned up");
            }
            return false;
        };

        removed.connection.close();
        info!(
            connection_id = %connection_id,
            user_id = removed.connection.user().id,
            rooms = removed.rooms.len(),
            typing_cleared = cleared,
            "connection closed"
        );
        true
    }

    pub fn spawn_typing_sweeper(&self) -> JoinHandle<()> {
        self.presence
            .spawn_sweeper(self.config.typing_sweep_interval())
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    pub fn messages(&self) -> &MessagePipeline {
        &self.messages
    }

    pub fn notifications(&self) -> &NotificationFanout {
        &self.notifications
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
