//! A single live socket bound to an authenticated user.

use serde::Serialize;
use storefront_database::User;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::events::ServerEvent;

pub type ConnectionId = Uuid;

/// Lifecycle of one socket. `Disconnected` is terminal; a reconnect is a new
/// connection with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Disconnected,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user: User,
    outbound: mpsc::Sender<ServerEvent>,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    pub fn new(user: User, outbound: mpsc::Sender<ServerEvent>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            user,
            outbound,
            shutdown,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Enqueue without waiting. A slow reader never stalls the caller.
    pub fn try_deliver(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        if *self.shutdown.borrow() {
            return Err(DeliveryError::Closed {
                connection_id: self.id,
            });
        }
        self.outbound.try_send(event).map_err(|error| match error {
            TrySendError::Full(_) => DeliveryError::QueueFull {
                connection_id: self.id,
            },
            TrySendError::Closed(_) => DeliveryError::Closed {
                connection_id: self.id,
            },
        })
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed() || *self.shutdown.borrow()
    }

    /// Mark the connection dead. Later deliveries fail with `Closed` and
    /// whoever owns the socket is woken through [`closed`](Self::closed).
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let _ = shutdown.wait_for(|closed| *closed).await;
    }
}

/// Point-in-time view of a registered connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSession {
    pub connection_id: ConnectionId,
    pub user_id: i64,
    pub user_public_id: String,
    pub joined_room_ids: Vec<String>,
    pub state: ConnectionState,
}
