//! # Storefront Chats Crate
//!
//! Realtime buyer/seller and support conversations: live room
//! subscriptions, typing indicators, presence and admin notifications.
//!
//! ## Layout
//!
//! - [`ChatHub`] authenticates sockets and dispatches [`ClientEvent`]s.
//! - [`ConnectionRegistry`] owns all live state and does fan-out.
//! - [`RoomDirectory`], [`MessagePipeline`], [`PresenceTracker`] and
//!   [`NotificationFanout`] implement the individual operations.
//!
//! REST handlers call the same services as the socket, so there is exactly
//! one write path per operation.

pub mod connection;
pub mod error;
pub mod events;
pub mod hub;
pub mod messages;
pub mod notifications;
pub mod presence;
pub mod registry;
pub mod rooms;

pub use connection::{Connection, ConnectionId, ConnectionSession, ConnectionState};
pub use error::{ChatError, ChatResult, DeliveryError};
pub use events::{
    ClientEvent, MessagePayload, NotificationPayload, RoomPayload, ServerEvent, UserPayload,
};
pub use hub::ChatHub;
pub use messages::{MessagePipeline, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use notifications::NotificationFanout;
pub use presence::PresenceTracker;
pub use registry::{ConnectionRegistry, RemovedConnection};
pub use rooms::RoomDirectory;
