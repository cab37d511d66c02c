//! Domain entities for the database layer

pub mod message;
pub mod notification;
pub mod room;
pub mod session;
pub mod user;

pub use message::{Message, MessageType};
pub use notification::Notification;
pub use room::{Room, RoomKind};
pub use session::AuthSession;
pub use user::{User, UserRole};
