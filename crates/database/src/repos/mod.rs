//! Database repository implementations

pub mod message_repository;
pub mod notification_repository;
pub mod room_repository;
pub mod session_repository;
pub mod user_repository;

pub use message_repository::*;
pub use notification_repository::*;
pub use room_repository::*;
pub use session_repository::*;
pub use user_repository::*;

use cuid2::CuidConstructor;
use once_cell::sync::Lazy;

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

pub(crate) fn new_public_id() -> String {
    CUID.create_id()
}
