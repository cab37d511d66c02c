//! Admin notifications: persist first, then push to live connections.

use std::sync::Arc;

use storefront_database::{Notification, NotificationRepository, SqlitePool, UserRepository};
use tracing::{info, warn};

use crate::error::{ChatError, ChatResult};
use crate::events::ServerEvent;
use crate::registry::ConnectionRegistry;

pub struct NotificationFanout {
    notifications: NotificationRepository,
    users: UserRepository,
    registry: Arc<ConnectionRegistry>,
}

impl NotificationFanout {
    pub fn new(pool: SqlitePool, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            notifications: NotificationRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            registry,
        }
    }

    /// Store a notification and push it to every live connection of the
    /// recipient. Offline users see it the next time they list.
    pub async fn notify(&self, user_id: i64, title: &str, content: &str) -> ChatResult<Notification> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ChatError::validation(
                "notification title and content must not be empty",
            ));
        }

        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(ChatError::validation(format!("unknown recipient {user_id}")));
        }

        let notification = self.notifications.create(user_id, title, content).await?;
        let delivered = self
            .registry
            .send_to_user(
                user_id,
                &ServerEvent::AdminNotification {
                    notification: (&notification).into(),
                },
            )
            .await;

        info!(
            notification_id = notification.id,
            user_id,
            delivered,
            "notification sent"
        );
        Ok(notification)
    }

    /// Same as [`notify`](Self::notify), addressed by public user id.
    pub async fn notify_public_id(
        &self,
        public_id: &str,
        title: &str,
        content: &str,
    ) -> ChatResult<Notification> {
        let user = self
            .users
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::validation(format!("unknown recipient {public_id}")))?;
        self.notify(user.id, title, content).await
    }

    /// Mark one notification read. Ownership is checked before anything is
    /// written; all of the owner's connections are told.
    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> ChatResult<Notification> {
        let existing = self
            .notifications
            .find_by_id(notification_id)
            .await?
            .ok_or(ChatError::NotificationNotFound {
                id: notification_id,
            })?;

        if existing.user_id != user_id {
            warn!(user_id, notification_id, "rejected mark-read on foreign notification");
            return Err(ChatError::authorization(
                "notification belongs to another user",
            ));
        }

        let updated = self
            .notifications
            .mark_read(notification_id, user_id)
            .await?
            .ok_or(ChatError::NotificationNotFound {
                id: notification_id,
            })?;

        self.registry
            .send_to_user(user_id, &ServerEvent::NotificationRead { notification_id })
            .await;
        Ok(updated)
    }

    pub async fn list_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
    ) -> ChatResult<Vec<Notification>> {
        Ok(self.notifications.list_for_user(user_id, unread_only).await?)
    }

    pub async fn unread_count(&self, user_id: i64) -> ChatResult<i64> {
        Ok(self.notifications.unread_count(user_id).await?)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> ChatResult<u64> {
        let updated = self.notifications.mark_all_read(user_id).await?;
        info!(user_id, updated, "marked all notifications read");
        Ok(updated)
    }
}
