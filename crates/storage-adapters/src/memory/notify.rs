//! The notifications table. Rows are created by other mutations (message
//! sends, friend requests) the way the real backend's triggers do, and
//! every change lands on the recipient's feed channel.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::{
    ChangeOp, FeedTable, Notification, NotificationData, NotificationKind,
};
use domains::traits::NotificationRepo;

use super::MemoryBackend;

impl MemoryBackend {
    /// Trigger-style insert used by the other tables' mutations.
    pub(crate) fn push_notification(
        &self,
        user: Uuid,
        kind: NotificationKind,
        data: NotificationData,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user,
            kind,
            data,
            read: false,
            created_at: Utc::now(),
        };
        let id = notification.id;
        self.notifications.insert(id, notification);
        self.publish(ChangeOp::Insert, FeedTable::Notifications, id, Some(user));
    }
}

#[async_trait]
impl NotificationRepo for MemoryBackend {
    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Notification>, StoreError> {
        let mut rows: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user)
            .map(|n| n.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), StoreError> {
        let user = {
            let mut row = self.notifications.get_mut(&id).ok_or(StoreError::MissingRow)?;
            row.read = true;
            row.user_id
        };
        self.publish(ChangeOp::Update, FeedTable::Notifications, id, Some(user));
        Ok(())
    }

    async fn mark_all_read(&self, user: Uuid) -> Result<(), StoreError> {
        let mut touched = Vec::new();
        for mut row in self.notifications.iter_mut() {
            if row.user_id == user && !row.read {
                row.read = true;
                touched.push(row.id);
            }
        }
        for id in touched {
            self.publish(ChangeOp::Update, FeedTable::Notifications, id, Some(user));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let (removed, row) = self.notifications.remove(&id).ok_or(StoreError::MissingRow)?;
        self.publish(ChangeOp::Delete, FeedTable::Notifications, removed, Some(row.user_id));
        Ok(())
    }

    async fn delete_all(&self, user: Uuid) -> Result<(), StoreError> {
        let mine: Vec<Uuid> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user)
            .map(|n| n.id)
            .collect();
        for id in mine {
            self.notifications.remove(&id);
            self.publish(ChangeOp::Delete, FeedTable::Notifications, id, Some(user));
        }
        Ok(())
    }
}
