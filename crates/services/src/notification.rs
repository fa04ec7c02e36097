//! # Notifications
//!
//! The actor's notification feed. Message notifications collapse to the
//! most recent one per conversation before display; everything else is
//! shown as-is, newest first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use domains::error::{AppError, Result};
use domains::models::{
    ChangeEvent, FeedInterest, FeedTable, Notification, NotificationKind,
};
use domains::traits::{ChangeFeed, Identity, NotificationRepo};

pub struct NotificationService {
    repo: Arc<dyn NotificationRepo>,
    identity: Arc<dyn Identity>,
    feed: Arc<dyn ChangeFeed>,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepo>,
        identity: Arc<dyn Identity>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self { repo, identity, feed }
    }

    /// Opens the signed-in actor's feed: fetches once and subscribes to
    /// the actor's notification events.
    pub async fn open(&self) -> Result<NotificationFeed> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let events = self
            .feed
            .subscribe(FeedInterest::scoped(FeedTable::Notifications, actor.id));
        let mut feed = NotificationFeed {
            repo: self.repo.clone(),
            user: actor.id,
            notifications: Vec::new(),
            unread: 0,
            events,
        };
        feed.refresh().await?;
        Ok(feed)
    }
}

pub struct NotificationFeed {
    repo: Arc<dyn NotificationRepo>,
    user: Uuid,
    notifications: Vec<Notification>,
    unread: u32,
    events: broadcast::Receiver<ChangeEvent>,
}

impl NotificationFeed {
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> u32 {
        self.unread
    }

    /// Refetches and regroups the feed. Message notifications are keyed
    /// by conversation and only the most recent per conversation is kept;
    /// the merged list is re-sorted newest first and the unread count
    /// recomputed over what is shown.
    pub async fn refresh(&mut self) -> Result<()> {
        let fetched = self
            .repo
            .list_for_user(self.user)
            .await
            .map_err(AppError::backend)?;

        let mut per_conversation: HashMap<Uuid, Notification> = HashMap::new();
        let mut rest = Vec::new();
        for notification in fetched {
            match (notification.kind, notification.data.conversation_id) {
                (NotificationKind::Message, Some(conversation)) => {
                    match per_conversation.get(&conversation) {
                        Some(kept) if kept.created_at >= notification.created_at => {}
                        _ => {
                            per_conversation.insert(conversation, notification);
                        }
                    }
                }
                _ => rest.push(notification),
            }
        }

        let mut merged: Vec<Notification> =
            per_conversation.into_values().chain(rest).collect();
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.unread = merged.iter().filter(|n| !n.read).count() as u32;
        self.notifications = merged;
        Ok(())
    }

    /// Any event on the actor's notifications invalidates the grouping,
    /// so the whole feed refetches.
    pub async fn pump(&mut self) -> Result<()> {
        let mut dirty = false;
        loop {
            match self.events.try_recv() {
                Ok(_) => dirty = true,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(user = %self.user, skipped, "notification feed lagged");
                    dirty = true;
                }
                Err(_) => break,
            }
        }
        if dirty {
            self.refresh().await?;
        }
        Ok(())
    }

    pub async fn mark_read(&mut self, id: Uuid) -> Result<()> {
        self.repo.mark_read(id).await.map_err(AppError::backend)?;
        if let Some(cached) = self.notifications.iter_mut().find(|n| n.id == id) {
            if !cached.read {
                cached.read = true;
                self.unread = self.unread.saturating_sub(1);
            }
        }
        Ok(())
    }

    pub async fn mark_all_read(&mut self) -> Result<()> {
        self.repo.mark_all_read(self.user).await.map_err(AppError::backend)?;
        for cached in &mut self.notifications {
            cached.read = true;
        }
        self.unread = 0;
        Ok(())
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        self.repo.delete(id).await.map_err(AppError::backend)?;
        if let Some(index) = self.notifications.iter().position(|n| n.id == id) {
            let removed = self.notifications.remove(index);
            if !removed.read {
                self.unread = self.unread.saturating_sub(1);
            }
        }
        Ok(())
    }

    pub async fn delete_all(&mut self) -> Result<()> {
        self.repo.delete_all(self.user).await.map_err(AppError::backend)?;
        self.notifications.clear();
        self.unread = 0;
        Ok(())
    }
}
