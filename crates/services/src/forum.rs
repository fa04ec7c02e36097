//! # Forum
//!
//! Topic feeds, reply threads, and the create paths. The backend's
//! procedures own sorting and join semantics; this layer derives the
//! per-viewer fields (`is_liked`) and keeps a reply thread's cache in
//! step with the change feed.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use domains::error::{AppError, Result};
use domains::models::{
    AuthUser, ChangeEvent, ChangeOp, FeedInterest, FeedTable, ForumCategory, NewReply, NewTopic,
    Reply, ReplyRecord, Topic, TopicRecord, TopicSort,
};
use domains::traits::{ChangeFeed, ForumRepo, Identity};

use crate::permission::PermissionService;
use crate::retry::with_retry;

pub(crate) fn present_topic(record: TopicRecord, viewer: Option<&AuthUser>) -> Topic {
    let is_liked = viewer.map_or(false, |v| record.liked_by.contains(&v.id));
    Topic {
        id: record.id,
        category_id: record.category_id,
        title: record.title,
        content: record.content,
        author: record.author,
        category_name: record.category_name,
        category_is_private: record.category_is_private,
        is_pinned: record.is_pinned,
        is_locked: record.is_locked,
        like_count: record.liked_by.len() as u32,
        is_liked,
        reply_count: record.reply_count,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub(crate) fn present_reply(record: ReplyRecord, viewer: Option<&AuthUser>) -> Reply {
    let is_liked = viewer.map_or(false, |v| record.liked_by.contains(&v.id));
    Reply {
        id: record.id,
        topic_id: record.topic_id,
        content: record.content,
        author: record.author,
        like_count: record.liked_by.len() as u32,
        is_liked,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub struct ForumService {
    repo: Arc<dyn ForumRepo>,
    identity: Arc<dyn Identity>,
    permissions: Arc<PermissionService>,
    feed: Arc<dyn ChangeFeed>,
}

impl ForumService {
    pub fn new(
        repo: Arc<dyn ForumRepo>,
        identity: Arc<dyn Identity>,
        permissions: Arc<PermissionService>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self { repo, identity, permissions, feed }
    }

    /// Categories in display order. Private ones are dropped unless the
    /// permission service clears the viewer for them.
    pub async fn categories(&self) -> Result<Vec<ForumCategory>> {
        let fetched = with_retry(|| async {
            self.repo.list_categories().await.map_err(AppError::backend)
        })
        .await?;

        let viewer = self.identity.current_user();
        let mut visible = Vec::with_capacity(fetched.len());
        for category in fetched {
            if self.permissions.can_view_category(viewer.as_ref(), &category).await {
                visible.push(category);
            }
        }
        visible.sort_by_key(|c| c.position);
        Ok(visible)
    }

    pub async fn topics(&self, sort: TopicSort, category: Option<Uuid>) -> Result<Vec<Topic>> {
        let records = with_retry(|| async {
            self.repo.list_topics(sort, category).await.map_err(AppError::backend)
        })
        .await?;

        let viewer = self.identity.current_user();
        Ok(records.into_iter().map(|r| present_topic(r, viewer.as_ref())).collect())
    }

    pub async fn topic(&self, id: Uuid) -> Result<Topic> {
        let record = self
            .repo
            .get_topic(id)
            .await
            .map_err(AppError::backend)?
            .ok_or_else(|| AppError::NotFound("topic".into(), id.to_string()))?;
        let viewer = self.identity.current_user();
        Ok(present_topic(record, viewer.as_ref()))
    }

    pub async fn create_topic(
        &self,
        category_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Topic> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(AppError::Validation("topic title is required".into()));
        }
        if content.is_empty() {
            return Err(AppError::Validation("topic content is required".into()));
        }

        let record = self
            .repo
            .create_topic(NewTopic {
                author_id: actor.id,
                category_id,
                title: title.to_string(),
                content: content.to_string(),
            })
            .await
            .map_err(AppError::backend)?;
        Ok(present_topic(record, Some(&actor)))
    }

    pub async fn create_reply(&self, topic_id: Uuid, content: &str) -> Result<Reply> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("reply content is required".into()));
        }

        let topic = self
            .repo
            .get_topic(topic_id)
            .await
            .map_err(AppError::backend)?
            .ok_or_else(|| AppError::NotFound("topic".into(), topic_id.to_string()))?;
        if topic.is_locked {
            return Err(AppError::Forbidden("this topic is locked".into()));
        }

        let record = self
            .repo
            .create_reply(NewReply {
                author_id: actor.id,
                topic_id,
                content: content.to_string(),
            })
            .await
            .map_err(AppError::backend)?;
        Ok(present_reply(record, Some(&actor)))
    }

    /// Loads a topic's replies and subscribes to their change events.
    pub async fn open_thread(&self, topic_id: Uuid) -> Result<ReplyThread> {
        let events = self
            .feed
            .subscribe(FeedInterest::scoped(FeedTable::Replies, topic_id));
        let mut thread = ReplyThread {
            repo: self.repo.clone(),
            identity: self.identity.clone(),
            topic_id,
            replies: Vec::new(),
            events,
        };
        thread.reload().await?;
        Ok(thread)
    }
}

/// A topic's cached reply list, kept in step with the change feed.
/// Events carry row ids only, so inserts refetch the complete row.
pub struct ReplyThread {
    repo: Arc<dyn ForumRepo>,
    identity: Arc<dyn Identity>,
    topic_id: Uuid,
    replies: Vec<Reply>,
    events: broadcast::Receiver<ChangeEvent>,
}

impl ReplyThread {
    pub fn topic_id(&self) -> Uuid {
        self.topic_id
    }

    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    pub async fn reload(&mut self) -> Result<()> {
        let records = self
            .repo
            .list_replies(self.topic_id)
            .await
            .map_err(AppError::backend)?;
        let viewer = self.identity.current_user();
        self.replies = records
            .into_iter()
            .map(|r| present_reply(r, viewer.as_ref()))
            .collect();
        Ok(())
    }

    /// Drains queued feed events into the cached list. A lagged receiver
    /// lost events it cannot replay, so it refetches the whole thread.
    pub async fn pump(&mut self) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event).await?,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(topic = %self.topic_id, skipped, "reply feed lagged, reloading");
                    self.reload().await?;
                }
                Err(_) => return Ok(()),
            }
        }
    }

    async fn apply(&mut self, event: ChangeEvent) -> Result<()> {
        match event.op {
            ChangeOp::Insert => {
                let Some(record) = self
                    .repo
                    .get_reply(event.row_id)
                    .await
                    .map_err(AppError::backend)?
                else {
                    return Ok(());
                };
                let viewer = self.identity.current_user();
                self.replies.push(present_reply(record, viewer.as_ref()));
            }
            ChangeOp::Update => {
                let Some(record) = self
                    .repo
                    .get_reply(event.row_id)
                    .await
                    .map_err(AppError::backend)?
                else {
                    return Ok(());
                };
                if let Some(cached) = self.replies.iter_mut().find(|r| r.id == event.row_id) {
                    cached.content = record.content;
                    cached.updated_at = record.updated_at;
                }
            }
            ChangeOp::Delete => {
                self.replies.retain(|r| r.id != event.row_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::models::AuthorRef;
    use domains::traits::{MockForumRepo, MockIdentity};

    fn author() -> AuthorRef {
        AuthorRef {
            id: Uuid::new_v4(),
            name: "Elif".into(),
            university: "İTÜ".into(),
            avatar_url: None,
        }
    }

    fn topic_record(locked: bool, liked_by: Vec<Uuid>) -> TopicRecord {
        TopicRecord {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            title: "Study group for calculus".into(),
            content: "Anyone up for a weekly session?".into(),
            author: author(),
            category_name: "Mathematics".into(),
            category_is_private: false,
            is_pinned: false,
            is_locked: locked,
            liked_by,
            reply_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn signed_in(user: AuthUser) -> Arc<MockIdentity> {
        let mut identity = MockIdentity::new();
        identity.expect_current_user().return_const(Some(user));
        Arc::new(identity)
    }

    fn viewer() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "elif@itu.edu.tr".into(),
            name: "Elif".into(),
            university: "İTÜ".into(),
        }
    }

    #[test]
    fn per_viewer_fields_come_from_liked_by() {
        let user = viewer();
        let record = topic_record(false, vec![user.id, Uuid::new_v4()]);
        let topic = present_topic(record, Some(&user));
        assert!(topic.is_liked);
        assert_eq!(topic.like_count, 2);

        let record = topic_record(false, vec![Uuid::new_v4()]);
        let topic = present_topic(record, None);
        assert!(!topic.is_liked);
        assert_eq!(topic.like_count, 1);
    }

    #[tokio::test]
    async fn replying_to_a_locked_topic_is_forbidden() {
        let locked = topic_record(true, Vec::new());
        let topic_id = locked.id;
        let mut repo = MockForumRepo::new();
        repo.expect_get_topic()
            .returning(move |_| Ok(Some(locked.clone())));

        let service = ForumService::new(
            Arc::new(repo),
            signed_in(viewer()),
            Arc::new(PermissionService::new(Arc::new(
                domains::traits::MockRoleGateway::new(),
            ))),
            Arc::new(domains::traits::MockChangeFeed::new()),
        );

        let err = service.create_reply(topic_id, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn empty_reply_content_is_rejected_before_any_fetch() {
        // No expectations on the repo: a fetch would panic the test.
        let service = ForumService::new(
            Arc::new(MockForumRepo::new()),
            signed_in(viewer()),
            Arc::new(PermissionService::new(Arc::new(
                domains::traits::MockRoleGateway::new(),
            ))),
            Arc::new(domains::traits::MockChangeFeed::new()),
        );

        let err = service.create_reply(Uuid::new_v4(), "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
