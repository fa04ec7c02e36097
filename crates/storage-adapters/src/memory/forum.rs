//! Forum tables and the like-pair store. Listing joins authors, category
//! fields, liked-by sets, and reply counts the way the backend's
//! procedures do; the like table enforces the uniqueness constraint the
//! toggle controller relies on.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::{
    ChangeOp, FeedTable, ForumCategory, LikeTarget, NewReply, NewTopic, ReplyRecord, TargetKind,
    TopicRecord, TopicSort,
};
use domains::traits::{ForumRepo, LikeStore};

use super::{MemoryBackend, ReplyRow, TopicRow};

impl MemoryBackend {
    fn topic_record(&self, row: &TopicRow) -> Result<TopicRecord, StoreError> {
        let category = self
            .categories
            .get(&row.category_id)
            .ok_or(StoreError::MissingRow)?;
        Ok(TopicRecord {
            id: row.id,
            category_id: row.category_id,
            title: row.title.clone(),
            content: row.content.clone(),
            author: self.author_ref(row.author_id)?,
            category_name: category.name.clone(),
            category_is_private: category.is_private,
            is_pinned: row.is_pinned,
            is_locked: row.is_locked,
            liked_by: self.liked_by(LikeTarget::topic(row.id)),
            reply_count: self
                .replies
                .iter()
                .filter(|r| r.topic_id == row.id)
                .count() as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn reply_record(&self, row: &ReplyRow) -> Result<ReplyRecord, StoreError> {
        Ok(ReplyRecord {
            id: row.id,
            topic_id: row.topic_id,
            content: row.content.clone(),
            author: self.author_ref(row.author_id)?,
            liked_by: self.liked_by(LikeTarget::reply(row.id)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// A like flip shows up to other viewers as an update on the target
    /// row, since `liked_by` rides along with it.
    fn publish_like_change(&self, target: LikeTarget) {
        let (table, scope) = match target.kind {
            TargetKind::Topic => (
                FeedTable::Topics,
                self.topics.get(&target.id).map(|t| t.category_id),
            ),
            TargetKind::Reply => (
                FeedTable::Replies,
                self.replies.get(&target.id).map(|r| r.topic_id),
            ),
        };
        self.publish(ChangeOp::Update, table, target.id, scope);
    }
}

#[async_trait]
impl ForumRepo for MemoryBackend {
    async fn list_categories(&self) -> Result<Vec<ForumCategory>, StoreError> {
        Ok(self.categories.iter().map(|c| c.clone()).collect())
    }

    async fn list_topics(
        &self,
        sort: TopicSort,
        category: Option<Uuid>,
    ) -> Result<Vec<TopicRecord>, StoreError> {
        let mut records = Vec::new();
        for row in self.topics.iter() {
            if category.is_some_and(|c| c != row.category_id) {
                continue;
            }
            records.push(self.topic_record(&row)?);
        }
        // Pinned topics lead in both orders, as the backend's procedures
        // return them.
        match sort {
            TopicSort::Latest => {
                records.sort_by(|a, b| {
                    b.is_pinned
                        .cmp(&a.is_pinned)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
            TopicSort::Trending => {
                records.sort_by(|a, b| {
                    let heat = |t: &TopicRecord| t.liked_by.len() as u32 + t.reply_count;
                    b.is_pinned
                        .cmp(&a.is_pinned)
                        .then(heat(b).cmp(&heat(a)))
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
        }
        Ok(records)
    }

    async fn get_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, StoreError> {
        match self.topics.get(&id) {
            Some(row) => Ok(Some(self.topic_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_topic(&self, draft: NewTopic) -> Result<TopicRecord, StoreError> {
        if !self.categories.contains_key(&draft.category_id) {
            return Err(StoreError::MissingRow);
        }
        let now = Utc::now();
        let row = TopicRow {
            id: Uuid::new_v4(),
            category_id: draft.category_id,
            author_id: draft.author_id,
            title: draft.title,
            content: draft.content,
            is_pinned: false,
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        let record = self.topic_record(&row)?;
        self.topics.insert(row.id, row);
        self.publish(
            ChangeOp::Insert,
            FeedTable::Topics,
            record.id,
            Some(record.category_id),
        );
        Ok(record)
    }

    async fn list_replies(&self, topic_id: Uuid) -> Result<Vec<ReplyRecord>, StoreError> {
        let mut records = Vec::new();
        for row in self.replies.iter() {
            if row.topic_id == topic_id {
                records.push(self.reply_record(&row)?);
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn get_reply(&self, id: Uuid) -> Result<Option<ReplyRecord>, StoreError> {
        match self.replies.get(&id) {
            Some(row) => Ok(Some(self.reply_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_reply(&self, draft: NewReply) -> Result<ReplyRecord, StoreError> {
        if !self.topics.contains_key(&draft.topic_id) {
            return Err(StoreError::MissingRow);
        }
        let now = Utc::now();
        let row = ReplyRow {
            id: Uuid::new_v4(),
            topic_id: draft.topic_id,
            author_id: draft.author_id,
            content: draft.content,
            created_at: now,
            updated_at: now,
        };
        let record = self.reply_record(&row)?;
        self.replies.insert(row.id, row);
        self.publish(
            ChangeOp::Insert,
            FeedTable::Replies,
            record.id,
            Some(record.topic_id),
        );
        Ok(record)
    }
}

#[async_trait]
impl LikeStore for MemoryBackend {
    async fn insert(&self, actor: Uuid, target: LikeTarget) -> Result<(), StoreError> {
        let exists = match target.kind {
            TargetKind::Topic => self.topics.contains_key(&target.id),
            TargetKind::Reply => self.replies.contains_key(&target.id),
        };
        if !exists {
            return Err(StoreError::MissingRow);
        }
        match self.likes.entry((actor, target)) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Duplicate),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                self.publish_like_change(target);
                Ok(())
            }
        }
    }

    async fn delete(&self, actor: Uuid, target: LikeTarget) -> Result<(), StoreError> {
        match self.likes.remove(&(actor, target)) {
            Some(_) => {
                self.publish_like_change(target);
                Ok(())
            }
            None => Err(StoreError::MissingRow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryBackend, Uuid, Uuid) {
        let backend = MemoryBackend::new();
        let author = backend.seed_profile("Ada", "ODTÜ");
        let category = backend.seed_category("General", 0, false);
        let topic = backend.seed_topic(author.id, category.id, "Hello", "first");
        (backend, author.id, topic)
    }

    #[tokio::test]
    async fn double_like_violates_the_pair_constraint() {
        let (backend, actor, topic) = seeded();
        let target = LikeTarget::topic(topic);

        LikeStore::insert(&backend, actor, target).await.unwrap();
        let err = LikeStore::insert(&backend, actor, target).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate);
    }

    #[tokio::test]
    async fn unliking_an_absent_pair_is_a_missing_row() {
        let (backend, actor, topic) = seeded();
        let err = LikeStore::delete(&backend, actor, LikeTarget::topic(topic))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::MissingRow);
    }

    #[tokio::test]
    async fn likes_ride_along_on_the_listed_record() {
        let (backend, actor, topic) = seeded();
        LikeStore::insert(&backend, actor, LikeTarget::topic(topic))
            .await
            .unwrap();

        let record = backend.get_topic(topic).await.unwrap().unwrap();
        assert_eq!(record.liked_by, vec![actor]);
    }

    #[tokio::test]
    async fn trending_ranks_by_activity_with_pins_first() {
        let (backend, author, quiet) = seeded();
        let category = backend.topics.get(&quiet).unwrap().category_id;
        let busy = backend.seed_topic(author, category, "Busy", "lots going on");
        backend.seed_reply(author, busy, "a reply");
        LikeStore::insert(&backend, author, LikeTarget::topic(busy))
            .await
            .unwrap();

        let listed = backend.list_topics(TopicSort::Trending, None).await.unwrap();
        assert_eq!(listed[0].id, busy);
        assert_eq!(listed[1].id, quiet);
    }

    #[tokio::test]
    async fn replying_to_a_missing_topic_is_a_missing_row() {
        let (backend, author, _) = seeded();
        let err = backend
            .create_reply(NewReply {
                author_id: author,
                topic_id: Uuid::new_v4(),
                content: "into the void".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::MissingRow);
    }
}
