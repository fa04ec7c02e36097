//! # MemoryBackend
//!
//! Every port implemented over `dashmap` tables. Constraint behavior
//! mirrors the managed backend: duplicate like/friendship pairs come
//! back as `StoreError::Duplicate` (SQLSTATE 23505), deletes of absent
//! rows as `StoreError::MissingRow` (23503). Mutations publish
//! change-feed events carrying row ids only, exactly as the real
//! realtime channel does.

mod auth;
mod forum;
mod notify;
mod profile;
mod social;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::{
    AuthUser, AuthorRef, Ban, ChangeEvent, ChangeOp, FeedInterest, FeedTable, ForumCategory,
    ForumRole, FriendStatus, LikeTarget, Notification, NotificationData, NotificationKind,
    Profile, ReadReceipt, UserSubjects,
};
use domains::traits::ChangeFeed;

const FEED_CAPACITY: usize = 64;

pub(crate) struct Account {
    pub user: AuthUser,
    pub password: String,
}

pub(crate) struct TopicRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct ReplyRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct FriendshipRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_by: Vec<ReadReceipt>,
}

pub(crate) struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The in-memory backend. Wrap it in an `Arc` and hand the same instance
/// to every service; each port trait is implemented directly on it.
#[derive(Default)]
pub struct MemoryBackend {
    pub(crate) accounts: DashMap<String, Account>,
    pub(crate) profiles: DashMap<Uuid, Profile>,
    pub(crate) categories: DashMap<Uuid, ForumCategory>,
    pub(crate) topics: DashMap<Uuid, TopicRow>,
    pub(crate) replies: DashMap<Uuid, ReplyRow>,
    pub(crate) likes: DashMap<(Uuid, LikeTarget), DateTime<Utc>>,
    pub(crate) friendships: DashMap<Uuid, FriendshipRow>,
    pub(crate) conversations: DashMap<Uuid, [Uuid; 2]>,
    pub(crate) messages: DashMap<Uuid, MessageRow>,
    pub(crate) groups: DashMap<Uuid, GroupRow>,
    pub(crate) notifications: DashMap<Uuid, Notification>,
    pub(crate) roles: DashMap<Uuid, ForumRole>,
    pub(crate) bans: DashMap<Uuid, Ban>,
    pub(crate) objects: DashMap<String, bytes::Bytes>,
    pub(crate) channels: DashMap<FeedInterest, broadcast::Sender<ChangeEvent>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends the event to the whole-table channel and, when the row has a
    /// narrowing key, to the scoped channel as well. Channels with no
    /// subscribers are skipped.
    pub(crate) fn publish(&self, op: ChangeOp, table: FeedTable, row_id: Uuid, scope: Option<Uuid>) {
        let event = ChangeEvent { op, table, row_id, scope };
        let mut interests = vec![FeedInterest::table(table)];
        if let Some(scope) = scope {
            interests.push(FeedInterest::scoped(table, scope));
        }
        for interest in interests {
            if let Some(sender) = self.channels.get(&interest) {
                let _ = sender.send(event);
            }
        }
    }

    pub(crate) fn author_ref(&self, id: Uuid) -> Result<AuthorRef, StoreError> {
        let profile = self.profiles.get(&id).ok_or(StoreError::MissingRow)?;
        Ok(AuthorRef {
            id: profile.id,
            name: profile.name.clone(),
            university: profile.university.clone(),
            avatar_url: profile.avatar_url.clone(),
        })
    }

    pub(crate) fn liked_by(&self, target: LikeTarget) -> Vec<Uuid> {
        self.likes
            .iter()
            .filter(|entry| entry.key().1 == target)
            .map(|entry| entry.key().0)
            .collect()
    }

    // ── Seed helpers for fixtures ───────────────────────────────────────

    /// Registers an account and its profile row without going through the
    /// gateway, for fixtures that need a known password.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        university: &str,
    ) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            university: university.to_string(),
        };
        self.accounts.insert(
            email.to_lowercase(),
            Account { user: user.clone(), password: password.to_string() },
        );
        self.insert_profile(user.id, name, university);
        user
    }

    /// A profile with no account behind it, for rows that only ever show
    /// up as authors or match candidates.
    pub fn seed_profile(&self, name: &str, university: &str) -> Profile {
        let id = Uuid::new_v4();
        self.insert_profile(id, name, university)
    }

    fn insert_profile(&self, id: Uuid, name: &str, university: &str) -> Profile {
        let now = Utc::now();
        let profile = Profile {
            id,
            name: name.to_string(),
            university: university.to_string(),
            bio: None,
            avatar_url: None,
            cover_image_url: None,
            major: None,
            minor: None,
            subjects: UserSubjects::default(),
            skills: Vec::new(),
            interests: Vec::new(),
            xp: 0,
            level: 1,
            level_title: "Newcomer".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.profiles.insert(id, profile.clone());
        self.publish(ChangeOp::Insert, FeedTable::Profiles, id, None);
        profile
    }

    pub fn seed_category(&self, name: &str, position: i32, is_private: bool) -> ForumCategory {
        let now = Utc::now();
        let category = ForumCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            slug: name.to_lowercase().replace(' ', "-"),
            parent_id: None,
            position,
            is_private,
            created_at: now,
            updated_at: now,
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    pub fn seed_topic(&self, author: Uuid, category: Uuid, title: &str, content: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.topics.insert(
            id,
            TopicRow {
                id,
                category_id: category,
                author_id: author,
                title: title.to_string(),
                content: content.to_string(),
                is_pinned: false,
                is_locked: false,
                created_at: now,
                updated_at: now,
            },
        );
        self.publish(ChangeOp::Insert, FeedTable::Topics, id, Some(category));
        id
    }

    pub fn lock_topic(&self, id: Uuid) {
        if let Some(mut row) = self.topics.get_mut(&id) {
            row.is_locked = true;
            row.updated_at = Utc::now();
        }
    }

    pub fn seed_reply(&self, author: Uuid, topic: Uuid, content: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.replies.insert(
            id,
            ReplyRow {
                id,
                topic_id: topic,
                author_id: author,
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        self.publish(ChangeOp::Insert, FeedTable::Replies, id, Some(topic));
        id
    }

    pub fn set_role(&self, user: Uuid, role: ForumRole) {
        self.roles.insert(user, role);
    }

    /// An active ban: no lift timestamp, no expiry.
    pub fn seed_ban(&self, user: Uuid, reason: &str) -> Ban {
        let ban = Ban {
            id: Uuid::new_v4(),
            user_id: user,
            reason: reason.to_string(),
            lifted_at: None,
            expires_at: None,
            created_at: Utc::now(),
        };
        self.bans.insert(ban.id, ban.clone());
        ban
    }

    pub fn lift_ban(&self, ban_id: Uuid) {
        if let Some(mut ban) = self.bans.get_mut(&ban_id) {
            ban.lifted_at = Some(Utc::now());
        }
    }

    pub fn seed_notification(
        &self,
        user: Uuid,
        kind: NotificationKind,
        data: NotificationData,
        created_at: DateTime<Utc>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user,
            kind,
            data,
            read: false,
            created_at,
        };
        self.notifications.insert(notification.id, notification.clone());
        self.publish(ChangeOp::Insert, FeedTable::Notifications, notification.id, Some(user));
        notification
    }
}

impl ChangeFeed for MemoryBackend {
    fn subscribe(&self, interest: FeedInterest) -> broadcast::Receiver<ChangeEvent> {
        self.channels
            .entry(interest)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .subscribe()
    }
}
