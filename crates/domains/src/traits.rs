//! # Core Traits (Ports)
//!
//! Contracts for everything the managed backend does on our behalf. The
//! service layer only ever talks to these; adapters (and test doubles)
//! supply the implementations.

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AuthUser, ChangeEvent, Conversation, FeedInterest, ForumCategory, ForumRole, FriendStatus,
    Friendship, GroupChat, LikeTarget, Message, NewReply, NewTopic, Notification, Profile,
    ProfileChanges, ProfileStats, ReplyRecord, TopicRecord, TopicSort,
};

/// The auth service boundary: account creation and session issuance.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        university: &str,
    ) -> Result<AuthUser, StoreError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;

    async fn sign_out(&self) -> Result<(), StoreError>;
}

/// Who is acting right now. Controllers read this at call time, so a
/// sign-out is picked up by the very next interaction.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;
}

/// The like-pair table. One row per (actor, target); the backend's
/// uniqueness constraint is the only duplicate protection.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait LikeStore: Send + Sync {
    async fn insert(&self, actor: Uuid, target: LikeTarget) -> Result<(), StoreError>;
    async fn delete(&self, actor: Uuid, target: LikeTarget) -> Result<(), StoreError>;
}

/// Forum query and write surface. Sorting and join semantics live behind
/// the backend's procedures; this trait only names them.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ForumRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<ForumCategory>, StoreError>;
    async fn list_topics(
        &self,
        sort: TopicSort,
        category: Option<Uuid>,
    ) -> Result<Vec<TopicRecord>, StoreError>;
    async fn get_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, StoreError>;
    async fn create_topic(&self, draft: NewTopic) -> Result<TopicRecord, StoreError>;
    async fn list_replies(&self, topic_id: Uuid) -> Result<Vec<ReplyRecord>, StoreError>;
    async fn get_reply(&self, id: Uuid) -> Result<Option<ReplyRecord>, StoreError>;
    async fn create_reply(&self, draft: NewReply) -> Result<ReplyRecord, StoreError>;
}

/// The friendships table: pending/accepted/rejected rows with a unique
/// pair constraint.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait FriendshipRepo: Send + Sync {
    async fn insert_request(
        &self,
        sender: Uuid,
        receiver: Uuid,
        message: Option<String>,
    ) -> Result<Friendship, StoreError>;
    async fn set_status(&self, id: Uuid, status: FriendStatus) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn accepted_for(&self, profile: Uuid) -> Result<Vec<Friendship>, StoreError>;
    async fn pending_received(&self, user: Uuid) -> Result<Vec<Friendship>, StoreError>;
    async fn pending_sent(&self, user: Uuid) -> Result<Vec<Friendship>, StoreError>;
    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError>;
}

/// Conversation lookup and creation (remote procedures in the backend).
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ConversationRepo: Send + Sync {
    async fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Uuid>, StoreError>;
    async fn create_with_participants(&self, a: Uuid, b: Uuid) -> Result<Uuid, StoreError>;
    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Conversation>, StoreError>;
    async fn mark_read(&self, conversation: Uuid, user: Uuid) -> Result<(), StoreError>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepo: Send + Sync {
    async fn list(&self, conversation: Uuid) -> Result<Vec<Message>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Message>, StoreError>;
    async fn send(
        &self,
        conversation: Uuid,
        sender: Uuid,
        content: &str,
    ) -> Result<Message, StoreError>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait GroupChatRepo: Send + Sync {
    /// Creates the group and its initial membership in one remote operation.
    async fn create<'a>(
        &'a self,
        name: &'a str,
        description: Option<&'a str>,
        creator: Uuid,
        members: &'a [Uuid],
    ) -> Result<Uuid, StoreError>;
    async fn list(&self) -> Result<Vec<GroupChat>, StoreError>;
    async fn add_members(&self, group: Uuid, members: &[Uuid]) -> Result<(), StoreError>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait NotificationRepo: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Notification>, StoreError>;
    async fn mark_read(&self, id: Uuid) -> Result<(), StoreError>;
    async fn mark_all_read(&self, user: Uuid) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn delete_all(&self, user: Uuid) -> Result<(), StoreError>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    /// Every profile except the given one. Ban filtering is the caller's job.
    async fn list_others(&self, excluding: Uuid) -> Result<Vec<Profile>, StoreError>;
    async fn update(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError>;
    async fn stats(&self, id: Uuid) -> Result<ProfileStats, StoreError>;
}

/// Remote role procedures. Role storage and the checks themselves are
/// backend logic.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait RoleGateway: Send + Sync {
    async fn role_of(&self, user: Uuid) -> Result<ForumRole, StoreError>;
    async fn has_permission(&self, user: Uuid, required: ForumRole) -> Result<bool, StoreError>;
    async fn is_admin(&self, user: Uuid) -> Result<bool, StoreError>;
    async fn is_moderator(&self, user: Uuid, category: Option<Uuid>) -> Result<bool, StoreError>;
}

/// Read-only visibility into moderation state. Issuing bans and warnings
/// is backend logic.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ModerationRepo: Send + Sync {
    async fn active_ban_user_ids(&self) -> Result<Vec<Uuid>, StoreError>;
    async fn is_banned(&self, user: Uuid) -> Result<bool, StoreError>;
}

/// Object storage for profile imagery. Returns a public URL.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_avatar(
        &self,
        owner: Uuid,
        data: Bytes,
        content_type: Mime,
    ) -> Result<String, StoreError>;
    async fn upload_cover(
        &self,
        owner: Uuid,
        data: Bytes,
        content_type: Mime,
    ) -> Result<String, StoreError>;
}

/// The backend's realtime pub/sub. Receivers that fall behind get a
/// `Lagged` error from the channel and should refetch; events carry ids,
/// not payloads.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, interest: FeedInterest) -> broadcast::Receiver<ChangeEvent>;
}
