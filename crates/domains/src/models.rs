//! # Domain Models
//!
//! These structs represent the core entities of the campus platform as the
//! client sees them. Rows live in the managed backend; what we hold here are
//! the shapes its queries and procedures hand back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in account, as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub university: String,
}

/// Subjects a student offers help in and wants help with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSubjects {
    pub can_help: Vec<String>,
    pub needs_help: Vec<String>,
}

/// A student profile row. XP, level and level title are computed by the
/// backend; the client never derives them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub major: Option<String>,
    pub minor: Option<String>,
    pub subjects: UserSubjects,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub xp: i64,
    pub level: u32,
    pub level_title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counters shown on a profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub topics: u32,
    pub replies: u32,
    pub likes_given: u32,
    pub likes_received: u32,
    pub friends: u32,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub major: Option<String>,
    pub minor: Option<String>,
    pub subjects: Option<UserSubjects>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
}

/// What a like can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Topic,
    Reply,
}

/// A likeable row: a topic or a single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeTarget {
    pub kind: TargetKind,
    pub id: Uuid,
}

impl LikeTarget {
    pub fn topic(id: Uuid) -> Self {
        Self { kind: TargetKind::Topic, id }
    }

    pub fn reply(id: Uuid) -> Self {
        Self { kind: TargetKind::Reply, id }
    }
}

impl std::fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TargetKind::Topic => write!(f, "topic {}", self.id),
            TargetKind::Reply => write!(f, "reply {}", self.id),
        }
    }
}

/// Denormalized author fields the backend joins into forum and message rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub avatar_url: Option<String>,
}

/// A forum category. Ordering and nesting come from the backend; `position`
/// drives the display order, `parent_id` the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub position: i32,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicSort {
    Latest,
    Trending,
}

/// A topic row as returned by the backend's listing procedure, author and
/// category joined in, plus the ids of everyone who liked it. Per-viewer
/// fields are derived client-side from `liked_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
    pub author: AuthorRef,
    pub category_name: String,
    pub category_is_private: bool,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub liked_by: Vec<Uuid>,
    pub reply_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A topic as presented to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
    pub author: AuthorRef,
    pub category_name: String,
    pub category_is_private: bool,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub like_count: u32,
    pub is_liked: bool,
    pub reply_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTopic {
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
}

/// A reply row plus the ids of everyone who liked it. Per-viewer fields
/// (`is_liked`) are derived client-side from `liked_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub content: String,
    pub author: AuthorRef,
    pub liked_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply as presented to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub content: String,
    pub author: AuthorRef,
    pub like_count: u32,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReply {
    pub author_id: Uuid,
    pub topic_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A friendship row, both sides joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,
    pub sender: AuthorRef,
    pub receiver: AuthorRef,
    pub status: FriendStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An accepted friendship oriented from one profile's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub avatar_url: Option<String>,
    pub friendship_id: Uuid,
}

/// Read receipt on a direct message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub profile_id: Uuid,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: AuthorRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_by: Vec<ReadReceipt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: Uuid,
}

/// A direct conversation summary from the actor's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub other_user: AuthorRef,
    pub last_message: Option<LastMessage>,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupLastMessage {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: Uuid,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupChat {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_count: u32,
    pub last_message: Option<GroupLastMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    Reply,
    FriendRequest,
    FriendRequestAccepted,
    Warning,
}

/// Free-form payload attached to a notification. The backend fills only the
/// fields relevant to the notification's kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationData {
    pub message_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
    pub sender_name: Option<String>,
    pub content: Option<String>,
    pub reply_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub topic_title: Option<String>,
    pub friendship_id: Option<Uuid>,
    pub warning_id: Option<Uuid>,
    pub warned_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub data: NotificationData,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Which side of the help exchange the query represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDirection {
    CanHelp,
    NeedsHelp,
}

/// Another student whose subjects intersect the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectMatch {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub major: Option<String>,
    pub minor: Option<String>,
    pub avatar_url: Option<String>,
    pub matching_subjects: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForumRole {
    User,
    Moderator,
    Admin,
}

/// A moderation ban. Active while `lifted_at` is unset and `expires_at`
/// (if any) is in the future.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub lifted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Backend tables the realtime feed reports changes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Topics,
    Replies,
    Messages,
    GroupChats,
    Notifications,
    Friendships,
    Profiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One row-change event from the backend's pub/sub. Events carry ids, not
/// payloads: subscribers refetch whatever they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub table: FeedTable,
    pub row_id: Uuid,
    /// Narrowing key, when the table has one: the topic for replies, the
    /// conversation for messages, the recipient for notifications.
    pub scope: Option<Uuid>,
}

/// A subscription filter, mirroring the backend's channel filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedInterest {
    pub table: FeedTable,
    /// `None` subscribes to the whole table.
    pub scope: Option<Uuid>,
}

impl FeedInterest {
    pub fn table(table: FeedTable) -> Self {
        Self { table, scope: None }
    }

    pub fn scoped(table: FeedTable, scope: Uuid) -> Self {
        Self { table, scope: Some(scope) }
    }
}
