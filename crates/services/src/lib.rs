//! # Services
//!
//! The client-side business layer of the campus platform. Everything
//! here talks to the managed backend exclusively through the port traits
//! in `domains`; adapters supply the implementations. The one real state
//! machine lives in [`like_toggle`]; the rest are thin orchestration over
//! the backend's query and procedure surface.

pub mod conversation;
pub mod forum;
pub mod friendship;
pub mod group_chat;
pub mod like_toggle;
pub mod matching;
pub mod notification;
pub mod permission;
pub mod profile;
pub mod retry;
pub mod session;

pub use conversation::{ChatHistory, ConversationService};
pub use forum::{ForumService, ReplyThread};
pub use friendship::FriendshipService;
pub use group_chat::GroupChatService;
pub use like_toggle::{LikeToggleController, LikeView, DEFAULT_DEBOUNCE};
pub use matching::MatchingService;
pub use notification::{NotificationFeed, NotificationService};
pub use permission::PermissionService;
pub use profile::ProfileService;
pub use retry::{with_retry, with_retry_policy, RetryPolicy};
pub use session::{validate_university_email, Session, UNIVERSITY_DOMAINS};
