//! crates/domains/src/lib.rs
//!
//! The central domain models and interface definitions for the campus
//! platform client.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn like_target_carries_kind_and_id() {
        let id = Uuid::new_v4();
        let target = LikeTarget::reply(id);
        assert_eq!(target.kind, TargetKind::Reply);
        assert_eq!(target.id, id);
        assert_eq!(format!("{target}"), format!("reply {id}"));
    }

    #[test]
    fn forum_roles_order_by_privilege() {
        assert!(ForumRole::Admin > ForumRole::Moderator);
        assert!(ForumRole::Moderator > ForumRole::User);
    }

    #[test]
    fn notification_data_defaults_to_empty_payload() {
        let data = NotificationData::default();
        let json = serde_json::to_value(&data).expect("serializable");
        assert!(json.is_object());
        assert!(data.conversation_id.is_none());
    }
}
