//! # Group Chats
//!
//! Group creation is a single remote operation covering the group row
//! and its initial membership; listing joins member counts and last
//! messages on the backend side.

use std::sync::Arc;

use uuid::Uuid;

use domains::error::{AppError, Result};
use domains::models::GroupChat;
use domains::traits::{GroupChatRepo, Identity};

pub struct GroupChatService {
    repo: Arc<dyn GroupChatRepo>,
    identity: Arc<dyn Identity>,
}

impl GroupChatService {
    pub fn new(repo: Arc<dyn GroupChatRepo>, identity: Arc<dyn Identity>) -> Self {
        Self { repo, identity }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        members: &[Uuid],
    ) -> Result<Uuid> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("group name is required".into()));
        }
        self.repo
            .create(name, description, actor.id, members)
            .await
            .map_err(AppError::backend)
    }

    pub async fn list(&self) -> Result<Vec<GroupChat>> {
        self.repo.list().await.map_err(AppError::backend)
    }

    pub async fn add_members(&self, group: Uuid, members: &[Uuid]) -> Result<()> {
        self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        self.repo.add_members(group, members).await.map_err(AppError::backend)
    }
}
