//! # Permissions
//!
//! Thin layer over the backend's role procedures. Role storage and the
//! checks themselves are backend logic; what this layer adds is the
//! degradation rule: a failed lookup reads as the default role, never as
//! an error the UI has to handle.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use domains::models::{AuthUser, ForumCategory, ForumRole};
use domains::traits::RoleGateway;

pub struct PermissionService {
    roles: Arc<dyn RoleGateway>,
}

impl PermissionService {
    pub fn new(roles: Arc<dyn RoleGateway>) -> Self {
        Self { roles }
    }

    /// Lookup failures degrade to `User` rather than propagate.
    pub async fn role_of(&self, user: Uuid) -> ForumRole {
        match self.roles.role_of(user).await {
            Ok(role) => role,
            Err(err) => {
                warn!(%user, error = %err, "role lookup failed, defaulting to user");
                ForumRole::User
            }
        }
    }

    pub async fn has_permission(&self, user: Uuid, required: ForumRole) -> bool {
        match self.roles.has_permission(user, required).await {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(%user, error = %err, "permission check failed, using degraded role");
                self.role_of(user).await >= required
            }
        }
    }

    pub async fn is_admin(&self, user: Uuid) -> bool {
        match self.roles.is_admin(user).await {
            Ok(admin) => admin,
            Err(err) => {
                warn!(%user, error = %err, "admin check failed, denying");
                false
            }
        }
    }

    pub async fn is_moderator(&self, user: Uuid, category: Option<Uuid>) -> bool {
        match self.roles.is_moderator(user, category).await {
            Ok(moderator) => moderator,
            Err(err) => {
                warn!(%user, error = %err, "moderator check failed, denying");
                false
            }
        }
    }

    /// Public categories are visible to everyone; private ones only to
    /// moderators of that category or admins.
    pub async fn can_view_category(
        &self,
        viewer: Option<&AuthUser>,
        category: &ForumCategory,
    ) -> bool {
        if !category.is_private {
            return true;
        }
        match viewer {
            None => false,
            Some(user) => {
                self.is_moderator(user.id, Some(category.id)).await || self.is_admin(user.id).await
            }
        }
    }
}
