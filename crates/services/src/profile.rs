//! # Profiles
//!
//! Profile pages and settings. XP, level, and level title are computed by
//! the backend; imagery goes to object storage and only the returned
//! public URL lands on the profile row.

use std::sync::Arc;

use uuid::Uuid;

use bytes::Bytes;
use mime::Mime;

use domains::error::{AppError, Result};
use domains::models::{Profile, ProfileChanges, ProfileStats};
use domains::traits::{Identity, ObjectStore, ProfileRepo};

pub struct ProfileService {
    repo: Arc<dyn ProfileRepo>,
    objects: Arc<dyn ObjectStore>,
    identity: Arc<dyn Identity>,
}

impl ProfileService {
    pub fn new(
        repo: Arc<dyn ProfileRepo>,
        objects: Arc<dyn ObjectStore>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self { repo, objects, identity }
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile> {
        self.repo
            .get(id)
            .await
            .map_err(AppError::backend)?
            .ok_or_else(|| AppError::NotFound("profile".into(), id.to_string()))
    }

    pub async fn stats(&self, id: Uuid) -> Result<ProfileStats> {
        self.repo.stats(id).await.map_err(AppError::backend)
    }

    /// Applies a partial update to the signed-in actor's own profile.
    pub async fn update_own(&self, changes: ProfileChanges) -> Result<Profile> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        self.repo.update(actor.id, changes).await.map_err(AppError::backend)
    }

    pub async fn upload_avatar(&self, data: Bytes, content_type: Mime) -> Result<Profile> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        require_image(&content_type)?;
        let url = self
            .objects
            .upload_avatar(actor.id, data, content_type)
            .await
            .map_err(AppError::backend)?;
        self.repo
            .update(actor.id, ProfileChanges { avatar_url: Some(url), ..Default::default() })
            .await
            .map_err(AppError::backend)
    }

    pub async fn upload_cover(&self, data: Bytes, content_type: Mime) -> Result<Profile> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        require_image(&content_type)?;
        let url = self
            .objects
            .upload_cover(actor.id, data, content_type)
            .await
            .map_err(AppError::backend)?;
        self.repo
            .update(
                actor.id,
                ProfileChanges { cover_image_url: Some(url), ..Default::default() },
            )
            .await
            .map_err(AppError::backend)
    }
}

fn require_image(content_type: &Mime) -> Result<()> {
    if content_type.type_() != mime::IMAGE {
        return Err(AppError::Validation(format!(
            "expected an image upload, got {content_type}"
        )));
    }
    Ok(())
}
