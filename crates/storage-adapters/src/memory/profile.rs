//! Profiles, role checks, moderation visibility, and the object store.
//! Stats aggregate across the other tables the way the backend's
//! counting procedure does.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use mime::Mime;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::{
    Ban, ChangeOp, FeedTable, ForumRole, FriendStatus, Profile, ProfileChanges, ProfileStats,
    TargetKind,
};
use domains::traits::{ModerationRepo, ObjectStore, ProfileRepo, RoleGateway};

use super::MemoryBackend;

fn ban_is_active(ban: &Ban) -> bool {
    ban.lifted_at.is_none() && ban.expires_at.is_none_or(|expiry| expiry > Utc::now())
}

#[async_trait]
impl ProfileRepo for MemoryBackend {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn list_others(&self, excluding: Uuid) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.id != excluding)
            .map(|p| p.clone())
            .collect())
    }

    async fn update(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError> {
        let updated = {
            let mut profile = self.profiles.get_mut(&id).ok_or(StoreError::MissingRow)?;
            let ProfileChanges {
                name,
                bio,
                avatar_url,
                cover_image_url,
                major,
                minor,
                subjects,
                skills,
                interests,
            } = changes;
            if let Some(name) = name {
                profile.name = name;
            }
            if let Some(bio) = bio {
                profile.bio = Some(bio);
            }
            if let Some(url) = avatar_url {
                profile.avatar_url = Some(url);
            }
            if let Some(url) = cover_image_url {
                profile.cover_image_url = Some(url);
            }
            if let Some(major) = major {
                profile.major = Some(major);
            }
            if let Some(minor) = minor {
                profile.minor = Some(minor);
            }
            if let Some(subjects) = subjects {
                profile.subjects = subjects;
            }
            if let Some(skills) = skills {
                profile.skills = skills;
            }
            if let Some(interests) = interests {
                profile.interests = interests;
            }
            profile.updated_at = Utc::now();
            profile.clone()
        };
        self.publish(ChangeOp::Update, FeedTable::Profiles, id, None);
        Ok(updated)
    }

    async fn stats(&self, id: Uuid) -> Result<ProfileStats, StoreError> {
        if !self.profiles.contains_key(&id) {
            return Err(StoreError::MissingRow);
        }
        let topics = self.topics.iter().filter(|t| t.author_id == id).count() as u32;
        let replies = self.replies.iter().filter(|r| r.author_id == id).count() as u32;
        let likes_given = self.likes.iter().filter(|entry| entry.key().0 == id).count() as u32;
        let likes_received = self
            .likes
            .iter()
            .filter(|entry| {
                let target = entry.key().1;
                match target.kind {
                    TargetKind::Topic => self
                        .topics
                        .get(&target.id)
                        .is_some_and(|t| t.author_id == id),
                    TargetKind::Reply => self
                        .replies
                        .get(&target.id)
                        .is_some_and(|r| r.author_id == id),
                }
            })
            .count() as u32;
        let friends = self
            .friendships
            .iter()
            .filter(|f| {
                f.status == FriendStatus::Accepted && (f.sender_id == id || f.receiver_id == id)
            })
            .count() as u32;
        Ok(ProfileStats { topics, replies, likes_given, likes_received, friends })
    }
}

#[async_trait]
impl RoleGateway for MemoryBackend {
    async fn role_of(&self, user: Uuid) -> Result<ForumRole, StoreError> {
        Ok(self.roles.get(&user).map_or(ForumRole::User, |r| *r))
    }

    async fn has_permission(&self, user: Uuid, required: ForumRole) -> Result<bool, StoreError> {
        Ok(self.role_of(user).await? >= required)
    }

    async fn is_admin(&self, user: Uuid) -> Result<bool, StoreError> {
        Ok(self.role_of(user).await? == ForumRole::Admin)
    }

    async fn is_moderator(&self, user: Uuid, _category: Option<Uuid>) -> Result<bool, StoreError> {
        // Moderator appointments are global here; per-category scoping is
        // the real backend's concern.
        Ok(self.role_of(user).await? >= ForumRole::Moderator)
    }
}

#[async_trait]
impl ModerationRepo for MemoryBackend {
    async fn active_ban_user_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .bans
            .iter()
            .filter(|ban| ban_is_active(&ban))
            .map(|ban| ban.user_id)
            .collect())
    }

    async fn is_banned(&self, user: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .bans
            .iter()
            .any(|ban| ban.user_id == user && ban_is_active(&ban)))
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload_avatar(
        &self,
        owner: Uuid,
        data: Bytes,
        content_type: Mime,
    ) -> Result<String, StoreError> {
        let key = format!("avatars/{owner}.{}", content_type.subtype());
        self.objects.insert(key.clone(), data);
        Ok(format!("memory://{key}"))
    }

    async fn upload_cover(
        &self,
        owner: Uuid,
        data: Bytes,
        content_type: Mime,
    ) -> Result<String, StoreError> {
        let key = format!("covers/{owner}.{}", content_type.subtype());
        self.objects.insert(key.clone(), data);
        Ok(format!("memory://{key}"))
    }
}
