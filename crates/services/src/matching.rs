//! # Matching
//!
//! Pairs students by subject. A `CanHelp` query looks for students who
//! *need* help in those subjects and vice versa; the actor and anyone
//! under an active ban are excluded before matching.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use domains::error::{AppError, Result};
use domains::models::{MatchDirection, SubjectMatch};
use domains::traits::{Identity, ModerationRepo, ProfileRepo};

use crate::retry::with_retry;

pub struct MatchingService {
    profiles: Arc<dyn ProfileRepo>,
    moderation: Arc<dyn ModerationRepo>,
    identity: Arc<dyn Identity>,
}

impl MatchingService {
    pub fn new(
        profiles: Arc<dyn ProfileRepo>,
        moderation: Arc<dyn ModerationRepo>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self { profiles, moderation, identity }
    }

    /// Profiles whose opposite-direction subject list intersects the
    /// query. The intersection is reported back as `matching_subjects`,
    /// in query order. An empty query matches nobody.
    pub async fn matches(
        &self,
        direction: MatchDirection,
        subjects: &[String],
    ) -> Result<Vec<SubjectMatch>> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        if subjects.is_empty() {
            return Ok(Vec::new());
        }

        let banned: HashSet<Uuid> = with_retry(|| async {
            self.moderation
                .active_ban_user_ids()
                .await
                .map_err(AppError::backend)
        })
        .await?
        .into_iter()
        .collect();

        let profiles = with_retry(|| async {
            self.profiles
                .list_others(actor.id)
                .await
                .map_err(AppError::backend)
        })
        .await?;

        Ok(profiles
            .into_iter()
            .filter(|profile| !banned.contains(&profile.id))
            .filter_map(|profile| {
                let pool = match direction {
                    MatchDirection::CanHelp => &profile.subjects.needs_help,
                    MatchDirection::NeedsHelp => &profile.subjects.can_help,
                };
                let matching: Vec<String> = subjects
                    .iter()
                    .filter(|subject| pool.contains(subject))
                    .cloned()
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                Some(SubjectMatch {
                    id: profile.id,
                    name: profile.name,
                    university: profile.university,
                    major: profile.major,
                    minor: profile.minor,
                    avatar_url: profile.avatar_url,
                    matching_subjects: matching,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::models::{AuthUser, Profile, UserSubjects};
    use domains::traits::{MockIdentity, MockModerationRepo, MockProfileRepo};

    fn profile(name: &str, needs_help: &[&str], can_help: &[&str]) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: name.into(),
            university: "ODTÜ".into(),
            bio: None,
            avatar_url: None,
            cover_image_url: None,
            major: Some("CS".into()),
            minor: None,
            subjects: UserSubjects {
                can_help: can_help.iter().map(|s| s.to_string()).collect(),
                needs_help: needs_help.iter().map(|s| s.to_string()).collect(),
            },
            skills: Vec::new(),
            interests: Vec::new(),
            xp: 0,
            level: 1,
            level_title: "Newcomer".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn signed_in() -> Arc<MockIdentity> {
        let mut identity = MockIdentity::new();
        identity.expect_current_user().return_const(Some(AuthUser {
            id: Uuid::new_v4(),
            email: "ege@metu.edu.tr".into(),
            name: "Ege".into(),
            university: "ODTÜ".into(),
        }));
        Arc::new(identity)
    }

    fn subjects(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn helpers_match_students_who_need_those_subjects() {
        let hit = profile("Selin", &["Calculus", "Physics"], &[]);
        let miss = profile("Bora", &["History"], &[]);
        let rows = vec![hit.clone(), miss];

        let mut profiles = MockProfileRepo::new();
        profiles.expect_list_others().returning(move |_| Ok(rows.clone()));
        let mut moderation = MockModerationRepo::new();
        moderation.expect_active_ban_user_ids().returning(|| Ok(Vec::new()));
        let service = MatchingService::new(Arc::new(profiles), Arc::new(moderation), signed_in());

        let found = service
            .matches(MatchDirection::CanHelp, &subjects(&["Calculus", "Linear Algebra"]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, hit.id);
        assert_eq!(found[0].matching_subjects, subjects(&["Calculus"]));
    }

    #[tokio::test]
    async fn banned_students_never_match() {
        let banned = profile("Umut", &["Calculus"], &[]);
        let banned_id = banned.id;
        let rows = vec![banned];

        let mut profiles = MockProfileRepo::new();
        profiles.expect_list_others().returning(move |_| Ok(rows.clone()));
        let mut moderation = MockModerationRepo::new();
        moderation
            .expect_active_ban_user_ids()
            .returning(move || Ok(vec![banned_id]));
        let service = MatchingService::new(Arc::new(profiles), Arc::new(moderation), signed_in());

        let found = service
            .matches(MatchDirection::CanHelp, &subjects(&["Calculus"]))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn an_empty_query_matches_nobody_without_fetching() {
        // No expectations on either repo: a fetch would panic the test.
        let service = MatchingService::new(
            Arc::new(MockProfileRepo::new()),
            Arc::new(MockModerationRepo::new()),
            signed_in(),
        );

        let found = service.matches(MatchDirection::NeedsHelp, &[]).await.unwrap();
        assert!(found.is_empty());
    }
}
