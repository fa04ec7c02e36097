//! # Friendships
//!
//! Friend requests and the accepted-friend views. The friendships table
//! has a unique pair constraint; a duplicate request surfaces as a
//! conflict rather than a second row.

use std::sync::Arc;

use uuid::Uuid;

use domains::error::{AppError, Result, StoreError};
use domains::models::{Friend, FriendStatus, Friendship};
use domains::traits::{FriendshipRepo, Identity};

pub struct FriendshipService {
    repo: Arc<dyn FriendshipRepo>,
    identity: Arc<dyn Identity>,
}

impl FriendshipService {
    pub fn new(repo: Arc<dyn FriendshipRepo>, identity: Arc<dyn Identity>) -> Self {
        Self { repo, identity }
    }

    pub async fn send_request(
        &self,
        receiver: Uuid,
        message: Option<String>,
    ) -> Result<Friendship> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        if actor.id == receiver {
            return Err(AppError::Validation(
                "you cannot send a friend request to yourself".into(),
            ));
        }
        match self.repo.insert_request(actor.id, receiver, message).await {
            Ok(friendship) => Ok(friendship),
            Err(StoreError::Duplicate) => {
                Err(AppError::Conflict("a friend request already exists".into()))
            }
            Err(err) => Err(AppError::backend(err)),
        }
    }

    pub async fn respond(&self, request_id: Uuid, accept: bool) -> Result<()> {
        let status = if accept { FriendStatus::Accepted } else { FriendStatus::Rejected };
        self.repo.set_status(request_id, status).await.map_err(AppError::backend)
    }

    pub async fn remove(&self, friendship_id: Uuid) -> Result<()> {
        self.repo.delete(friendship_id).await.map_err(AppError::backend)
    }

    /// Accepted friendships oriented from `profile`'s point of view: the
    /// other party is the one returned.
    pub async fn friends_of(&self, profile: Uuid) -> Result<Vec<Friend>> {
        let rows = self.repo.accepted_for(profile).await.map_err(AppError::backend)?;
        Ok(rows
            .into_iter()
            .map(|f| {
                let other = if f.sender.id == profile { f.receiver } else { f.sender };
                Friend {
                    id: other.id,
                    name: other.name,
                    university: other.university,
                    avatar_url: other.avatar_url,
                    friendship_id: f.id,
                }
            })
            .collect())
    }

    /// Pending requests waiting on the signed-in actor.
    pub async fn pending_for_me(&self) -> Result<Vec<Friendship>> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        self.repo.pending_received(actor.id).await.map_err(AppError::backend)
    }

    /// Pending requests the signed-in actor has sent.
    pub async fn sent_by_me(&self) -> Result<Vec<Friendship>> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        self.repo.pending_sent(actor.id).await.map_err(AppError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::models::{AuthUser, AuthorRef};
    use domains::traits::{MockFriendshipRepo, MockIdentity};

    fn actor() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "can@ku.edu.tr".into(),
            name: "Can".into(),
            university: "Koç".into(),
        }
    }

    fn signed_in(user: AuthUser) -> Arc<MockIdentity> {
        let mut identity = MockIdentity::new();
        identity.expect_current_user().return_const(Some(user));
        Arc::new(identity)
    }

    fn person(id: Uuid, name: &str) -> AuthorRef {
        AuthorRef { id, name: name.into(), university: "Koç".into(), avatar_url: None }
    }

    #[tokio::test]
    async fn self_requests_are_rejected_locally() {
        let user = actor();
        let service =
            FriendshipService::new(Arc::new(MockFriendshipRepo::new()), signed_in(user.clone()));

        let err = service.send_request(user.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_pair_surfaces_as_conflict() {
        let mut repo = MockFriendshipRepo::new();
        repo.expect_insert_request()
            .returning(|_, _, _| Err(StoreError::Duplicate));
        let service = FriendshipService::new(Arc::new(repo), signed_in(actor()));

        let err = service.send_request(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn friends_are_oriented_from_the_profile_side() {
        let me = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bora = Uuid::new_v4();
        let rows = vec![
            Friendship {
                id: Uuid::new_v4(),
                sender: person(me, "Me"),
                receiver: person(alice, "Alice"),
                status: FriendStatus::Accepted,
                message: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            Friendship {
                id: Uuid::new_v4(),
                sender: person(bora, "Bora"),
                receiver: person(me, "Me"),
                status: FriendStatus::Accepted,
                message: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        ];
        let mut repo = MockFriendshipRepo::new();
        repo.expect_accepted_for().returning(move |_| Ok(rows.clone()));
        let service = FriendshipService::new(Arc::new(repo), signed_in(actor()));

        let friends = service.friends_of(me).await.unwrap();
        let names: Vec<_> = friends.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bora"]);
    }
}
