//! Auth gateway over the in-memory account table. Sign-up creates the
//! profile row in the same step, as the real backend's trigger does.

use async_trait::async_trait;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::AuthUser;
use domains::traits::AuthGateway;

use super::{Account, MemoryBackend};

const MIN_PASSWORD_LEN: usize = 8;

#[async_trait]
impl AuthGateway for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        university: &str,
    ) -> Result<AuthUser, StoreError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(StoreError::Rejected(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let key = email.to_lowercase();
        match self.accounts.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Duplicate),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let user = AuthUser {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    name: name.to_string(),
                    university: university.to_string(),
                };
                slot.insert(Account { user: user.clone(), password: password.to_string() });
                self.insert_profile(user.id, name, university);
                Ok(user)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let account = self
            .accounts
            .get(&email.to_lowercase())
            .ok_or(StoreError::Denied)?;
        if account.password != password {
            return Err(StoreError::Denied);
        }
        Ok(account.user.clone())
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let backend = MemoryBackend::new();
        backend
            .sign_up("ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ")
            .await
            .unwrap();
        let err = backend
            .sign_up("Ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate);
    }

    #[tokio::test]
    async fn sign_up_creates_the_profile_row() {
        let backend = MemoryBackend::new();
        let user = backend
            .sign_up("ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ")
            .await
            .unwrap();
        assert!(backend.profiles.contains_key(&user.id));
    }

    #[tokio::test]
    async fn wrong_password_is_denied() {
        let backend = MemoryBackend::new();
        backend
            .sign_up("ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ")
            .await
            .unwrap();
        let err = backend.sign_in("ada@metu.edu.tr", "wrong").await.unwrap_err();
        assert_eq!(err, StoreError::Denied);
    }
}
