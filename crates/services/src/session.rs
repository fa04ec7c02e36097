//! # Session
//!
//! Wraps the external auth service and holds the signed-in user. The
//! session cell is the `Identity` every controller reads at call time,
//! so a sign-out is picked up by the very next interaction.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use domains::error::{AppError, Result, StoreError};
use domains::models::AuthUser;
use domains::traits::{AuthGateway, Identity};

/// A university whose student-mail domain we accept at registration.
pub struct UniversityDomain {
    pub domain: &'static str,
    pub key: &'static str,
    pub name: &'static str,
}

/// Registration is limited to known student-mail domains; the selected
/// university must agree with the address.
pub const UNIVERSITY_DOMAINS: &[UniversityDomain] = &[
    UniversityDomain { domain: "@std.bogazici.edu.tr", key: "Boğaziçi", name: "Boğaziçi University" },
    UniversityDomain { domain: "@metu.edu.tr", key: "ODTÜ", name: "Middle East Technical University" },
    UniversityDomain { domain: "@itu.edu.tr", key: "İTÜ", name: "Istanbul Technical University" },
    UniversityDomain { domain: "@ug.bilkent.edu.tr", key: "Bilkent", name: "Bilkent University" },
    UniversityDomain { domain: "@ku.edu.tr", key: "Koç", name: "Koç University" },
    UniversityDomain { domain: "@ogr.gsu.edu.tr", key: "Galatasaray", name: "Galatasaray University" },
    UniversityDomain { domain: "@hacettepe.edu.tr", key: "Hacettepe", name: "Hacettepe University" },
    UniversityDomain { domain: "@su.sabanciuniv.edu", key: "Sabancı", name: "Sabancı University" },
];

/// Checks that `email` belongs to the student-mail domain of the selected
/// university.
pub fn validate_university_email(email: &str, selected_university: &str) -> Result<()> {
    let domain = match email.find('@') {
        Some(at) => &email[at..],
        None => return Err(AppError::Validation("please use your university email address".into())),
    };
    match UNIVERSITY_DOMAINS.iter().find(|u| u.domain.eq_ignore_ascii_case(domain)) {
        None => Err(AppError::Validation("please use your university email address".into())),
        Some(u) if u.key != selected_university => Err(AppError::Validation(format!(
            "this email does not match the selected university; use your {} address",
            u.name
        ))),
        Some(_) => Ok(()),
    }
}

pub struct Session {
    gateway: Arc<dyn AuthGateway>,
    current: RwLock<Option<AuthUser>>,
}

impl Session {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self { gateway, current: RwLock::new(None) }
    }

    /// Registers a new account. The email must belong to the selected
    /// university's student-mail domain. Registration does not sign the
    /// user in; the caller routes them to the sign-in flow.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        university: &str,
    ) -> Result<AuthUser> {
        validate_university_email(email, university)?;
        match self.gateway.sign_up(email, password, name, university).await {
            Ok(user) => {
                info!(user = %user.id, %university, "account registered");
                Ok(user)
            }
            Err(StoreError::Duplicate) => {
                Err(AppError::Conflict("this email is already registered".into()))
            }
            Err(StoreError::Rejected(msg)) => Err(AppError::Validation(msg)),
            Err(err) => Err(AppError::backend(err)),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        match self.gateway.sign_in(email, password).await {
            Ok(user) => {
                *self.write_cell() = Some(user.clone());
                info!(user = %user.id, "signed in");
                Ok(user)
            }
            Err(StoreError::Denied) => Err(AppError::Unauthenticated),
            Err(err) => Err(AppError::backend(err)),
        }
    }

    /// Signs out. The local cell clears first: a failed gateway call must
    /// not leave a ghost session behind.
    pub async fn sign_out(&self) -> Result<()> {
        let previous = self.write_cell().take();
        if let Some(user) = previous {
            info!(user = %user.id, "signed out");
        }
        self.gateway.sign_out().await.map_err(|err| {
            warn!(error = %err, "gateway sign-out failed after local sign-out");
            AppError::backend(err)
        })
    }

    fn read_cell(&self) -> RwLockReadGuard<'_, Option<AuthUser>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cell(&self) -> RwLockWriteGuard<'_, Option<AuthUser>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Identity for Session {
    fn current_user(&self) -> Option<AuthUser> {
        self.read_cell().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::traits::MockAuthGateway;
    use uuid::Uuid;

    fn user(email: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.into(),
            name: "Mehmet".into(),
            university: "ODTÜ".into(),
        }
    }

    #[test]
    fn email_must_come_from_a_known_student_domain() {
        assert!(validate_university_email("mehmet@gmail.com", "ODTÜ").is_err());
        assert!(validate_university_email("not-an-email", "ODTÜ").is_err());
        assert!(validate_university_email("mehmet@metu.edu.tr", "ODTÜ").is_ok());
    }

    #[test]
    fn email_domain_must_agree_with_the_selected_university() {
        let err = validate_university_email("mehmet@metu.edu.tr", "Bilkent").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn sign_up_does_not_open_a_session() {
        let mut gateway = MockAuthGateway::new();
        gateway
            .expect_sign_up()
            .returning(|email, _, _, _| Ok(user(email)));
        let session = Session::new(Arc::new(gateway));

        session
            .sign_up("mehmet@metu.edu.tr", "correct-horse", "Mehmet", "ODTÜ")
            .await
            .unwrap();
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_maps_to_conflict() {
        let mut gateway = MockAuthGateway::new();
        gateway
            .expect_sign_up()
            .returning(|_, _, _, _| Err(StoreError::Duplicate));
        let session = Session::new(Arc::new(gateway));

        let err = session
            .sign_up("mehmet@metu.edu.tr", "correct-horse", "Mehmet", "ODTÜ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn sign_in_sets_the_cell_and_bad_credentials_do_not() {
        let mut gateway = MockAuthGateway::new();
        gateway
            .expect_sign_in()
            .withf(|_, password| password == "correct-horse")
            .returning(|email, _| Ok(user(email)));
        gateway
            .expect_sign_in()
            .returning(|_, _| Err(StoreError::Denied));
        let session = Session::new(Arc::new(gateway));

        let err = session.sign_in("mehmet@metu.edu.tr", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(session.current_user().is_none());

        session.sign_in("mehmet@metu.edu.tr", "correct-horse").await.unwrap();
        assert!(session.current_user().is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_the_cell_even_when_the_gateway_fails() {
        let mut gateway = MockAuthGateway::new();
        gateway.expect_sign_in().returning(|email, _| Ok(user(email)));
        gateway
            .expect_sign_out()
            .returning(|| Err(StoreError::Unavailable("network".into())));
        let session = Session::new(Arc::new(gateway));

        session.sign_in("mehmet@metu.edu.tr", "correct-horse").await.unwrap();
        assert!(session.sign_out().await.is_err());
        assert!(session.current_user().is_none());
    }
}
