use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateUserRequest, UpdateUserRequest},
    model::CredentialError,
    repo::{ConflictError, RepoError, UserRepository},
    validation::{ValidationError, EMAIL_RULE, PASSWORD_RULE, USERNAME_RULE},
    UserRecord,
};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RepoError> for SaveError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(c) => SaveError::Conflict(c),
            RepoError::NotFound => SaveError::NotFound,
            RepoError::Database(e) => SaveError::Database(e),
        }
    }
}

/// Runs the save lifecycle of user records against a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn find(&self, id: Uuid) -> Result<UserRecord, SaveError> {
        self.repo.find_by_id(id).await?.ok_or(SaveError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, SaveError> {
        Ok(self.repo.find_by_email(email.trim()).await?)
    }

    /// Persists `user`: hashes any pending plaintext, checks uniqueness,
    /// then inserts or (after touching `updated_at`) updates.
    ///
    /// `user` only changes when the write succeeds.
    #[instrument(skip(self, user), fields(id = ?user.id(), email = ?user.email()))]
    pub async fn save(&self, user: &mut UserRecord) -> Result<(), SaveError> {
        let mut pending = user.clone();

        if pending.plain_password().is_some() {
            pending.derive_password_hash()?;
        }
        require_complete(&pending)?;
        self.ensure_unique(&pending).await?;

        match pending.id() {
            None => {
                let id = self.repo.insert(&pending).await?;
                pending.assign_id(id);
                info!(user_id = %id, "user created");
            }
            Some(id) => {
                pending.touch_updated_at();
                self.repo.update(&pending).await?;
                info!(user_id = %id, "user updated");
            }
        }

        *user = pending;
        Ok(())
    }

    /// Builds a new record from `req` and saves it.
    pub async fn register(&self, req: CreateUserRequest) -> Result<UserRecord, SaveError> {
        let mut user = UserRecord::new();
        user.set_email(&req.email)?;
        user.set_username(&req.username)?;
        user.set_plain_password(&req.password)?;
        if let Some(roles) = req.roles {
            user.set_roles(roles);
        }
        self.save(&mut user).await?;
        Ok(user)
    }

    /// Applies every requested change to a copy of the stored record and
    /// saves it; the first invalid field aborts the whole update.
    pub async fn apply_changes(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserRecord, SaveError> {
        let mut user = self.find(id).await?;

        if let Some(email) = req.email.as_deref() {
            user.set_email(email)?;
        }
        if let Some(username) = req.username.as_deref() {
            user.set_username(username)?;
        }
        if let Some(password) = req.password.as_deref() {
            user.set_plain_password(password)?;
        }
        if let Some(roles) = req.roles {
            user.set_roles(roles);
        }
        if let Some(flag) = req.is_verified {
            user.set_verified(flag);
        }

        self.save(&mut user).await?;
        Ok(user)
    }

    async fn ensure_unique(&self, user: &UserRecord) -> Result<(), SaveError> {
        if let Some(email) = user.email() {
            if let Some(other) = self.repo.find_by_email(email).await? {
                if other.id() != user.id() {
                    warn!(email, "email already registered");
                    return Err(ConflictError { field: "email" }.into());
                }
            }
        }
        if let Some(username) = user.username() {
            if let Some(other) = self.repo.find_by_username(username).await? {
                if other.id() != user.id() {
                    warn!(username, "username already taken");
                    return Err(ConflictError { field: "username" }.into());
                }
            }
        }
        Ok(())
    }
}

fn require_complete(user: &UserRecord) -> Result<(), ValidationError> {
    if user.email().is_none() {
        return Err(ValidationError::new(EMAIL_RULE.field, EMAIL_RULE.blank_message));
    }
    if user.username().is_none() {
        return Err(ValidationError::new(USERNAME_RULE.field, USERNAME_RULE.blank_message));
    }
    if user.password_hash().is_none() {
        return Err(ValidationError::new(PASSWORD_RULE.field, PASSWORD_RULE.blank_message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::MemoryUserRepository, Role};
    use std::collections::BTreeSet;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserRepository::new()))
    }

    fn create_req(email: &str, username: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            username: username.into(),
            password: "Str0ng!Pass".into(),
            roles: None,
        }
    }

    #[tokio::test]
    async fn register_hashes_and_assigns_id() {
        let svc = service();
        let user = svc.register(create_req("jane@example.com", "jane")).await.unwrap();

        assert!(user.id().is_some());
        assert!(user.plain_password().is_none());
        assert!(user.verify_password("Str0ng!Pass"));
        assert_eq!(user.created_at(), user.updated_at());

        let stored = svc.find(user.id().unwrap()).await.unwrap();
        assert!(stored.plain_password().is_none());
        assert_eq!(stored.password_hash(), user.password_hash());
    }

    #[tokio::test]
    async fn register_rejects_invalid_fields() {
        let svc = service();
        let err = svc.register(create_req("jane@example.com", "ab")).await.unwrap_err();
        match err {
            SaveError::Validation(e) => assert_eq!(e.field, "username"),
            other => panic!("unexpected error: {other:?}"),
        }

        let mut req = create_req("jane@example.com", "jane");
        req.password = "weak".into();
        assert!(matches!(svc.register(req).await, Err(SaveError::Validation(_))));
    }

    #[tokio::test]
    async fn register_reports_conflicts() {
        let svc = service();
        svc.register(create_req("jane@example.com", "jane")).await.unwrap();

        let err = svc.register(create_req("jane@example.com", "jane2")).await.unwrap_err();
        assert!(matches!(err, SaveError::Conflict(ConflictError { field: "email" })));

        let err = svc.register(create_req("jane2@example.com", "jane")).await.unwrap_err();
        assert!(matches!(err, SaveError::Conflict(ConflictError { field: "username" })));
    }

    #[tokio::test]
    async fn save_refuses_incomplete_records() {
        let svc = service();
        let mut user = UserRecord::new();
        user.set_email("jane@example.com").unwrap();
        let err = svc.save(&mut user).await.unwrap_err();
        assert!(matches!(err, SaveError::Validation(ValidationError { field: "username", .. })));

        user.set_username("jane").unwrap();
        let err = svc.save(&mut user).await.unwrap_err();
        assert!(matches!(err, SaveError::Validation(ValidationError { field: "plain_password", .. })));
        assert!(user.id().is_none());
    }

    #[tokio::test]
    async fn update_touches_updated_at() {
        let svc = service();
        let mut user = svc.register(create_req("jane@example.com", "jane")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        user.set_verified(true);
        svc.save(&mut user).await.unwrap();
        assert!(user.updated_at() > user.created_at());

        let stored = svc.find(user.id().unwrap()).await.unwrap();
        assert!(stored.is_verified());
        assert_eq!(stored.updated_at(), user.updated_at());
    }

    #[tokio::test]
    async fn failed_save_leaves_record_untouched() {
        let svc = service();
        svc.register(create_req("john@example.com", "john")).await.unwrap();
        let mut jane = svc.register(create_req("jane@example.com", "jane")).await.unwrap();
        let before = jane.updated_at();

        jane.set_username("john").unwrap();
        jane.set_plain_password("N3w!Passw").unwrap();
        assert!(svc.save(&mut jane).await.is_err());

        assert_eq!(jane.updated_at(), before);
        assert_eq!(jane.plain_password(), Some("N3w!Passw"));
    }

    #[tokio::test]
    async fn apply_changes_is_all_or_nothing() {
        let svc = service();
        let user = svc.register(create_req("jane@example.com", "jane")).await.unwrap();
        let id = user.id().unwrap();

        let req = UpdateUserRequest {
            email: Some("jane.doe@example.com".into()),
            username: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(svc.apply_changes(id, req).await, Err(SaveError::Validation(_))));
        assert_eq!(svc.find(id).await.unwrap().email(), Some("jane@example.com"));

        let req = UpdateUserRequest {
            email: Some("jane.doe@example.com".into()),
            roles: Some(vec!["ROLE_ADMIN".into(), "ROLE_BOGUS".into()]),
            is_verified: Some(true),
            ..Default::default()
        };
        let updated = svc.apply_changes(id, req).await.unwrap();
        assert_eq!(updated.email(), Some("jane.doe@example.com"));
        assert_eq!(updated.roles(), BTreeSet::from([Role::Admin, Role::User]));
        assert!(updated.is_verified());
    }

    #[tokio::test]
    async fn apply_changes_on_unknown_id() {
        let svc = service();
        let err = svc
            .apply_changes(Uuid::new_v4(), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::NotFound));
    }
}
