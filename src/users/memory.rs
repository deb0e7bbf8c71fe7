use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::{ConflictError, RepoError, UserRepository},
    UserRecord,
};

/// Process-local store used by tests and demo runs.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

fn check_unique(
    users: &HashMap<Uuid, UserRecord>,
    user: &UserRecord,
    own_id: Option<Uuid>,
) -> Result<(), ConflictError> {
    for other in users.values().filter(|u| u.id() != own_id) {
        if other.email().is_some() && other.email() == user.email() {
            return Err(ConflictError { field: "email" });
        }
        if other.username().is_some() && other.username() == user.username() {
            return Err(ConflictError { field: "username" });
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &UserRecord) -> Result<Uuid, RepoError> {
        let mut users = self.users.write().await;
        check_unique(&users, user, None)?;

        let id = Uuid::new_v4();
        let mut stored = user.clone();
        stored.assign_id(id);
        stored.erase_credentials();
        users.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, user: &UserRecord) -> Result<(), RepoError> {
        let id = user.id().ok_or(RepoError::NotFound)?;
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        check_unique(&users, user, Some(id))?;

        let mut stored = user.clone();
        stored.erase_credentials();
        users.insert(id, stored);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email() == Some(email)).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username() == Some(username)).cloned())
    }
}
