use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{parse_roles, UserRecord};

/// Row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Json<Vec<String>>, // role names, filtered on load
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub is_verified: bool,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        Self {
            id: Some(r.id),
            email: Some(r.email),
            username: Some(r.username),
            roles: parse_roles(r.roles.0),
            password_hash: Some(r.password_hash),
            plain_password: None,
            created_at: r.created_at,
            updated_at: r.updated_at.max(r.created_at),
            is_verified: r.is_verified,
        }
    }
}
