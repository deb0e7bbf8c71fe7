use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Role, UserRecord};

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<String>>,
    pub is_verified: Option<bool>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: BTreeSet<Role>,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PublicUser {
    /// `None` for records the store has not accepted yet.
    pub fn from_record(user: &UserRecord) -> Option<Self> {
        Some(Self {
            id: user.id()?,
            email: user.email()?.to_string(),
            username: user.username()?.to_string(),
            roles: user.roles(),
            is_verified: user.is_verified(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serialization_has_no_secrets() {
        let mut user = UserRecord::new();
        user.set_email("test@example.com").unwrap();
        user.set_username("tester").unwrap();
        user.set_roles(["ROLE_ADMIN"]);
        user.set_plain_password("Str0ng!Pass").unwrap();
        user.derive_password_hash().unwrap();
        user.assign_id(Uuid::new_v4());

        let public = PublicUser::from_record(&user).unwrap();
        let json = serde_json::to_value(&public).unwrap();

        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["roles"], serde_json::json!(["ROLE_USER", "ROLE_ADMIN"]));
        assert_eq!(json["is_verified"], false);
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn unsaved_record_has_no_public_form() {
        let mut user = UserRecord::new();
        user.set_email("test@example.com").unwrap();
        user.set_username("tester").unwrap();
        assert!(PublicUser::from_record(&user).is_none());
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"is_verified": true}"#).unwrap();
        assert_eq!(req.is_verified, Some(true));
        assert!(req.email.is_none() && req.roles.is_none());
    }
}
