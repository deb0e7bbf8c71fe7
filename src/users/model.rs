use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{
    password::{self, HashError},
    validation::{validate_email, validate_password, validate_username, ValidationError},
};

/// Access level granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_SUPER_ADMIN")]
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::SuperAdmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
            Role::SuperAdmin => "ROLE_SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Keeps the known roles, drops everything else.
pub(super) fn parse_roles<I, S>(values: I) -> BTreeSet<Role>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|v| match v.as_ref().parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                debug!(error = %e, "dropping invalid role");
                None
            }
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no plain password to derive a hash from")]
    MissingPlainPassword,
    #[error("password hashing failed: {0}")]
    Hash(#[from] HashError),
}

/// One user account.
///
/// Setters validate their input and either apply the change completely or
/// leave the record untouched. `id` is assigned by the persistence layer.
#[derive(Clone)]
pub struct UserRecord {
    pub(super) id: Option<Uuid>,
    pub(super) email: Option<String>,
    pub(super) username: Option<String>,
    pub(super) roles: BTreeSet<Role>,
    pub(super) password_hash: Option<String>,
    pub(super) plain_password: Option<Zeroizing<String>>,
    pub(super) created_at: OffsetDateTime,
    pub(super) updated_at: OffsetDateTime,
    pub(super) is_verified: bool,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRecord {
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: None,
            email: None,
            username: None,
            roles: BTreeSet::from([Role::User]),
            password_hash: None,
            plain_password: None,
            created_at: now,
            updated_at: now,
            is_verified: false,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Set once by the store on first insert.
    pub(crate) fn assign_id(&mut self, id: Uuid) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        validate_email(value)?;
        self.email = Some(value.to_string());
        Ok(())
    }

    /// Identifier used to look the account up; the email address.
    pub fn user_identifier(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        validate_username(value)?;
        self.username = Some(value.to_string());
        Ok(())
    }

    /// Roles as stored, without the implicit `ROLE_USER`.
    pub fn stored_roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// Effective roles; `ROLE_USER` is always granted.
    pub fn roles(&self) -> BTreeSet<Role> {
        let mut roles = self.roles.clone();
        roles.insert(Role::User);
        roles
    }

    /// Replaces the stored roles. Unknown names are dropped without error.
    pub fn set_roles<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles = parse_roles(values);
    }

    pub fn has_role(&self, role: Role) -> bool {
        role == Role::User || self.roles.contains(&role)
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    pub fn plain_password(&self) -> Option<&str> {
        self.plain_password.as_ref().map(|p| p.as_str())
    }

    pub fn set_plain_password(&mut self, value: &str) -> Result<(), ValidationError> {
        validate_password(value)?;
        self.plain_password = Some(Zeroizing::new(value.to_string()));
        Ok(())
    }

    /// Hashes the pending plaintext into `password_hash` and erases it.
    pub fn derive_password_hash(&mut self) -> Result<(), CredentialError> {
        let plain = self
            .plain_password
            .as_ref()
            .ok_or(CredentialError::MissingPlainPassword)?;
        let hash = password::hash_password(plain)?;
        self.password_hash = Some(hash);
        self.erase_credentials();
        Ok(())
    }

    /// Drops any pending plaintext without hashing it.
    pub fn erase_credentials(&mut self) {
        self.plain_password = None;
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        match self.password_hash.as_deref() {
            Some(hash) => password::verify_password(candidate, hash).unwrap_or(false),
            None => false,
        }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    /// Called right before an update is committed.
    pub fn touch_updated_at(&mut self) {
        self.updated_at = OffsetDateTime::now_utc().max(self.created_at);
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn set_verified(&mut self, flag: bool) {
        self.is_verified = flag;
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("plain_password", &self.plain_password.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("is_verified", &self.is_verified)
            .finish()
    }
}
