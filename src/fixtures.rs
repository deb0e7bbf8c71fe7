use tracing::{info, warn};

use crate::users::{dto::CreateUserRequest, services::{SaveError, UserService}};

const SAMPLE_USERS: usize = 6;
const SAMPLE_PASSWORD: &str = "Pas$word1";

fn sample(i: usize) -> CreateUserRequest {
    let (prefix, name, role) = if i % 2 == 0 {
        ("admin", "Admin", "ROLE_ADMIN")
    } else {
        ("user", "User", "ROLE_USER")
    };
    CreateUserRequest {
        email: format!("{prefix}{i}@email.com"),
        username: format!("{name}{i}"),
        password: SAMPLE_PASSWORD.to_string(),
        roles: Some(vec![role.to_string()]),
    }
}

/// Seeds the demo accounts, alternating admins and regular users.
/// Accounts that already exist are skipped. Returns how many were created.
pub async fn seed_users(users: &UserService) -> Result<usize, SaveError> {
    let mut created = 0;
    for i in 0..SAMPLE_USERS {
        let req = sample(i);
        let email = req.email.clone();
        match users.register(req).await {
            Ok(_) => created += 1,
            Err(SaveError::Conflict(c)) => {
                warn!(%email, field = c.field, "fixture user already present; skipping");
            }
            Err(e) => return Err(e),
        }
    }
    info!(created, "fixture users seeded");
    Ok(created)
}
