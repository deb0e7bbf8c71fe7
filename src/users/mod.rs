use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod memory;
mod model;
pub mod password;
pub mod repo;
mod repo_types;
pub mod services;
pub mod validation;

pub use model::{CredentialError, Role, UnknownRole, UserRecord};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
