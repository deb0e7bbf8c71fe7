use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::AppError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, PublicUser, UpdateUserRequest},
        UserRecord,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user).patch(update_user))
}

fn public(user: &UserRecord) -> Result<Json<PublicUser>, AppError> {
    PublicUser::from_record(user)
        .map(Json)
        .ok_or_else(|| AppError::Internal("saved user is missing fields".into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = state.users.register(payload).await?;
    info!(user_id = ?user.id(), email = user.user_identifier(), "user registered");
    Ok((StatusCode::CREATED, public(&user)?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find(id).await?;
    public(&user)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.apply_changes(id, payload).await?;
    public(&user)
}
