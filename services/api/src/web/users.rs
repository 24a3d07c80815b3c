//! services/api/src/web/users.rs
//!
//! CRUD handlers for the `/users` resource.

use crate::{
    error::{ApiError, ErrorBody},
    web::{
        extract::{Path, ValidatedJson},
        schemas::{MessageResponse, UserCreate, UserOut, UserUpdate},
        state::AppState,
    },
};
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

/// Register a new user.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 200, description = "User created", body = UserOut),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Invalid request body", body = ErrorBody)
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UserCreate>,
) -> Result<Json<UserOut>, ApiError> {
    let user = state.db.create_user(&req.into()).await?;
    info!("Created user {}", user.id);
    Ok(Json(user.into()))
}

/// Fetch a single user.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserOut),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserOut>, ApiError> {
    let user = state.db.get_user(user_id).await?;
    Ok(Json(user.into()))
}

/// List every user.
#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    responses((status = 200, description = "All users", body = [UserOut]))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

/// Update the fields present in the body, leaving the rest untouched.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserOut),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    ValidatedJson(req): ValidatedJson<UserUpdate>,
) -> Result<Json<UserOut>, ApiError> {
    let user = state.db.update_user(user_id, &req.into()).await?;
    Ok(Json(user.into()))
}

/// Delete a user. Their courses stay behind without an owner.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_user(user_id).await?;
    info!("Deleted user {}", user_id);
    Ok(Json(MessageResponse {
        message: format!("User with id {} deleted successfully.", user_id),
    }))
}
