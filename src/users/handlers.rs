use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::AppError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, DeletedResponse, SearchQuery, UpdateUserRequest},
        repo_types::User,
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(search_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
}

fn bad_body(e: JsonRejection) -> AppError {
    AppError::validation(format!("invalid request body: {}", e.body_text()))
}

fn bad_id(e: PathRejection) -> AppError {
    AppError::validation(format!("invalid user id: {}", e.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(req) = payload.map_err(bad_body)?;
    let user = services::create_user(state.users.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = services::search_users(state.users.as_ref(), query.q.as_deref()).await?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = id.map_err(bad_id)?;
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            // An unknown id is reported before a bad body.
            services::find_user(state.users.as_ref(), id).await?;
            return Err(bad_body(e));
        }
    };
    let user = services::update_user(state.users.as_ref(), id, req).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let Path(id) = id.map_err(bad_id)?;
    services::delete_user(state.users.as_ref(), id).await?;
    Ok(Json(DeletedResponse {
        message: "user deleted",
    }))
}
