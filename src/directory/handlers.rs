use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::core::error::HelpdeskError;
use crate::core::shared::models::{Company, User};
use crate::core::shared::state::AppState;
use crate::security::Actor;

use super::types::{
    CompanyRequest, CreateUserRequest, ListUsersQuery, SetActiveRequest, UpdateProfileRequest,
    UpdateUserRequest,
};

// ============================================================================
// COMPANIES
// ============================================================================

pub async fn handle_list_companies(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Company>>, HelpdeskError> {
    let directory = state.directory.clone();
    let companies = tokio::task::spawn_blocking(move || directory.list_companies(&actor)).await??;
    Ok(Json(companies))
}

pub async fn handle_create_company(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Company>), HelpdeskError> {
    let Json(req) = body?;
    let name = req.validate()?;
    let directory = state.directory.clone();
    let company = tokio::task::spawn_blocking(move || directory.create_company(&actor, name))
        .await??;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn handle_get_company(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Company>, HelpdeskError> {
    let Path(company_id) = path?;
    let directory = state.directory.clone();
    let company = tokio::task::spawn_blocking(move || directory.get_company(&actor, company_id))
        .await??;
    Ok(Json(company))
}

pub async fn handle_update_company(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<CompanyRequest>, JsonRejection>,
) -> Result<Json<Company>, HelpdeskError> {
    let Path(company_id) = path?;
    let Json(req) = body?;
    let name = req.validate()?;
    let directory = state.directory.clone();
    let company =
        tokio::task::spawn_blocking(move || directory.update_company(&actor, company_id, name))
            .await??;
    Ok(Json(company))
}

pub async fn handle_delete_company(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, HelpdeskError> {
    let Path(company_id) = path?;
    let directory = state.directory.clone();
    tokio::task::spawn_blocking(move || directory.delete_company(&actor, company_id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_list_company_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<User>>, HelpdeskError> {
    let Path(company_id) = path?;
    let directory = state.directory.clone();
    let users =
        tokio::task::spawn_blocking(move || directory.list_company_users(&actor, company_id))
            .await??;
    Ok(Json(users))
}

// ============================================================================
// USERS
// ============================================================================

pub async fn handle_list_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    query_params: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, HelpdeskError> {
    let Query(query) = query_params?;
    let directory = state.directory.clone();
    let users = tokio::task::spawn_blocking(move || directory.list_users(&actor, query.company_id))
        .await??;
    Ok(Json(users))
}

pub async fn handle_create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), HelpdeskError> {
    let Json(req) = body?;
    let input = req.validate()?;
    let directory = state.directory.clone();
    let user = tokio::task::spawn_blocking(move || directory.create_user(&actor, input)).await??;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn handle_get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<User>, HelpdeskError> {
    let Path(user_id) = path?;
    let directory = state.directory.clone();
    let user = tokio::task::spawn_blocking(move || directory.get_user(&actor, user_id)).await??;
    Ok(Json(user))
}

pub async fn handle_update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, HelpdeskError> {
    let Path(user_id) = path?;
    let Json(req) = body?;
    let update = req.validate()?;
    let directory = state.directory.clone();
    let user = tokio::task::spawn_blocking(move || directory.update_user(&actor, user_id, update))
        .await??;
    Ok(Json(user))
}

pub async fn handle_delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, HelpdeskError> {
    let Path(user_id) = path?;
    let directory = state.directory.clone();
    tokio::task::spawn_blocking(move || directory.delete_user(&actor, user_id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_set_user_active(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<User>, HelpdeskError> {
    let Path(user_id) = path?;
    let Json(req) = body?;
    let directory = state.directory.clone();
    let user = tokio::task::spawn_blocking(move || {
        directory.set_user_active(&actor, user_id, req.is_active)
    })
    .await??;
    Ok(Json(user))
}

pub async fn handle_update_profile(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, HelpdeskError> {
    let Json(req) = body?;
    let update = req.validate()?;
    let directory = state.directory.clone();
    let user = tokio::task::spawn_blocking(move || directory.update_profile(&actor, update))
        .await??;
    Ok(Json(user))
}
