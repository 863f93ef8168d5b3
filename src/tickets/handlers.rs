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
use crate::core::shared::models::{Ticket, TicketComment, TicketHistory, TicketStats};
use crate::core::shared::state::AppState;
use crate::security::Actor;

use super::types::{
    ChangeStatusRequest, CommentRequest, CreateTicketRequest, DeleteTicketQuery,
    ListTicketsQuery, RecentTicketsQuery, UpdateTicketRequest, DEFAULT_RECENT_LIMIT,
};

pub async fn handle_list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    query_params: Result<Query<ListTicketsQuery>, QueryRejection>,
) -> Result<Json<Vec<Ticket>>, HelpdeskError> {
    let Query(query) = query_params?;
    let filters = query.validate()?;
    let engine = state.tickets.clone();

    let tickets = tokio::task::spawn_blocking(move || engine.list_tickets(&actor, filters)).await??;

    Ok(Json(tickets))
}

pub async fn handle_create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), HelpdeskError> {
    let Json(req) = body?;
    let input = req.validate()?;
    let engine = state.tickets.clone();

    let ticket = tokio::task::spawn_blocking(move || engine.create_ticket(&actor, input)).await??;

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn handle_ticket_stats(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TicketStats>, HelpdeskError> {
    let engine = state.tickets.clone();

    let stats = tokio::task::spawn_blocking(move || engine.ticket_stats(&actor)).await??;

    Ok(Json(stats))
}

pub async fn handle_recent_tickets(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    query_params: Result<Query<RecentTicketsQuery>, QueryRejection>,
) -> Result<Json<Vec<Ticket>>, HelpdeskError> {
    let Query(query) = query_params?;
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, 100);
    let engine = state.tickets.clone();

    let tickets = tokio::task::spawn_blocking(move || engine.recent_tickets(&actor, limit)).await??;

    Ok(Json(tickets))
}

pub async fn handle_get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Ticket>, HelpdeskError> {
    let Path(ticket_id) = path?;
    let engine = state.tickets.clone();

    let ticket = tokio::task::spawn_blocking(move || engine.get_ticket(&actor, ticket_id)).await??;

    Ok(Json(ticket))
}

pub async fn handle_update_ticket(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateTicketRequest>, JsonRejection>,
) -> Result<Json<Ticket>, HelpdeskError> {
    let Path(ticket_id) = path?;
    let Json(req) = body?;
    let edit = req.validate()?;
    let engine = state.tickets.clone();

    let ticket =
        tokio::task::spawn_blocking(move || engine.update_ticket(&actor, ticket_id, edit)).await??;

    Ok(Json(ticket))
}

pub async fn handle_delete_ticket(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    query_params: Result<Query<DeleteTicketQuery>, QueryRejection>,
) -> Result<StatusCode, HelpdeskError> {
    let Path(ticket_id) = path?;
    let Query(query) = query_params?;
    let mode = query.validate()?;
    let engine = state.tickets.clone();

    tokio::task::spawn_blocking(move || engine.delete_ticket(&actor, ticket_id, mode)).await??;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_change_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<Ticket>, HelpdeskError> {
    let Path(ticket_id) = path?;
    let Json(req) = body?;
    let engine = state.tickets.clone();

    let ticket = tokio::task::spawn_blocking(move || {
        engine.transition_status(&actor, ticket_id, &req.status, &req.comment)
    })
    .await??;

    Ok(Json(ticket))
}

pub async fn handle_list_comments(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<TicketComment>>, HelpdeskError> {
    let Path(ticket_id) = path?;
    let engine = state.tickets.clone();

    let comments = tokio::task::spawn_blocking(move || engine.get_comments(&actor, ticket_id))
        .await??;

    Ok(Json(comments))
}

pub async fn handle_add_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketComment>), HelpdeskError> {
    let Path(ticket_id) = path?;
    let Json(req) = body?;
    let engine = state.tickets.clone();

    let comment =
        tokio::task::spawn_blocking(move || engine.add_comment(&actor, ticket_id, &req.comment))
            .await??;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn handle_get_history(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<TicketHistory>>, HelpdeskError> {
    let Path(ticket_id) = path?;
    let engine = state.tickets.clone();

    let history = tokio::task::spawn_blocking(move || engine.get_history(&actor, ticket_id))
        .await??;

    Ok(Json(history))
}
