pub mod handlers;
pub mod lifecycle;
pub mod transitions;
pub mod types;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use lifecycle::TicketEngine;
pub use transitions::{check_transition, transition_rule, TransitionRule};
pub use types::{DeleteMode, StatusChange, TicketEdit, TicketFilters, TicketInput};

use handlers::{
    handle_add_comment, handle_change_status, handle_create_ticket, handle_delete_ticket,
    handle_get_history, handle_get_ticket, handle_list_comments, handle_list_tickets,
    handle_recent_tickets, handle_ticket_stats, handle_update_ticket,
};

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(handle_list_tickets).post(handle_create_ticket))
        .route("/api/tickets/stats", get(handle_ticket_stats))
        .route("/api/tickets/recent", get(handle_recent_tickets))
        .route(
            "/api/tickets/:id",
            get(handle_get_ticket)
                .put(handle_update_ticket)
                .delete(handle_delete_ticket),
        )
        .route("/api/tickets/:id/status", put(handle_change_status))
        .route(
            "/api/tickets/:id/comments",
            get(handle_list_comments).post(handle_add_comment),
        )
        .route("/api/tickets/:id/history", get(handle_get_history))
}
