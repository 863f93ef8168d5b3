pub mod handlers;
pub mod service;
pub mod types;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use service::DirectoryService;
pub use types::{UserInput, UserUpdate};

use handlers::{
    handle_create_company, handle_create_user, handle_delete_company, handle_delete_user,
    handle_get_company, handle_get_user, handle_list_companies, handle_list_company_users,
    handle_list_users, handle_set_user_active, handle_update_company, handle_update_profile,
    handle_update_user,
};

pub fn configure_directory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/companies",
            get(handle_list_companies).post(handle_create_company),
        )
        .route(
            "/api/companies/:id",
            get(handle_get_company)
                .put(handle_update_company)
                .delete(handle_delete_company),
        )
        .route("/api/companies/:id/users", get(handle_list_company_users))
        .route("/api/users", get(handle_list_users).post(handle_create_user))
        .route(
            "/api/users/:id",
            get(handle_get_user)
                .put(handle_update_user)
                .delete(handle_delete_user),
        )
        .route("/api/users/:id/active", put(handle_set_user_active))
        .route("/api/profile", put(handle_update_profile))
}
