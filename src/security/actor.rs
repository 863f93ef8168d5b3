use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::models::User;
use crate::core::shared::state::AppState;
use crate::core::shared::Role;
use crate::core::store::HelpdeskStore;

/// The authenticated caller, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
    pub company_id: i32,
}

impl Actor {
    pub fn new(id: i32, role: Role, company_id: i32) -> Self {
        Self {
            id,
            role,
            company_id,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn same_company(&self, company_id: i32) -> bool {
        self.company_id == company_id
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role, user.company_id)
    }
}

/// Loads the user behind `user_id` and turns it into an [`Actor`].
pub fn resolve_actor(store: &dyn HelpdeskStore, user_id: i32) -> HelpdeskResult<Actor> {
    match store.get_user(user_id)? {
        Some(user) if user.is_active => Ok(Actor::from(&user)),
        Some(_) => Err(HelpdeskError::Unauthorized(
            "User account is deactivated".to_string(),
        )),
        None => Err(HelpdeskError::Unauthorized("Unknown user".to_string())),
    }
}

fn header_user_id(request: &Request<Body>, header: &str) -> Option<i32> {
    request
        .headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i32>().ok())
}

/// Resolves the actor from the gateway header and stores it in request extensions.
pub async fn actor_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = state.config.actor_header.as_str();
    let Some(user_id) = header_user_id(&request, header) else {
        debug!(
            "Rejecting {} {}: missing {} header",
            request.method(),
            request.uri().path(),
            header
        );
        return HelpdeskError::Unauthorized("Authentication required".to_string())
            .into_response();
    };

    let store = Arc::clone(&state.store);
    let resolved = tokio::task::spawn_blocking(move || resolve_actor(store.as_ref(), user_id))
        .await
        .map_err(HelpdeskError::from)
        .and_then(|result| result);

    match resolved {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => {
            warn!("Actor resolution failed for user {}: {}", user_id, e);
            e.into_response()
        }
    }
}
