//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{health_check, shutdown_signal};
use crate::core::shared::state::AppState;
use crate::directory::configure_directory_routes;
use crate::security::actor_middleware;
use crate::tickets::configure_tickets_routes;

/// Full application router. Everything under `/api` requires a resolved actor.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(configure_directory_routes())
        .merge(configure_tickets_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            actor_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api_router)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let addr = app_state.config.bind_address();
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
