use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{audit, desks, handlers, middleware::metrics_middleware, tickets, ws};
use crate::state::AppState;

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Desks
        .route("/desks", post(desks::save_desk).get(desks::list_desks))
        .route("/desks/{code}", get(desks::get_desk))
        .route("/desks/{code}/deactivate", post(desks::deactivate_desk))
        .route("/desks/{code}/activate", post(desks::activate_desk))
        .route("/desks/{code}/backlog", get(desks::get_backlog))
        .route("/desks/{code}/claim", post(desks::claim_next))
        // Tickets
        .route("/tickets", post(tickets::create_ticket).get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/close", post(tickets::close_ticket))
        .route("/tickets/{id}/cancel", post(tickets::cancel_ticket))
        .route("/tickets/{id}/requeue", post(tickets::requeue_ticket))
        .route("/tickets/{id}/reassign", post(tickets::reassign_ticket))
        // Live change stream
        .route("/ws", get(ws::ws_handler))
}

/// Build the application router. Every route is served at the root and again
/// under the configured API prefix.
pub fn create_router(state: Arc<AppState>) -> Router {
    let prefix = state.config().server.api_prefix.clone();

    Router::new()
        .merge(api_routes())
        .nest(&prefix, api_routes())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
