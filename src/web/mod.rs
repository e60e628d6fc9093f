pub mod auth;
pub mod handlers;

use crate::components::ScheduleAssistant;
use auth::{AuthService, JwtAuth};
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use handlers::{
    create_handler, delete_handler, execute_handler, health_handler, list_handler, parse_handler,
    restore_handler, update_handler,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<ScheduleAssistant>,
    /// Auth service for JWT operations
    pub auth_service: Arc<AuthService>,
    /// Upper bound for one parse call
    pub completion_timeout: Duration,
}

/// Authentication middleware; attaches the caller to the request
async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let (parts, body) = req.into_parts();

    let token = auth::extract_token(&parts).map_err(IntoResponse::into_response)?;
    let claims = state
        .auth_service
        .validate_token(&token)
        .map_err(IntoResponse::into_response)?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(JwtAuth { claims });
    Ok(next.run(req).await)
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let schedules = Router::new()
        .route("/schedules", get(list_handler).post(create_handler))
        .route("/schedules/parse", post(parse_handler))
        .route("/schedules/execute", post(execute_handler))
        .route(
            "/schedules/{id}",
            patch(update_handler).delete(delete_handler),
        )
        .route("/schedules/{id}/restore", post(restore_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(schedules)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
