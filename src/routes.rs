// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{content, lockdown, session},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Test content routes are staff only, except starting a session.
/// * Session routes check ownership in the handlers.
/// * Everything under `/api` requires a valid token.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let test_routes = Router::new()
        .route("/", get(content::list_tests).post(content::create_test))
        .route("/{id}", get(content::get_test))
        .layer(middleware::from_fn(staff_middleware))
        .merge(Router::new().route("/{id}/sessions", post(session::start_session)));

    let session_routes = Router::new()
        .route("/{id}", get(session::get_session))
        .route("/{id}/answers/{number}", put(session::set_answer))
        .route("/{id}/sections/{section}/drop", post(session::drop_option))
        .route(
            "/{id}/sections/{section}/slots/{slot}",
            delete(session::remove_slot),
        )
        .route(
            "/{id}/sections/{section}/highlights",
            post(session::add_highlight).delete(session::remove_highlight),
        )
        .route(
            "/{id}/sections/{section}/highlights/clear",
            post(session::clear_highlights),
        )
        .route("/{id}/lockdown/events", post(lockdown::report_event))
        .route("/{id}/lockdown/exit", post(lockdown::resolve_exit))
        .route("/{id}/submit", post(session::submit_session));

    let api_routes = Router::new()
        .nest("/tests", test_routes)
        .nest("/sessions", session_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
