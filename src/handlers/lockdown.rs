// src/handlers/lockdown.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    engine::lockdown::BrowserEvent,
    error::AppError,
    models::session::{EventResponse, ExitRequest, ExitResponse, LockdownResponse},
    state::AppState,
    utils::jwt::Claims,
};

/// Reports a browser event (refresh, key press, fullscreen change, back
/// navigation) and returns how the client must react.
pub async fn report_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(event): Json<BrowserEvent>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;

    let verdict = entry.session.handle_event(&event);
    tracing::debug!(session_id = %id, ?event, ?verdict, "Lockdown event");

    Ok(Json(EventResponse {
        result: verdict,
        directives: entry.session.drain_directives(),
    }))
}

/// Answers the "leave the test?" prompt raised by back/forward navigation.
pub async fn resolve_exit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;

    let outcome = entry.session.resolve_exit(payload.confirmed);
    tracing::info!(session_id = %id, ?outcome, "Exit prompt answered");

    Ok(Json(LockdownResponse {
        result: ExitResponse { outcome },
        directives: entry.session.drain_directives(),
    }))
}
