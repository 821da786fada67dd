// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::{highlight::HighlightRange, session::ExamSession},
    error::AppError,
    models::session::{DropRequest, SessionResponse, SetAnswerRequest, SubmitResponse},
    state::AppState,
    store::{SessionEntry, deliver_submission},
    utils::jwt::Claims,
};

fn respond(entry: &mut SessionEntry) -> SessionResponse {
    SessionResponse {
        session_id: entry.id,
        test_id: entry.test_id,
        view: entry.session.view(),
    }
}

/// Starts an attempt at a test.
///
/// Students get the lockdown switched on; the first response carries the
/// fullscreen directive.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let role = claims.role()?;
    let test = state
        .tests
        .get(test_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Test {} not found", test_id)))?;

    let session = ExamSession::start(test.sections, role, test.duration_seconds);
    let entry = SessionEntry {
        id: Uuid::new_v4(),
        test_id,
        owner: claims.sub,
        session,
    };
    tracing::info!(session_id = %entry.id, %test_id, owner = %entry.owner, "Session created");

    let shared = state.sessions.insert(entry).await;
    let mut entry = shared.lock().await;

    Ok((StatusCode::CREATED, Json(respond(&mut entry))))
}

/// Current rendered state of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    Ok(Json(respond(&mut entry)))
}

/// Writes one answer through its input, radio group or dropdown.
pub async fn set_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, number)): Path<(Uuid, u32)>,
    Json(payload): Json<SetAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry.session.set_answer(number, &payload.answer)?;

    Ok(Json(respond(&mut entry)))
}

/// Drops an option token into a slot.
pub async fn drop_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section)): Path<(Uuid, usize)>,
    Json(payload): Json<DropRequest>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry
        .session
        .drop_option(section, &payload.item, payload.target)?;

    Ok(Json(respond(&mut entry)))
}

/// Clears a slot, returning its option to the pool.
pub async fn remove_slot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section, slot)): Path<(Uuid, usize, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry.session.remove_slot(section, slot)?;

    Ok(Json(respond(&mut entry)))
}

pub async fn add_highlight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section)): Path<(Uuid, usize)>,
    Json(range): Json<HighlightRange>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry.session.add_highlight(section, range)?;

    Ok(Json(respond(&mut entry)))
}

pub async fn remove_highlight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section)): Path<(Uuid, usize)>,
    Json(range): Json<HighlightRange>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry.session.remove_highlight(section, range)?;

    Ok(Json(respond(&mut entry)))
}

pub async fn clear_highlights(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    let mut entry = shared.lock().await;
    entry.session.clear_highlights(section)?;

    Ok(Json(respond(&mut entry)))
}

/// Submits the answer sheet.
///
/// A failed delivery returns 502 and leaves the session open, so the same
/// answers can be submitted again. Also accepted after time is up.
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state.sessions.get_owned(id, &claims).await?;
    deliver_submission(&shared, state.sink.as_ref()).await?;

    let entry = shared.lock().await;
    let answers = entry.session.answers();
    Ok(Json(SubmitResponse {
        status: entry.session.status(),
        answered: answers
            .records()
            .iter()
            .filter(|r| !r.answer.is_empty())
            .count(),
        total_questions: answers.len(),
        message: "Test submitted successfully",
    }))
}
