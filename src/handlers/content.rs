// src/handlers/content.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::session::{SectionSource, question_total},
    error::AppError,
    models::test_content::{CreateTestRequest, TestContent, TestSummary},
    state::AppState,
    utils::{html::clean_section_html, jwt::Claims},
};

/// Registers a test.
/// Teacher/Admin only.
///
/// Section HTML is sanitised before it is stored; the exam tags and their
/// data attributes are kept.
pub async fn create_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sections: Vec<SectionSource> = payload
        .sections
        .into_iter()
        .map(|s| SectionSource {
            kind: s.kind,
            title: s.title,
            html: clean_section_html(&s.html),
        })
        .collect();

    let total = question_total(&sections);
    if total as usize > state.config.max_questions {
        return Err(AppError::BadRequest(format!(
            "Question number {} exceeds the limit of {}",
            total, state.config.max_questions
        )));
    }

    let test = TestContent {
        id: Uuid::new_v4(),
        title: payload.title,
        duration_seconds: payload
            .duration_seconds
            .unwrap_or(state.config.default_exam_seconds),
        sections,
        created_by: claims.sub,
        created_at: Utc::now(),
    };

    tracing::info!(test_id = %test.id, title = %test.title, "Test registered");
    let summary = TestSummary::from(&test);
    state.tests.insert(test).await;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Lists registered tests.
/// Teacher/Admin only.
pub async fn list_tests(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.tests.list().await))
}

/// Returns a test with its sanitised content.
/// Teacher/Admin only.
pub async fn get_test(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let test = state
        .tests
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Test {} not found", id)))?;

    Ok(Json(test))
}
