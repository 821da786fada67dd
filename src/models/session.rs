// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::{
    drag_drop::DragItem,
    lockdown::{ClientDirective, ExitOutcome, Verdict},
    session::{SessionStatus, SessionView},
};

/// Returned when a session starts and on every read.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub test_id: Uuid,
    #[serde(flatten)]
    pub view: SessionView,
}

/// DTO for writing a single answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SetAnswerRequest {
    #[validate(length(max = 500))]
    pub answer: String,
}

/// DTO for a drag-and-drop move.
#[derive(Debug, Deserialize)]
pub struct DropRequest {
    #[serde(flatten)]
    pub item: DragItem,
    pub target: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExitRequest {
    pub confirmed: bool,
}

/// Reply to a lockdown event or exit decision. Carries any fullscreen
/// commands the client has to run.
#[derive(Debug, Serialize)]
pub struct LockdownResponse<T> {
    #[serde(flatten)]
    pub result: T,
    pub directives: Vec<ClientDirective>,
}

#[derive(Debug, Serialize)]
pub struct ExitResponse {
    pub outcome: ExitOutcome,
}

pub type EventResponse = LockdownResponse<Verdict>;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: SessionStatus,
    pub answered: usize,
    pub total_questions: usize,
    pub message: &'static str,
}
