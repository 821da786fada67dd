// src/engine/error.rs

use std::fmt;

/// Errors raised by engine operations.
/// Each one is recoverable and scoped to a single widget interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // Question number is 0 or past the end of the answer store
    QuestionOutOfRange { number: u32, total: usize },

    // No rendered control is bound to this number
    UnknownQuestion(u32),

    // Value rejected by the bound control (e.g. not one of the radio options)
    InvalidAnswer { number: u32, value: String },

    UnknownSlot(u32),

    UnknownOption(String),

    UnknownSection(usize),

    InvalidRange { start: usize, end: usize },

    // Session already submitted or expired
    SessionClosed,

    // Countdown reached zero; only submission is still possible
    TimeUp,

    // A submission is on its way to the sink
    SubmissionPending,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::QuestionOutOfRange { number, total } => {
                write!(f, "Question {} is outside 1..={}", number, total)
            }
            EngineError::UnknownQuestion(number) => write!(f, "Question {} does not exist", number),
            EngineError::InvalidAnswer { number, value } => {
                write!(f, "'{}' is not a valid answer for question {}", value, number)
            }
            EngineError::UnknownSlot(number) => write!(f, "Slot {} does not exist", number),
            EngineError::UnknownOption(value) => write!(f, "Option '{}' does not exist", value),
            EngineError::UnknownSection(idx) => write!(f, "Section {} does not exist", idx),
            EngineError::InvalidRange { start, end } => {
                write!(f, "Invalid highlight range {}..{}", start, end)
            }
            EngineError::SessionClosed => write!(f, "Session is no longer accepting answers"),
            EngineError::TimeUp => write!(f, "Time is up; answers can no longer be changed"),
            EngineError::SubmissionPending => write!(f, "Submission already in progress"),
        }
    }
}

impl std::error::Error for EngineError {}
