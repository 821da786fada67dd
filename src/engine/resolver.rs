// src/engine/resolver.rs

use serde::Serialize;

use super::answer_store::AnswerField;
use super::question::{QuestionOption, QuestionType};

/// An interactive control bound to one answer index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    /// Free-text input.
    TextInput { field: AnswerField },

    /// One radio per option, all sharing `field`.
    RadioGroup {
        field: AnswerField,
        options: Vec<QuestionOption>,
    },

    /// Single-select dropdown.
    Dropdown {
        field: AnswerField,
        options: Vec<QuestionOption>,
    },
}

impl Control {
    pub fn field(&self) -> AnswerField {
        match self {
            Control::TextInput { field }
            | Control::RadioGroup { field, .. }
            | Control::Dropdown { field, .. } => *field,
        }
    }

    /// Whether `value` may be written through this control.
    /// Choice controls accept one of their option values, or empty to clear.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Control::TextInput { .. } => true,
            Control::RadioGroup { options, .. } | Control::Dropdown { options, .. } => {
                value.is_empty() || options.iter().any(|o| o.value == value)
            }
        }
    }
}

/// Picks the control for a question.
///
/// Returns `None` for types that have no inline control: drag-and-drop
/// questions are rendered by their block, and unrecognised types are skipped.
pub fn resolve(number: u32, question_type: &QuestionType, options: &[QuestionOption]) -> Option<Control> {
    let field = AnswerField::for_question(number)?;

    match question_type {
        QuestionType::SentenceCompletion
        | QuestionType::ShortAnswer
        | QuestionType::SummaryCompletion
        | QuestionType::DiagramLabel => Some(Control::TextInput { field }),

        QuestionType::MultipleChoice => Some(Control::RadioGroup {
            field,
            options: options.to_vec(),
        }),

        // The visible label is the stored value, not the option's label.
        QuestionType::MatchingHeadings => Some(Control::Dropdown {
            field,
            options: options
                .iter()
                .map(|o| QuestionOption::new(o.value.clone(), o.value.clone()))
                .collect(),
        }),

        QuestionType::DragDrop => None,

        QuestionType::MatchingFeatures | QuestionType::Unrecognized(_) => {
            tracing::warn!(
                question = number,
                question_type = question_type.as_str(),
                "No input control for question type; question skipped"
            );
            None
        }
    }
}
