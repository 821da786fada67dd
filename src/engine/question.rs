// src/engine/question.rs

use serde::{Deserialize, Serialize};

use super::markup::Element;

/// Tag replaced by a single typed input.
pub const QUESTION_INPUT_TAG: &str = "question-input";
/// Tag wrapping a drag-and-drop matching block.
pub const DRAG_DROP_TAG: &str = "drag-drop-tags";
/// Slot marker inside a drag-and-drop block.
pub const DROP_SLOT_TAG: &str = "drop-slot";

pub const ATTR_QUESTION_NUMBER: &str = "data-question-number";
pub const ATTR_QUESTION_TYPE: &str = "data-question-type";
pub const ATTR_QUESTION_OPTIONS: &str = "data-question-options";
pub const ATTR_OPTIONS: &str = "data-options";
pub const ATTR_QUESTIONS: &str = "data-questions";
pub const ATTR_REPEAT_ANSWER: &str = "repeat_answer";

/// Declared question type, as carried by `data-question-type`.
///
/// Unknown strings are kept as `Unrecognized` so every dispatch over this
/// type stays an exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    MultipleChoice,
    MatchingHeadings,
    MatchingFeatures,
    SummaryCompletion,
    SentenceCompletion,
    ShortAnswer,
    DiagramLabel,
    DragDrop,
    Unrecognized(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::MatchingHeadings => "matching_headings",
            QuestionType::MatchingFeatures => "matching_features",
            QuestionType::SummaryCompletion => "summary_completion",
            QuestionType::SentenceCompletion => "sentence_completion",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::DiagramLabel => "diagram_label",
            QuestionType::DragDrop => "drag_drop",
            QuestionType::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for QuestionType {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "multiple_choice" => QuestionType::MultipleChoice,
            "matching_headings" => QuestionType::MatchingHeadings,
            "matching_features" => QuestionType::MatchingFeatures,
            "summary_completion" => QuestionType::SummaryCompletion,
            "sentence_completion" => QuestionType::SentenceCompletion,
            "short_answer" => QuestionType::ShortAnswer,
            "diagram_label" => QuestionType::DiagramLabel,
            "drag_drop" => QuestionType::DragDrop,
            other => QuestionType::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for QuestionType {
    fn from(raw: String) -> Self {
        QuestionType::from(raw.as_str())
    }
}

impl From<QuestionType> for String {
    fn from(t: QuestionType) -> Self {
        t.as_str().to_string()
    }
}

/// A selectable option: `{value, label}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

impl QuestionOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Accepted wire shapes for an option. Drag-drop blocks commonly ship bare
/// strings, question inputs ship objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Full { value: String, label: Option<String> },
    Bare(String),
}

impl From<RawOption> for QuestionOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Full { value, label } => {
                let label = label.unwrap_or_else(|| value.clone());
                QuestionOption { value, label }
            }
            RawOption::Bare(value) => QuestionOption {
                label: value.clone(),
                value,
            },
        }
    }
}

/// Question numbers may arrive as JSON numbers or digit strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Num(u32),
    Text(String),
}

/// Decoded attributes of a `question-input` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionInputTag {
    pub number: u32,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
}

impl QuestionInputTag {
    /// Returns `None` when the number or type is missing, or the number is not
    /// a positive integer. Callers render an inline placeholder in that case.
    pub fn from_element(el: &Element) -> Option<Self> {
        let number = el
            .attr(ATTR_QUESTION_NUMBER)
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)?;
        let question_type = el
            .attr(ATTR_QUESTION_TYPE)
            .filter(|t| !t.trim().is_empty())
            .map(QuestionType::from)?;
        let options = parse_options(el.attr(ATTR_QUESTION_OPTIONS));

        Some(Self {
            number,
            question_type,
            options,
        })
    }
}

/// Decodes a JSON option array. Absent means `"[]"`; malformed input is
/// logged and treated as empty.
pub fn parse_options(raw: Option<&str>) -> Vec<QuestionOption> {
    let raw = raw.unwrap_or("[]");
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Malformed option list {:?}: {}", raw, e);
        Vec::new()
    })
}

/// Decodes a JSON array of question numbers, skipping entries that are not
/// positive integers.
pub fn parse_question_numbers(raw: &str) -> Vec<u32> {
    let parsed: Vec<RawNumber> = serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Malformed question list {:?}: {}", raw, e);
        Vec::new()
    });

    parsed
        .into_iter()
        .filter_map(|n| match n {
            RawNumber::Num(n) => Some(n),
            RawNumber::Text(s) => s.trim().parse().ok(),
        })
        .filter(|n| *n > 0)
        .collect()
}

/// `repeat_answer` is on when present, unless explicitly `false`/`0`.
pub fn is_truthy(raw: Option<&str>) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => v != "false" && v != "0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::markup::{Node, parse_fragment};

    fn first_element(html: &str) -> Element {
        match parse_fragment(html).into_iter().next() {
            Some(Node::Element(el)) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_question_type_round_trips_known_and_unknown() {
        assert_eq!(QuestionType::from("short_answer"), QuestionType::ShortAnswer);
        assert_eq!(
            QuestionType::from("true_false_not_given"),
            QuestionType::Unrecognized("true_false_not_given".into())
        );
        let json = serde_json::to_string(&QuestionType::MatchingHeadings).unwrap();
        assert_eq!(json, "\"matching_headings\"");
    }

    #[test]
    fn test_options_accept_objects_and_bare_strings() {
        let opts = parse_options(Some(r#"[{"value":"A","label":"Alpha"},{"value":"B"},"C"]"#));
        assert_eq!(
            opts,
            vec![
                QuestionOption::new("A", "Alpha"),
                QuestionOption::new("B", "B"),
                QuestionOption::new("C", "C"),
            ]
        );
    }

    #[test]
    fn test_malformed_options_become_empty() {
        assert!(parse_options(Some("[{oops")).is_empty());
        assert!(parse_options(None).is_empty());
    }

    #[test]
    fn test_question_numbers_accept_strings() {
        assert_eq!(parse_question_numbers(r#"[1, "2", "x", 0, 7]"#), vec![1, 2, 7]);
    }

    #[test]
    fn test_tag_without_number_is_invalid() {
        let el = first_element(r#"<question-input data-question-type="short_answer"></question-input>"#);
        assert!(QuestionInputTag::from_element(&el).is_none());
    }

    #[test]
    fn test_tag_decodes_all_attributes() {
        let el = first_element(
            r#"<question-input data-question-number="4" data-question-type="multiple_choice" data-question-options='[{"value":"A","label":"Yes"}]'></question-input>"#,
        );
        let tag = QuestionInputTag::from_element(&el).unwrap();
        assert_eq!(tag.number, 4);
        assert_eq!(tag.question_type, QuestionType::MultipleChoice);
        assert_eq!(tag.options, vec![QuestionOption::new("A", "Yes")]);
    }

    #[test]
    fn test_repeat_answer_truthiness() {
        assert!(is_truthy(Some("")));
        assert!(is_truthy(Some("true")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(None));
    }
}
