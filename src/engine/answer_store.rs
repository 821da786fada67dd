// src/engine/answer_store.rs

use serde::{Deserialize, Serialize};

use super::EngineError;

/// One entry of the answer store. Serialised as `{"answer": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
}

/// Ordered answers for a whole test.
///
/// Index `i` belongs to question `i + 1` and nothing else writes it. The store
/// is sized once at session start and pre-filled with empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    records: Vec<AnswerRecord>,
}

/// Capability to read and write exactly one index of an [`AnswerStore`].
///
/// Widgets hold one of these instead of the store itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AnswerField {
    index: usize,
}

impl AnswerField {
    /// Field for a 1-based question number. Number 0 has no field.
    pub fn for_question(number: u32) -> Option<Self> {
        let index = (number as usize).checked_sub(1)?;
        Some(Self { index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question_number(&self) -> u32 {
        self.index as u32 + 1
    }

    pub fn get<'a>(&self, store: &'a AnswerStore) -> Option<&'a str> {
        store.records.get(self.index).map(|r| r.answer.as_str())
    }

    /// Overwrites this field's answer. Last writer wins.
    pub fn set(&self, store: &mut AnswerStore, value: impl Into<String>) -> Result<(), EngineError> {
        let total = store.records.len();
        let record = store
            .records
            .get_mut(self.index)
            .ok_or(EngineError::QuestionOutOfRange {
                number: self.question_number(),
                total,
            })?;
        record.answer = value.into();
        Ok(())
    }

    pub fn clear(&self, store: &mut AnswerStore) -> Result<(), EngineError> {
        self.set(store, String::new())
    }
}

impl AnswerStore {
    /// Store with `total` empty placeholders.
    pub fn with_len(total: usize) -> Self {
        Self {
            records: vec![AnswerRecord::default(); total],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolves a question number into a bound field, checking the bounds.
    pub fn field(&self, number: u32) -> Result<AnswerField, EngineError> {
        AnswerField::for_question(number)
            .filter(|f| f.index < self.records.len())
            .ok_or(EngineError::QuestionOutOfRange {
                number,
                total: self.records.len(),
            })
    }

    pub fn answer(&self, number: u32) -> Option<&str> {
        AnswerField::for_question(number).and_then(|f| f.get(self))
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AnswerRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_prefilled_with_empty_answers() {
        let store = AnswerStore::with_len(3);
        assert_eq!(store.len(), 3);
        assert!(store.records().iter().all(|r| r.answer.is_empty()));
    }

    #[test]
    fn test_field_writes_only_its_index() {
        let mut store = AnswerStore::with_len(5);
        let field = store.field(3).unwrap();
        field.set(&mut store, "B").unwrap();

        for (i, record) in store.records().iter().enumerate() {
            if i == 2 {
                assert_eq!(record.answer, "B");
            } else {
                assert_eq!(record.answer, "");
            }
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = AnswerStore::with_len(1);
        let field = store.field(1).unwrap();
        field.set(&mut store, "first").unwrap();
        field.set(&mut store, "second").unwrap();
        assert_eq!(store.answer(1), Some("second"));
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        let store = AnswerStore::with_len(2);
        assert!(AnswerField::for_question(0).is_none());
        assert_eq!(
            store.field(3),
            Err(EngineError::QuestionOutOfRange { number: 3, total: 2 })
        );
    }

    #[test]
    fn test_records_serialize_as_answer_objects() {
        let mut store = AnswerStore::with_len(2);
        store.field(2).unwrap().set(&mut store, "Paris").unwrap();
        let json = serde_json::to_value(store.records()).unwrap();
        assert_eq!(json, serde_json::json!([{"answer": ""}, {"answer": "Paris"}]));
    }
}
