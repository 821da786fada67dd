// src/engine/drag_drop.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EngineError;
use super::answer_store::{AnswerField, AnswerStore};
use super::markup::Element;
use super::question::{
    ATTR_OPTIONS, ATTR_QUESTION_NUMBER, ATTR_QUESTIONS, ATTR_REPEAT_ANSWER, DROP_SLOT_TAG,
    QuestionOption, is_truthy, parse_options, parse_question_numbers,
};

/// A token being dragged.
///
/// `origin` is set when the token is dragged out of a slot rather than out of
/// the option pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DragItem {
    pub value: String,
    #[serde(default)]
    pub origin: Option<u32>,
}

impl DragItem {
    pub fn from_pool(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }

    pub fn from_slot(value: impl Into<String>, slot: u32) -> Self {
        Self {
            value: value.into(),
            origin: Some(slot),
        }
    }
}

/// Which option fills which slot, and which options are consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DragDropState {
    pub dropped_answers: BTreeMap<u32, String>,
    pub is_option_dropped: BTreeMap<String, bool>,
}

/// State of one `drag-drop-tags` block.
#[derive(Debug, Clone)]
pub struct DragDropController {
    options: Vec<QuestionOption>,
    slots: Vec<u32>,
    repeat_answer: bool,
    state: DragDropState,
}

impl DragDropController {
    pub fn new(
        options: Vec<QuestionOption>,
        slots: Vec<u32>,
        repeat_answer: bool,
        store: &AnswerStore,
    ) -> Self {
        let mut controller = Self {
            options,
            slots,
            repeat_answer,
            state: DragDropState::default(),
        };
        controller.reseed(store);
        controller
    }

    /// Builds a controller from a parsed `drag-drop-tags` element.
    ///
    /// Slots come from `data-questions`; without it, from the `drop-slot`
    /// descendants in document order.
    pub fn from_element(el: &Element, store: &AnswerStore) -> Self {
        let options = parse_options(el.attr(ATTR_OPTIONS));
        let slots = match el.attr(ATTR_QUESTIONS) {
            Some(raw) => parse_question_numbers(raw),
            None => el
                .descendants_named(DROP_SLOT_TAG)
                .iter()
                .filter_map(|s| s.attr(ATTR_QUESTION_NUMBER))
                .filter_map(|n| n.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .collect(),
        };
        let repeat_answer = is_truthy(el.attr(ATTR_REPEAT_ANSWER));

        Self::new(options, slots, repeat_answer, store)
    }

    /// Re-derives the drag state from the answer store.
    pub fn reseed(&mut self, store: &AnswerStore) {
        let dropped_answers: BTreeMap<u32, String> = self
            .slots
            .iter()
            .filter_map(|slot| {
                store
                    .answer(*slot)
                    .filter(|a| !a.is_empty())
                    .map(|a| (*slot, a.to_string()))
            })
            .collect();

        let mut is_option_dropped: BTreeMap<String, bool> = self
            .options
            .iter()
            .map(|o| (o.value.clone(), false))
            .collect();
        for value in dropped_answers.values() {
            is_option_dropped.insert(value.clone(), true);
        }

        self.state = DragDropState {
            dropped_answers,
            is_option_dropped,
        };
    }

    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    pub fn has_slot(&self, slot: u32) -> bool {
        self.slots.contains(&slot)
    }

    pub fn repeat_answer(&self) -> bool {
        self.repeat_answer
    }

    pub fn state(&self) -> &DragDropState {
        &self.state
    }

    pub fn slot_value(&self, slot: u32) -> Option<&str> {
        self.state.dropped_answers.get(&slot).map(String::as_str)
    }

    pub fn is_dropped(&self, value: &str) -> bool {
        self.state.is_option_dropped.get(value).copied().unwrap_or(false)
    }

    /// Options still shown in the pool. With repeats enabled every option stays.
    pub fn available_options(&self) -> Vec<&QuestionOption> {
        self.options
            .iter()
            .filter(|o| self.repeat_answer || !self.is_dropped(&o.value))
            .collect()
    }

    /// Drops `item` onto `target`, relocating and displacing as needed, and
    /// mirrors the result into the answer store.
    pub fn drop(
        &mut self,
        item: &DragItem,
        target: u32,
        store: &mut AnswerStore,
    ) -> Result<(), EngineError> {
        if !self.has_slot(target) {
            return Err(EngineError::UnknownSlot(target));
        }
        if !self.options.iter().any(|o| o.value == item.value) {
            return Err(EngineError::UnknownOption(item.value.clone()));
        }

        let old_slots: Vec<u32> = if self.repeat_answer {
            item.origin
                .filter(|o| *o != target && self.slot_value(*o) == Some(item.value.as_str()))
                .into_iter()
                .collect()
        } else {
            self.state
                .dropped_answers
                .iter()
                .filter(|(slot, v)| **slot != target && **v == item.value)
                .map(|(slot, _)| *slot)
                .collect()
        };

        // Resolve every field before touching anything so a bad index leaves
        // the state untouched.
        let target_field = store.field(target)?;
        let old_fields = old_slots
            .iter()
            .map(|s| store.field(*s))
            .collect::<Result<Vec<AnswerField>, _>>()?;

        for (slot, field) in old_slots.iter().zip(old_fields) {
            self.state.dropped_answers.remove(slot);
            field.clear(store)?;
        }

        let displaced = self
            .state
            .dropped_answers
            .insert(target, item.value.clone())
            .filter(|prev| *prev != item.value);

        if let Some(displaced) = displaced {
            let still_placed = self.repeat_answer && self.holds_value(&displaced);
            self.state.is_option_dropped.insert(displaced, still_placed);
        }
        self.state.is_option_dropped.insert(item.value.clone(), true);
        target_field.set(store, item.value.clone())?;

        tracing::debug!(slot = target, value = %item.value, "Option dropped");
        Ok(())
    }

    /// Clears a slot and returns its option to the pool.
    /// Returns the value that was removed, if any.
    pub fn remove(&mut self, slot: u32, store: &mut AnswerStore) -> Result<Option<String>, EngineError> {
        if !self.has_slot(slot) {
            return Err(EngineError::UnknownSlot(slot));
        }
        let field = store.field(slot)?;

        let Some(value) = self.state.dropped_answers.remove(&slot) else {
            return Ok(None);
        };
        let still_placed = self.repeat_answer && self.holds_value(&value);
        self.state.is_option_dropped.insert(value.clone(), still_placed);
        field.clear(store)?;

        Ok(Some(value))
    }

    fn holds_value(&self, value: &str) -> bool {
        self.state.dropped_answers.values().any(|v| v == value)
    }
}
