// src/utils/html.rs

use std::collections::HashSet;

use ammonia::Builder;

use crate::engine::question::{
    ATTR_OPTIONS, ATTR_QUESTION_NUMBER, ATTR_QUESTION_OPTIONS, ATTR_QUESTION_TYPE, ATTR_QUESTIONS,
    ATTR_REPEAT_ANSWER, DRAG_DROP_TAG, DROP_SLOT_TAG, QUESTION_INPUT_TAG,
};

/// Clean section HTML with ammonia before it is stored.
///
/// Uses ammonia's whitelist, extended with the exam markup: the question,
/// drag-drop and slot tags keep their data attributes, and table layout
/// attributes survive for answer grids. Scripts, iframes and event handler
/// attributes are stripped.
pub fn clean_section_html(input: &str) -> String {
    let question_attrs = HashSet::from([ATTR_QUESTION_NUMBER, ATTR_QUESTION_TYPE, ATTR_QUESTION_OPTIONS]);
    let drag_attrs = HashSet::from([ATTR_OPTIONS, ATTR_QUESTIONS, ATTR_REPEAT_ANSWER]);
    let slot_attrs = HashSet::from([ATTR_QUESTION_NUMBER]);

    Builder::default()
        .add_tags([QUESTION_INPUT_TAG, DRAG_DROP_TAG, DROP_SLOT_TAG])
        .add_tag_attributes(QUESTION_INPUT_TAG, question_attrs)
        .add_tag_attributes(DRAG_DROP_TAG, drag_attrs)
        .add_tag_attributes(DROP_SLOT_TAG, slot_attrs)
        .add_tag_attributes("td", ["colspan", "rowspan"])
        .add_tag_attributes("th", ["colspan", "rowspan"])
        .clean(input)
        .to_string()
}
