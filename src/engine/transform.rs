// src/engine/transform.rs

//! Turns a parsed section into a render tree.
//!
//! Custom question tags become live controls bound to the answer store; every
//! other node is passed through as-is.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::answer_store::AnswerStore;
use super::drag_drop::DragDropController;
use super::highlight::HighlightSet;
use super::markup::{Element, Node};
use super::question::{
    ATTR_QUESTION_NUMBER, DRAG_DROP_TAG, DROP_SLOT_TAG, QUESTION_INPUT_TAG, QuestionInputTag,
    QuestionOption, QuestionType,
};
use super::resolver::{Control, resolve};

/// Placeholder text for a question tag missing its number or type.
pub const INVALID_QUESTION_INPUT: &str = "Invalid question input";
pub const INVALID_DRAG_DROP: &str = "Invalid drag and drop block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<RenderNode>,
    },
    Text {
        text: String,
        highlighted: bool,
    },
    Comment {
        text: String,
    },
    Question {
        number: u32,
        question_type: QuestionType,
        control: Control,
        value: String,
    },
    Invalid {
        message: String,
    },
    DragDrop {
        block: usize,
        repeat_answer: bool,
        /// Options still in the pool.
        available: Vec<QuestionOption>,
        children: Vec<RenderNode>,
    },
    Slot {
        number: u32,
        value: Option<String>,
        removable: bool,
    },
}

/// Dynamic state a render depends on.
pub struct RenderContext<'a> {
    pub store: &'a AnswerStore,
    pub blocks: &'a [DragDropController],
    pub highlights: &'a HighlightSet,
}

pub fn render(nodes: &[Node], ctx: &RenderContext<'_>) -> Vec<RenderNode> {
    let mut walker = Walker {
        ctx,
        offset: 0,
        next_block: 0,
    };
    walker.walk(nodes, None)
}

struct Walker<'c, 'a> {
    ctx: &'c RenderContext<'a>,
    // character offset into the prose, for highlights
    offset: usize,
    next_block: usize,
}

impl Walker<'_, '_> {
    fn walk(&mut self, nodes: &[Node], block: Option<usize>) -> Vec<RenderNode> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => {
                    for seg in self.ctx.highlights.split_at(self.offset, text) {
                        out.push(RenderNode::Text {
                            text: seg.text,
                            highlighted: seg.highlighted,
                        });
                    }
                    self.offset += text.chars().count();
                }
                Node::Comment(text) => out.push(RenderNode::Comment { text: text.clone() }),
                Node::Element(el) => {
                    if let Some(rendered) = self.element(el, block) {
                        out.push(rendered);
                    }
                }
            }
        }
        out
    }

    fn element(&mut self, el: &Element, block: Option<usize>) -> Option<RenderNode> {
        match (el.tag.as_str(), block) {
            (QUESTION_INPUT_TAG, _) => self.question(el),
            (DRAG_DROP_TAG, None) => Some(self.drag_drop(el)),
            (DROP_SLOT_TAG, Some(idx)) => Some(self.slot(el, idx)),
            _ => Some(RenderNode::Element {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                children: self.walk(&el.children, block),
            }),
        }
    }

    fn question(&self, el: &Element) -> Option<RenderNode> {
        let Some(tag) = QuestionInputTag::from_element(el) else {
            return Some(RenderNode::Invalid {
                message: INVALID_QUESTION_INPUT.to_string(),
            });
        };
        let control = resolve(tag.number, &tag.question_type, &tag.options)?;
        let value = control
            .field()
            .get(self.ctx.store)
            .unwrap_or_default()
            .to_string();

        Some(RenderNode::Question {
            number: tag.number,
            question_type: tag.question_type,
            control,
            value,
        })
    }

    fn drag_drop(&mut self, el: &Element) -> RenderNode {
        let idx = self.next_block;
        self.next_block += 1;

        let Some(controller) = self.ctx.blocks.get(idx) else {
            return RenderNode::Invalid {
                message: INVALID_DRAG_DROP.to_string(),
            };
        };
        let available = controller.available_options().into_iter().cloned().collect();
        let repeat_answer = controller.repeat_answer();
        let children = self.walk(&el.children, Some(idx));

        RenderNode::DragDrop {
            block: idx,
            repeat_answer,
            available,
            children,
        }
    }

    fn slot(&self, el: &Element, idx: usize) -> RenderNode {
        let number = el
            .attr(ATTR_QUESTION_NUMBER)
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|n| *n > 0);
        let Some(number) = number else {
            return RenderNode::Invalid {
                message: INVALID_QUESTION_INPUT.to_string(),
            };
        };
        let value = self
            .ctx
            .blocks
            .get(idx)
            .and_then(|c| c.slot_value(number))
            .map(str::to_string);

        RenderNode::Slot {
            number,
            removable: value.is_some(),
            value,
        }
    }
}

/// Drag-and-drop controllers for every top-level block, in the order the
/// renderer numbers them.
pub fn drag_blocks(nodes: &[Node], store: &AnswerStore) -> Vec<DragDropController> {
    let mut out = Vec::new();
    collect_blocks(nodes, store, &mut out);
    out
}

fn collect_blocks(nodes: &[Node], store: &AnswerStore, out: &mut Vec<DragDropController>) {
    for node in nodes {
        if let Node::Element(el) = node {
            match el.tag.as_str() {
                DRAG_DROP_TAG => out.push(DragDropController::from_element(el, store)),
                QUESTION_INPUT_TAG => {}
                _ => collect_blocks(&el.children, store, out),
            }
        }
    }
}

/// Every well-formed question input tag in the section.
pub fn question_tags(nodes: &[Node]) -> Vec<QuestionInputTag> {
    let mut out = Vec::new();
    collect_questions(nodes, &mut out);
    out
}

fn collect_questions(nodes: &[Node], out: &mut Vec<QuestionInputTag>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.tag == QUESTION_INPUT_TAG {
                if let Some(tag) = QuestionInputTag::from_element(el) {
                    out.push(tag);
                }
            } else {
                collect_questions(&el.children, out);
            }
        }
    }
}

/// Number of characters of prose the highlight offsets range over.
pub fn prose_len(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(text) => text.chars().count(),
            Node::Element(el) if el.tag == QUESTION_INPUT_TAG => 0,
            Node::Element(el) => prose_len(&el.children),
            Node::Comment(_) => 0,
        })
        .sum()
}

/// Memoized render of one section, recomputed only when the inputs change.
#[derive(Debug, Default)]
pub struct RenderCache {
    key: Option<u64>,
    nodes: Vec<RenderNode>,
    renders: u64,
}

impl RenderCache {
    /// `questions` lists the answer numbers this section reads.
    pub fn get_or_render(
        &mut self,
        html: &str,
        nodes: &[Node],
        questions: &[u32],
        ctx: &RenderContext<'_>,
    ) -> &[RenderNode] {
        let key = cache_key(html, questions, ctx);
        if self.key != Some(key) {
            self.nodes = render(nodes, ctx);
            self.key = Some(key);
            self.renders += 1;
        }
        &self.nodes
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }
}

fn cache_key(html: &str, questions: &[u32], ctx: &RenderContext<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    html.hash(&mut hasher);
    for number in questions {
        number.hash(&mut hasher);
        ctx.store.answer(*number).hash(&mut hasher);
    }
    for block in ctx.blocks {
        block.state().dropped_answers.hash(&mut hasher);
    }
    for range in ctx.highlights.ranges() {
        (range.start, range.end).hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::drag_drop::DragItem;
    use crate::engine::markup::parse_fragment;

    fn render_html(html: &str, store: &AnswerStore) -> Vec<RenderNode> {
        let nodes = parse_fragment(html);
        let blocks = drag_blocks(&nodes, store);
        let highlights = HighlightSet::default();
        render(
            &nodes,
            &RenderContext {
                store,
                blocks: &blocks,
                highlights: &highlights,
            },
        )
    }

    fn children(node: &RenderNode) -> &[RenderNode] {
        match node {
            RenderNode::Element { children, .. } | RenderNode::DragDrop { children, .. } => children,
            other => panic!("no children on {:?}", other),
        }
    }

    #[test]
    fn test_short_answer_end_to_end() {
        let html = "<p>Answer: <question-input data-question-number='1' data-question-type='short_answer'></question-input></p>";
        let mut store = AnswerStore::with_len(1);

        let rendered = render_html(html, &store);
        let p = &rendered[0];
        assert_eq!(
            children(p)[0],
            RenderNode::Text {
                text: "Answer: ".into(),
                highlighted: false
            }
        );
        let RenderNode::Question { control, value, .. } = &children(p)[1] else {
            panic!("expected question");
        };
        assert!(matches!(control, Control::TextInput { .. }));
        assert_eq!(value, "");

        control.field().set(&mut store, "Paris").unwrap();
        assert_eq!(
            serde_json::to_value(store.records()).unwrap(),
            serde_json::json!([{"answer": "Paris"}])
        );

        let rerendered = render_html(html, &store);
        let RenderNode::Question { value, .. } = &children(&rerendered[0])[1] else {
            panic!("expected question");
        };
        assert_eq!(value, "Paris");
    }

    #[test]
    fn test_multiple_choice_radio_group_shares_field() {
        let html = r#"<question-input data-question-number="2" data-question-type="multiple_choice" data-question-options='[{"value":"A","label":"First"},{"value":"B","label":"Second"}]'></question-input>"#;
        let mut store = AnswerStore::with_len(2);
        let rendered = render_html(html, &store);
        let RenderNode::Question { control, .. } = &rendered[0] else {
            panic!("expected question");
        };
        let Control::RadioGroup { field, options } = control else {
            panic!("expected radio group");
        };
        assert_eq!(options.len(), 2);

        field.set(&mut store, options[1].value.clone()).unwrap();
        field.set(&mut store, options[0].value.clone()).unwrap();
        assert_eq!(store.answer(2), Some("A"));
        field.set(&mut store, options[0].value.clone()).unwrap();
        assert_eq!(store.answer(2), Some("A"));
        assert_eq!(store.answer(1), Some(""));
    }

    #[test]
    fn test_missing_number_renders_placeholder_and_continues() {
        let html = r#"<p><question-input data-question-type="short_answer"></question-input><question-input data-question-number="1" data-question-type="diagram_label"></question-input></p>"#;
        let store = AnswerStore::with_len(1);
        let rendered = render_html(html, &store);
        let kids = children(&rendered[0]);
        assert_eq!(
            kids[0],
            RenderNode::Invalid {
                message: "Invalid question input".into()
            }
        );
        assert!(matches!(kids[1], RenderNode::Question { number: 1, .. }));
    }

    #[test]
    fn test_unrecognized_type_is_skipped() {
        let html = r#"<div><question-input data-question-number="1" data-question-type="essay"></question-input>tail</div>"#;
        let rendered = render_html(html, &AnswerStore::with_len(1));
        let kids = children(&rendered[0]);
        assert_eq!(kids.len(), 1);
        assert!(matches!(kids[0], RenderNode::Text { .. }));
    }

    #[test]
    fn test_prose_passes_through_unchanged() {
        let html = r#"<table class="t"><tr><td><em>x</em></td></tr></table><h2>Title</h2>"#;
        let rendered = render_html(html, &AnswerStore::with_len(0));
        let RenderNode::Element { tag, attrs, .. } = &rendered[0] else {
            panic!("expected element");
        };
        assert_eq!(tag, "table");
        assert_eq!(attrs, &vec![("class".to_string(), "t".to_string())]);
        assert!(matches!(&rendered[1], RenderNode::Element { tag, .. } if tag == "h2"));
    }

    #[test]
    fn test_drag_drop_block_renders_pool_and_slots() {
        let html = r#"<drag-drop-tags data-options='["cat","dog"]'><p>A <drop-slot data-question-number="1"></drop-slot> barks.</p></drag-drop-tags>"#;
        let mut store = AnswerStore::with_len(1);
        let nodes = parse_fragment(html);
        let mut blocks = drag_blocks(&nodes, &store);
        blocks[0].drop(&DragItem::from_pool("dog"), 1, &mut store).unwrap();

        let highlights = HighlightSet::default();
        let rendered = render(
            &nodes,
            &RenderContext {
                store: &store,
                blocks: &blocks,
                highlights: &highlights,
            },
        );
        let RenderNode::DragDrop { available, children: kids, .. } = &rendered[0] else {
            panic!("expected drag drop");
        };
        assert_eq!(available, &vec![QuestionOption::new("cat", "cat")]);
        assert_eq!(
            children(&kids[0])[1],
            RenderNode::Slot {
                number: 1,
                value: Some("dog".into()),
                removable: true
            }
        );
    }

    #[test]
    fn test_highlights_split_text_nodes() {
        let nodes = parse_fragment("<p>Hello <b>bright</b> world</p>");
        let store = AnswerStore::with_len(0);
        let mut highlights = HighlightSet::default();
        highlights.add(4, 9).unwrap();
        let rendered = render(
            &nodes,
            &RenderContext {
                store: &store,
                blocks: &[],
                highlights: &highlights,
            },
        );
        let kids = children(&rendered[0]);
        assert_eq!(
            kids[1],
            RenderNode::Text {
                text: "o ".into(),
                highlighted: true
            }
        );
        let bold = children(&kids[2]);
        assert_eq!(
            bold[0],
            RenderNode::Text {
                text: "bri".into(),
                highlighted: true
            }
        );
        assert_eq!(prose_len(&nodes), "Hello bright world".len());
    }

    #[test]
    fn test_render_cache_reuses_until_inputs_change() {
        let html = "<p><question-input data-question-number='1' data-question-type='short_answer'></question-input></p>";
        let nodes = parse_fragment(html);
        let mut store = AnswerStore::with_len(1);
        let highlights = HighlightSet::default();
        let mut cache = RenderCache::default();

        for _ in 0..3 {
            let ctx = RenderContext {
                store: &store,
                blocks: &[],
                highlights: &highlights,
            };
            cache.get_or_render(html, &nodes, &[1], &ctx);
        }
        assert_eq!(cache.render_count(), 1);

        store.field(1).unwrap().set(&mut store, "x").unwrap();
        let ctx = RenderContext {
            store: &store,
            blocks: &[],
            highlights: &highlights,
        };
        cache.get_or_render(html, &nodes, &[1], &ctx);
        assert_eq!(cache.render_count(), 2);
    }

    #[test]
    fn test_question_tags_and_blocks_collected() {
        let nodes = parse_fragment(
            r#"<p><question-input data-question-number="3" data-question-type="short_answer"></question-input></p><drag-drop-tags data-options='["a"]' data-questions='[4]'></drag-drop-tags><question-input data-question-type="x"></question-input>"#,
        );
        let tags = question_tags(&nodes);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].number, 3);
        let blocks = drag_blocks(&nodes, &AnswerStore::with_len(4));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].slots(), &[4]);
    }
}
