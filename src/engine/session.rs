// src/engine/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EngineError;
use super::answer_store::{AnswerRecord, AnswerStore};
use super::countdown::{Countdown, CountdownView};
use super::drag_drop::{DragDropController, DragItem};
use super::highlight::{HighlightRange, HighlightSet};
use super::lockdown::{
    BrowserEvent, ClientDirective, DirectiveFullscreen, ExitOutcome, Lockdown, LockdownView, Role,
    Verdict,
};
use super::markup::{Node, parse_fragment};
use super::question::QuestionInputTag;
use super::resolver::resolve;
use super::transform::{
    RenderCache, RenderContext, RenderNode, drag_blocks, prose_len, question_tags,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Reading,
    Listening,
}

/// Authored content of one test section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSource {
    pub kind: SectionKind,
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Expired,
}

/// Body posted to the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub answers: Vec<AnswerRecord>,
}

struct Section {
    source: SectionSource,
    nodes: Vec<Node>,
    blocks: Vec<DragDropController>,
    inputs: BTreeMap<u32, QuestionInputTag>,
    // every answer number this section reads, for render memoization
    numbers: Vec<u32>,
    highlights: HighlightSet,
    prose_len: usize,
    cache: RenderCache,
}

impl Section {
    fn parse(source: SectionSource) -> Self {
        let nodes = parse_fragment(&source.html);
        let inputs = question_tags(&nodes)
            .into_iter()
            .map(|tag| (tag.number, tag))
            .collect();
        let prose_len = prose_len(&nodes);

        Self {
            source,
            nodes,
            blocks: Vec::new(),
            inputs,
            numbers: Vec::new(),
            highlights: HighlightSet::default(),
            prose_len,
            cache: RenderCache::default(),
        }
    }

    /// Builds the drag-and-drop controllers once the store is sized.
    fn bind(&mut self, store: &AnswerStore) {
        self.blocks = drag_blocks(&self.nodes, store);
        let mut numbers: Vec<u32> = self.inputs.keys().copied().collect();
        numbers.extend(self.blocks.iter().flat_map(|b| b.slots().iter().copied()));
        numbers.sort_unstable();
        numbers.dedup();
        self.numbers = numbers;
    }

    fn slot_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks.iter().flat_map(|b| b.slots().iter().copied())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub index: usize,
    pub kind: SectionKind,
    pub title: String,
    pub nodes: Vec<RenderNode>,
    pub highlights: Vec<HighlightRange>,
    pub prose_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub role: Role,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub question_count: usize,
    pub countdown: CountdownView,
    pub lockdown: LockdownView,
    pub directives: Vec<ClientDirective>,
    pub sections: Vec<SectionView>,
    pub answers: Vec<AnswerRecord>,
}

/// One attempt at a test.
///
/// Owns the answer store shared by all sections, the drag-and-drop state of
/// every block, the countdown and the lockdown.
pub struct ExamSession {
    role: Role,
    sections: Vec<Section>,
    store: AnswerStore,
    countdown: Countdown,
    lockdown: Lockdown<DirectiveFullscreen>,
    status: SessionStatus,
    // payload handed to the sink, answers frozen until it settles
    submitting: bool,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

/// Parses every section and sizes the answer store for them.
fn parse_sections(sources: Vec<SectionSource>) -> (Vec<Section>, u32) {
    let mut sections: Vec<Section> = sources.into_iter().map(Section::parse).collect();

    let mut total = 0u32;
    for section in &sections {
        total = total.max(section.inputs.keys().copied().max().unwrap_or(0));
    }
    // slot numbers are only known after parsing the blocks, which needs a store
    let probe = AnswerStore::with_len(0);
    for section in &mut sections {
        section.bind(&probe);
        total = total.max(section.slot_numbers().max().unwrap_or(0));
    }
    (sections, total)
}

/// Highest question number referenced by any section, which is the length of
/// the answer store a session over these sections allocates.
pub fn question_total(sources: &[SectionSource]) -> u32 {
    parse_sections(sources.to_vec()).1
}

impl ExamSession {
    pub fn start(sources: Vec<SectionSource>, role: Role, duration_secs: u64) -> Self {
        let (mut sections, total) = parse_sections(sources);

        let store = AnswerStore::with_len(total as usize);
        for section in &mut sections {
            section.bind(&store);
        }
        warn_on_shared_numbers(&sections);

        let mut lockdown = Lockdown::new(role, DirectiveFullscreen::default());
        lockdown.set_should_block(true);

        tracing::info!(
            sections = sections.len(),
            questions = total,
            ?role,
            "Exam session started"
        );

        Self {
            role,
            sections,
            store,
            countdown: Countdown::new(duration_secs),
            lockdown,
            status: SessionStatus::InProgress,
            submitting: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.store
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Renders every section and drains pending client directives.
    ///
    /// A student who confirmed leaving and came back while the session is
    /// still open gets the lockdown switched on again.
    pub fn view(&mut self) -> SessionView {
        if self.is_open() && !self.lockdown.is_active() {
            self.lockdown.set_should_block(true);
        }

        let store = &self.store;
        let sections = self
            .sections
            .iter_mut()
            .enumerate()
            .map(|(index, section)| {
                let ctx = RenderContext {
                    store,
                    blocks: &section.blocks,
                    highlights: &section.highlights,
                };
                let nodes = section
                    .cache
                    .get_or_render(&section.source.html, &section.nodes, &section.numbers, &ctx)
                    .to_vec();
                SectionView {
                    index,
                    kind: section.source.kind,
                    title: section.source.title.clone(),
                    nodes,
                    highlights: section.highlights.ranges().to_vec(),
                    prose_len: section.prose_len,
                }
            })
            .collect();

        SessionView {
            status: self.status,
            role: self.role,
            started_at: self.started_at,
            finished_at: self.finished_at,
            question_count: self.store.len(),
            countdown: self.countdown.view(),
            lockdown: self.lockdown.view(),
            directives: self.lockdown.controller_mut().drain(),
            sections,
            answers: self.store.records().to_vec(),
        }
    }

    /// Writes one answer through the control rendered for `number`.
    pub fn set_answer(&mut self, number: u32, value: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        let tag = self
            .sections
            .iter()
            .find_map(|s| s.inputs.get(&number))
            .ok_or(EngineError::UnknownQuestion(number))?;
        let control = resolve(tag.number, &tag.question_type, &tag.options)
            .ok_or(EngineError::UnknownQuestion(number))?;
        if !control.accepts(value) {
            return Err(EngineError::InvalidAnswer {
                number,
                value: value.to_string(),
            });
        }
        control.field().set(&mut self.store, value)
    }

    pub fn drop_option(
        &mut self,
        section: usize,
        item: &DragItem,
        target: u32,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        let section = self
            .sections
            .get_mut(section)
            .ok_or(EngineError::UnknownSection(section))?;
        let block = section
            .blocks
            .iter_mut()
            .find(|b| b.has_slot(target))
            .ok_or(EngineError::UnknownSlot(target))?;
        block.drop(item, target, &mut self.store)
    }

    pub fn remove_slot(&mut self, section: usize, slot: u32) -> Result<Option<String>, EngineError> {
        self.ensure_open()?;
        let section = self
            .sections
            .get_mut(section)
            .ok_or(EngineError::UnknownSection(section))?;
        let block = section
            .blocks
            .iter_mut()
            .find(|b| b.has_slot(slot))
            .ok_or(EngineError::UnknownSlot(slot))?;
        block.remove(slot, &mut self.store)
    }

    pub fn add_highlight(&mut self, section: usize, range: HighlightRange) -> Result<(), EngineError> {
        let section = self.section_mut(section)?;
        if range.end > section.prose_len {
            return Err(EngineError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        section.highlights.add(range.start, range.end)
    }

    pub fn remove_highlight(
        &mut self,
        section: usize,
        range: HighlightRange,
    ) -> Result<(), EngineError> {
        self.section_mut(section)?.highlights.remove(range.start, range.end)
    }

    pub fn clear_highlights(&mut self, section: usize) -> Result<(), EngineError> {
        self.section_mut(section)?.highlights.clear();
        Ok(())
    }

    pub fn handle_event(&mut self, event: &BrowserEvent) -> Verdict {
        self.lockdown.handle(event)
    }

    pub fn resolve_exit(&mut self, confirmed: bool) -> ExitOutcome {
        self.lockdown.resolve_exit(confirmed)
    }

    pub fn lockdown(&self) -> &Lockdown<DirectiveFullscreen> {
        &self.lockdown
    }

    pub fn drain_directives(&mut self) -> Vec<ClientDirective> {
        self.lockdown.controller_mut().drain()
    }

    /// Advances the countdown by one second while the session is open.
    /// Returns true on the tick that exhausts the time budget.
    pub fn tick(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.countdown.tick()
    }

    pub fn payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            answers: self.store.records().to_vec(),
        }
    }

    /// Open, out of time and not already being submitted.
    pub fn is_due(&self) -> bool {
        self.is_open() && self.countdown.is_expired() && !self.submitting
    }

    /// Freezes the answers and hands out the payload to deliver.
    /// Every write is refused until `mark_submitted` or `abort_submission`.
    pub fn begin_submission(&mut self) -> Result<SubmissionPayload, EngineError> {
        if !self.is_open() {
            return Err(EngineError::SessionClosed);
        }
        if self.submitting {
            return Err(EngineError::SubmissionPending);
        }
        self.submitting = true;
        Ok(self.payload())
    }

    /// Delivery failed; the session is writable again unless time is up.
    pub fn abort_submission(&mut self) {
        self.submitting = false;
    }

    /// Closes the session after a successful submission and lifts the lockdown.
    pub fn mark_submitted(&mut self, expired: bool) {
        self.submitting = false;
        self.status = if expired {
            SessionStatus::Expired
        } else {
            SessionStatus::Submitted
        };
        self.finished_at = Some(Utc::now());
        self.lockdown.set_should_block(false);
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if !self.is_open() {
            Err(EngineError::SessionClosed)
        } else if self.countdown.is_expired() {
            Err(EngineError::TimeUp)
        } else if self.submitting {
            Err(EngineError::SubmissionPending)
        } else {
            Ok(())
        }
    }

    fn section_mut(&mut self, idx: usize) -> Result<&mut Section, EngineError> {
        self.sections
            .get_mut(idx)
            .ok_or(EngineError::UnknownSection(idx))
    }
}

fn warn_on_shared_numbers(sections: &[Section]) {
    let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
    for (idx, section) in sections.iter().enumerate() {
        let numbers = section
            .inputs
            .keys()
            .copied()
            .chain(section.slot_numbers());
        for number in numbers {
            if let Some(prev) = seen.insert(number, idx) {
                tracing::warn!(
                    question = number,
                    first_section = prev,
                    section = idx,
                    "Question number used more than once; answers will collide"
                );
            }
        }
    }
}
