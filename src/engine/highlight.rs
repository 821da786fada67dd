// src/engine/highlight.rs

//! Highlight overlay kept as data.
//!
//! Ranges are character offsets into the prose text of a section (the
//! concatenated text nodes in document order). The renderer splits text nodes
//! against these ranges; the parsed content is never modified.

use serde::{Deserialize, Serialize};

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

/// Sorted, non-overlapping, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
    ranges: Vec<HighlightRange>,
}

impl HighlightSet {
    pub fn ranges(&self) -> &[HighlightRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Adds a range, merging with anything it overlaps or touches.
    pub fn add(&mut self, start: usize, end: usize) -> Result<(), EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange { start, end });
        }
        let mut merged = HighlightRange { start, end };
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.end < merged.start || r.start > merged.end {
                kept.push(r);
            } else {
                merged.start = merged.start.min(r.start);
                merged.end = merged.end.max(r.end);
            }
        }
        kept.push(merged);
        kept.sort_by_key(|r| r.start);
        self.ranges = kept;
        Ok(())
    }

    /// Un-highlights `start..end`, splitting ranges that straddle it.
    pub fn remove(&mut self, start: usize, end: usize) -> Result<(), EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange { start, end });
        }
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.end <= start || r.start >= end {
                kept.push(r);
                continue;
            }
            if r.start < start {
                kept.push(HighlightRange { start: r.start, end: start });
            }
            if r.end > end {
                kept.push(HighlightRange { start: end, end: r.end });
            }
        }
        self.ranges = kept;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Splits a whole text into segments.
    pub fn segments(&self, text: &str) -> Vec<Segment> {
        self.split_at(0, text)
    }

    /// Splits a text node that begins at character `offset` of the prose.
    pub fn split_at(&self, offset: usize, text: &str) -> Vec<Segment> {
        let len = text.chars().count();
        let node_end = offset + len;
        let mut segments = Vec::new();
        let mut cursor = 0;

        for r in &self.ranges {
            if r.end <= offset || r.start >= node_end {
                continue;
            }
            let local_start = r.start.saturating_sub(offset);
            let local_end = (r.end - offset).min(len);
            if local_start > cursor {
                segments.push(segment(text, cursor, local_start, false));
            }
            segments.push(segment(text, local_start.max(cursor), local_end, true));
            cursor = local_end;
        }
        if cursor < len || segments.is_empty() {
            segments.push(segment(text, cursor, len, false));
        }
        segments
    }
}

fn segment(text: &str, start: usize, end: usize, highlighted: bool) -> Segment {
    Segment {
        text: text.chars().skip(start).take(end.saturating_sub(start)).collect(),
        highlighted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(set: &HighlightSet) -> Vec<(usize, usize)> {
        set.ranges().iter().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn test_add_merges_overlapping_and_adjacent() {
        let mut set = HighlightSet::default();
        set.add(10, 20).unwrap();
        set.add(0, 5).unwrap();
        set.add(15, 25).unwrap();
        assert_eq!(spans(&set), vec![(0, 5), (10, 25)]);
        set.add(5, 10).unwrap();
        assert_eq!(spans(&set), vec![(0, 25)]);
    }

    #[test]
    fn test_remove_splits_range() {
        let mut set = HighlightSet::default();
        set.add(0, 10).unwrap();
        set.remove(3, 6).unwrap();
        assert_eq!(spans(&set), vec![(0, 3), (6, 10)]);
        set.remove(0, 100).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut set = HighlightSet::default();
        assert_eq!(set.add(4, 4), Err(EngineError::InvalidRange { start: 4, end: 4 }));
        assert_eq!(set.remove(5, 1), Err(EngineError::InvalidRange { start: 5, end: 1 }));
    }

    #[test]
    fn test_segments_render_overlay() {
        let mut set = HighlightSet::default();
        set.add(4, 9).unwrap();
        let segs = set.segments("The quick fox");
        let rendered: Vec<_> = segs.iter().map(|s| (s.text.as_str(), s.highlighted)).collect();
        assert_eq!(rendered, vec![("The ", false), ("quick", true), (" fox", false)]);
    }

    #[test]
    fn test_split_at_offset_and_clamping() {
        let mut set = HighlightSet::default();
        set.add(3, 50).unwrap();
        // text node covering prose chars 5..9
        let segs = set.split_at(5, "abcd");
        assert_eq!(segs, vec![Segment { text: "abcd".into(), highlighted: true }]);
        let untouched = set.split_at(0, "ab");
        assert_eq!(untouched, vec![Segment { text: "ab".into(), highlighted: false }]);
    }

    #[test]
    fn test_multibyte_text_split_by_chars() {
        let mut set = HighlightSet::default();
        set.add(1, 2).unwrap();
        let segs = set.segments("héllo");
        assert_eq!(segs[1], Segment { text: "é".into(), highlighted: true });
    }
}
