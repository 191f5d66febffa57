//! Edit Planner
//!
//! Translates edits expressed in decoded coordinates into edits on the
//! physical spans. An edit either splices a single `RawChars` span in
//! place or falls back to re-encoding the whole value. Planning is pure:
//! [`XmlValue`](super::value::XmlValue) applies the plans.

use super::decoder::DecodedValue;
use crate::core::entities::{contains_cdata_end, contains_markup_start, is_verbatim_safe};
use crate::core::span::{Span, SpanKind};

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

/// What an edit did to the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOutcome {
    /// Nothing to do
    Unchanged,
    /// One span was edited in place
    InPlace,
    /// The value was re-encoded as a whole
    Replaced,
    /// The whole decoded value was removed
    Deleted,
}

/// A planned physical edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Unchanged,
    /// Replace `remove` bytes at `offset` within span `span` by `insert`
    Splice {
        span: usize,
        offset: usize,
        remove: usize,
        insert: String,
    },
    /// Re-encode the value from this decoded text
    Replace(String),
    /// Drop all content, keeping delimiters
    Delete,
}

impl Plan {
    pub fn outcome(&self) -> EditOutcome {
        match self {
            Plan::Unchanged => EditOutcome::Unchanged,
            Plan::Splice { .. } => EditOutcome::InPlace,
            Plan::Replace(_) => EditOutcome::Replaced,
            Plan::Delete => EditOutcome::Deleted,
        }
    }
}

/// A planned split into two values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitPlan {
    /// Left part is empty
    AllRight,
    /// Right part is empty
    AllLeft,
    /// Span lists for both parts. `physical_cut` is where the right part
    /// starts within the original region.
    Spans {
        left: Vec<Span>,
        right: Vec<Span>,
        physical_cut: usize,
    },
    /// Decoded text for both parts, to be re-encoded
    Reencode {
        left: String,
        right: String,
        physical_cut: usize,
    },
}

/// Plans edits against a span sequence and its decoded value
pub struct EditPlanner<'a> {
    spans: &'a [Span],
    value: &'a DecodedValue,
}

impl<'a> EditPlanner<'a> {
    /// `value` must be the decoding of `spans`
    pub fn new(spans: &'a [Span], value: &'a DecodedValue) -> Self {
        debug_assert_eq!(
            spans.len(),
            value.segments().len(),
            "decoded value does not belong to these spans"
        );
        EditPlanner { spans, value }
    }

    /// Plan inserting `text` at decoded offset `at`.
    ///
    /// Returns `None` if `at` is out of range or not a char boundary.
    pub fn insert(&self, text: &str, at: usize) -> Option<Plan> {
        if text.is_empty() {
            return Some(Plan::Unchanged);
        }
        let old = self.value.text();
        if at > old.len() || !old.is_char_boundary(at) {
            return None;
        }

        let segments = self.value.segments();
        for idx in self.value.spans_at(at) {
            let span = &self.spans[idx];
            let seg = &segments[idx];
            if span.kind != SpanKind::RawChars || !is_verbatim_safe(text, seg.in_cdata) {
                continue;
            }
            let offset = at - seg.display_start;
            if splice_is_safe(span, offset, 0, text, seg.in_cdata) {
                return Some(Plan::Splice {
                    span: idx,
                    offset,
                    remove: 0,
                    insert: text.to_string(),
                });
            }
        }

        let mut replaced = String::with_capacity(old.len() + text.len());
        replaced.push_str(&old[..at]);
        replaced.push_str(text);
        replaced.push_str(&old[at..]);
        Some(Plan::Replace(replaced))
    }

    /// Plan removing decoded range `start..end`.
    ///
    /// Removing everything always yields [`Plan::Delete`]. Returns `None`
    /// for an invalid range or offsets that are not char boundaries.
    pub fn remove(&self, start: usize, end: usize) -> Option<Plan> {
        let old = self.value.text();
        if start == 0 && end == old.len() {
            return Some(Plan::Delete);
        }
        if start > end || end > old.len() || !old.is_char_boundary(start) || !old.is_char_boundary(end) {
            return None;
        }
        if start == end {
            return Some(Plan::Unchanged);
        }

        let segments = self.value.segments();
        let inside = self
            .value
            .spans_at(start)
            .find(|&idx| self.spans[idx].kind == SpanKind::RawChars && end <= segments[idx].display_end());
        if let Some(idx) = inside {
            let offset = start - segments[idx].display_start;
            if splice_is_safe(&self.spans[idx], offset, end - start, "", segments[idx].in_cdata) {
                return Some(Plan::Splice {
                    span: idx,
                    offset,
                    remove: end - start,
                    insert: String::new(),
                });
            }
        }

        let mut replaced = String::with_capacity(old.len() - (end - start));
        replaced.push_str(&old[..start]);
        replaced.push_str(&old[end..]);
        Some(Plan::Replace(replaced))
    }

    /// Plan splitting the value at decoded offset `at`.
    ///
    /// Returns `None` if `at` is not a char boundary.
    pub fn split(&self, at: usize) -> Option<SplitPlan> {
        let text = self.value.text();
        if at == 0 {
            return Some(SplitPlan::AllRight);
        }
        if at >= text.len() {
            return Some(SplitPlan::AllLeft);
        }
        if !text.is_char_boundary(at) {
            return None;
        }

        let segments = self.value.segments();
        let interior = self
            .value
            .spans_at(at)
            .find(|&idx| segments[idx].display_start < at && at < segments[idx].display_end());
        if let Some(idx) = interior {
            let seg = segments[idx];
            let span = &self.spans[idx];
            let offset = at - seg.display_start;
            if span.kind.is_verbatim() {
                if let Some((head, tail)) = span.split_at(offset) {
                    let mut left = self.spans[..idx].to_vec();
                    left.push(head);
                    let mut right = Vec::with_capacity(self.spans.len() - idx);
                    right.push(tail);
                    right.extend_from_slice(&self.spans[idx + 1..]);
                    return Some(partition(left, right, seg.in_cdata, seg.physical_start + offset));
                }
            }
            // Inside an expansion, or a reference kept literally
            return Some(self.reencode(at));
        }

        match self.choose_cut(at) {
            Some(cut) => {
                let physical_cut = segments
                    .get(cut)
                    .map_or(self.value.physical_len(), |s| s.physical_start);
                Some(partition(
                    self.spans[..cut].to_vec(),
                    self.spans[cut..].to_vec(),
                    self.value.cdata_open_before(cut),
                    physical_cut,
                ))
            }
            None => Some(self.reencode(at)),
        }
    }

    /// Pick the span index to cut at among the valid cut points. Closing
    /// CDATA markers stay on the left, everything else goes right.
    fn choose_cut(&self, at: usize) -> Option<usize> {
        let segments = self.value.segments();
        let mut cuts = self.value.cut_points(at);
        let mut cut = cuts.next()?;
        for next in cuts {
            let closes = self.spans[cut].kind == SpanKind::CdataEnd && segments[cut].display_len == 0;
            if !closes {
                break;
            }
            cut = next;
        }
        Some(cut)
    }

    fn reencode(&self, at: usize) -> SplitPlan {
        let text = self.value.text();
        SplitPlan::Reencode {
            left: text[..at].to_string(),
            right: text[at..].to_string(),
            physical_cut: self
                .value
                .display_to_physical(at)
                .unwrap_or_else(|| self.value.physical_len()),
        }
    }
}

/// Build a span split. An open CDATA section is closed on the left and
/// reopened on the right; enclosing quotes are repeated on both parts.
fn partition(mut left: Vec<Span>, mut right: Vec<Span>, in_cdata: bool, physical_cut: usize) -> SplitPlan {
    if in_cdata {
        left.push(Span::new(SpanKind::CdataEnd, CDATA_END, 0));
        right.insert(0, Span::new(SpanKind::CdataStart, CDATA_START, 0));
    }
    if let (Some(open), Some(close)) = (left.first(), right.last()) {
        if open.kind == SpanKind::Delimiter && close.kind == SpanKind::Delimiter {
            let (open, close) = (open.clone(), close.clone());
            left.push(close);
            right.insert(0, open);
        }
    }
    SplitPlan::Spans {
        left,
        right,
        physical_cut,
    }
}

/// The spliced raw text must still scan as one verbatim run: no `]]>`
/// anywhere, and outside CDATA no `<` or `&`. Lenient scans leave bare
/// `&` in raw text, which the splice could complete into a reference.
fn splice_is_safe(span: &Span, offset: usize, remove: usize, insert: &str, in_cdata: bool) -> bool {
    let raw = &span.raw;
    let mut spliced = String::with_capacity(raw.len() + insert.len());
    spliced.push_str(&raw[..offset]);
    spliced.push_str(insert);
    spliced.push_str(&raw[offset + remove..]);
    !contains_cdata_end(&spliced) && (in_cdata || !contains_markup_start(&spliced))
}
