//! Value Decoder
//!
//! Turns the span sequence of one value region into its decoded text, the
//! gap table that maps decoded offsets back to the source, and a segment
//! per span recording where that span landed in both coordinate spaces.

use super::offsets::{Gap, OffsetIndex};
use crate::core::entities::{decode_char_ref, reference_name, EntityResolver};
use crate::core::span::{Span, SpanKind};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Placement of one span in both coordinate spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub display_start: usize,
    pub physical_start: usize,
    pub display_len: usize,
    pub physical_len: usize,
    /// Whether a CDATA section is open when the span starts
    pub in_cdata: bool,
}

impl Segment {
    #[inline]
    pub fn display_end(&self) -> usize {
        self.display_start + self.display_len
    }

    #[inline]
    pub fn contains_display(&self, offset: usize) -> bool {
        self.display_start <= offset && offset <= self.display_end()
    }
}

/// Decoded text of a value with its offset mapping.
///
/// Immutable once built: edits produce a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedValue {
    text: String,
    index: OffsetIndex,
    segments: Vec<Segment>,
    /// Whether a CDATA section is still open after the last span
    cdata_open: bool,
    revision: u64,
}

impl DecodedValue {
    /// Decoded text
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Take the decoded text, dropping the mapping
    pub fn into_text(self) -> String {
        self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Revision of the source this value was computed from
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn index(&self) -> &OffsetIndex {
        &self.index
    }

    #[inline]
    pub fn gaps(&self) -> &[Gap] {
        self.index.gaps()
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn physical_len(&self) -> usize {
        self.index.physical_len()
    }

    #[inline]
    pub fn cdata_open(&self) -> bool {
        self.cdata_open
    }

    /// Whether a CDATA section is open just before span `idx`
    pub fn cdata_open_before(&self, idx: usize) -> bool {
        self.segments
            .get(idx)
            .map_or(self.cdata_open, |s| s.in_cdata)
    }

    /// Map a physical offset (relative to the region start) to a decoded
    /// offset. `None` if out of range.
    #[inline]
    pub fn physical_to_display(&self, physical: usize) -> Option<usize> {
        self.index.physical_to_display(physical)
    }

    /// Map a decoded offset to a physical offset (relative to the region
    /// start). `None` if out of range.
    #[inline]
    pub fn display_to_physical(&self, display: usize) -> Option<usize> {
        self.index.display_to_physical(display)
    }

    /// Indices of the spans whose decoded range contains `offset`,
    /// boundaries included.
    pub fn spans_at(&self, offset: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.segments.partition_point(|s| s.display_end() < offset);
        self.segments[first..]
            .iter()
            .take_while(move |s| s.display_start <= offset)
            .enumerate()
            .filter(move |(_, s)| s.contains_display(offset))
            .map(move |(i, _)| first + i)
    }

    /// Span indices `i` where the spans before `i` decode to exactly
    /// `text[..offset]`.
    pub fn cut_points(&self, offset: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.segments.partition_point(|s| s.display_start < offset);
        let last = self.segments.partition_point(|s| s.display_start <= offset);
        let end_ok = self.text.len() == offset;
        (first..=last).filter(move |&i| {
            if i < self.segments.len() {
                self.segments[i].display_start == offset
                    && (i == 0 || self.segments[i - 1].display_end() == offset)
            } else {
                end_ok
            }
        })
    }

    /// Value after an in-place edit of verbatim span `span`: `removed`
    /// bytes at `offset` within the span replaced by `inserted`.
    pub(crate) fn spliced(
        &self,
        span: usize,
        offset: usize,
        removed: usize,
        inserted: &str,
        revision: u64,
    ) -> DecodedValue {
        let seg = self.segments[span];
        let display = seg.display_start + offset;
        let physical = seg.physical_start + offset;
        let delta = inserted.len() as isize - removed as isize;

        let mut text = self.text.clone();
        text.replace_range(display..display + removed, inserted);

        let mut segments = self.segments.clone();
        segments[span].display_len = seg.display_len.saturating_add_signed(delta);
        segments[span].physical_len = seg.physical_len.saturating_add_signed(delta);
        for later in &mut segments[span + 1..] {
            later.display_start = later.display_start.saturating_add_signed(delta);
            later.physical_start = later.physical_start.saturating_add_signed(delta);
        }

        DecodedValue {
            text,
            index: self.index.spliced(physical, removed, inserted.len()),
            segments,
            cdata_open: self.cdata_open,
            revision,
        }
    }
}

/// Decodes span sequences against an entity resolver
pub struct Decoder<'r> {
    resolver: &'r dyn EntityResolver,
}

impl<'r> Decoder<'r> {
    pub fn new(resolver: &'r dyn EntityResolver) -> Self {
        Decoder { resolver }
    }

    /// Decode a span sequence. Physical offsets in the result are relative
    /// to the first span.
    pub fn decode(&self, spans: &[Span], revision: u64) -> DecodedValue {
        let mut text = String::with_capacity(spans.iter().map(Span::len).sum());
        let mut index = OffsetIndex::new();
        let mut segments = Vec::with_capacity(spans.len());
        let mut in_cdata = false;

        for span in spans {
            let display_start = text.len();
            let physical_start = index.physical_len();
            let was_in_cdata = in_cdata;

            let decoded = self.decode_span(span, &mut in_cdata);
            text.push_str(&decoded);

            if decoded.len() == span.len() {
                index.advance(span.len());
            } else {
                index.diverge(decoded.len(), span.len());
            }
            segments.push(Segment {
                display_start,
                physical_start,
                display_len: decoded.len(),
                physical_len: span.len(),
                in_cdata: was_in_cdata,
            });
        }

        DecodedValue {
            text,
            index,
            segments,
            cdata_open: in_cdata,
            revision,
        }
    }

    /// Decode a single span, tracking CDATA state
    fn decode_span<'s>(&self, span: &'s Span, in_cdata: &mut bool) -> Cow<'s, str> {
        let raw = span.raw.as_str();
        match span.kind {
            SpanKind::RawChars | SpanKind::Whitespace | SpanKind::Error => Cow::Borrowed(raw),
            SpanKind::Delimiter => Cow::Borrowed(""),
            SpanKind::CdataStart if !*in_cdata => {
                *in_cdata = true;
                Cow::Borrowed("")
            }
            SpanKind::CdataEnd if *in_cdata => {
                *in_cdata = false;
                Cow::Borrowed("")
            }
            SpanKind::CdataStart | SpanKind::CdataEnd => {
                debug!(raw = %raw, start = span.start, "unbalanced CDATA marker treated as data");
                Cow::Borrowed(raw)
            }
            // References are not recognised inside CDATA
            SpanKind::CharEntityRef | SpanKind::EntityRef if *in_cdata => Cow::Borrowed(raw),
            SpanKind::CharEntityRef => match decode_char_ref(raw) {
                Some(c) => Cow::Owned(c.to_string()),
                None => {
                    warn!(raw = %raw, start = span.start, "undecodable character reference kept literally");
                    Cow::Borrowed(raw)
                }
            },
            SpanKind::EntityRef => {
                match reference_name(raw).and_then(|name| self.resolver.resolve(name)) {
                    Some(text) => Cow::Owned(text),
                    None => {
                        warn!(raw = %raw, start = span.start, "unresolved entity reference kept literally");
                        Cow::Borrowed(raw)
                    }
                }
            }
        }
    }
}
