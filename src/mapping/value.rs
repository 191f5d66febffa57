//! XmlValue - one value region with its decoded view
//!
//! Owns the span sequence of an attribute value or element text together
//! with a revision counter and the cached decoded value. Reads decode
//! lazily; writes go through the [`EditPlanner`] and bump the revision.
//!
//! Physical offsets taken and returned here are relative to the start of
//! the region. `origin` records where the region sits in the document.

use super::cache::ValueCache;
use super::decoder::{DecodedValue, Decoder};
use super::encoder::{AttributeEncoder, Encoder, TextEncoder};
use super::planner::{EditOutcome, EditPlanner, Plan, SplitPlan};
use crate::core::entities::{BuiltinEntities, EntityResolver};
use crate::core::scanner::{scan_attribute_value, scan_text, ScanOptions};
use crate::core::span::{restamp, source_text, Span, SpanKind};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Kind of region a source string holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Element text content
    Text,
    /// Attribute value, optionally quoted
    Attribute,
}

impl ValueKind {
    /// Split `source` into spans for this kind of region
    pub fn scan(self, source: &str, options: &ScanOptions) -> Vec<Span> {
        match self {
            ValueKind::Text => scan_text(source, options),
            ValueKind::Attribute => scan_attribute_value(source, options),
        }
    }
}

#[derive(Clone)]
pub struct XmlValue {
    spans: Vec<Span>,
    origin: usize,
    revision: u64,
    cache: ValueCache,
    resolver: Arc<dyn EntityResolver>,
    encoder: Arc<dyn Encoder>,
}

impl XmlValue {
    /// Wrap a span sequence. Span starts are restamped contiguously from
    /// the first span's start.
    pub fn new(spans: Vec<Span>) -> Self {
        let origin = spans.first().map_or(0, |s| s.start);
        Self::from_parts(
            spans,
            origin,
            Arc::new(BuiltinEntities),
            Arc::new(TextEncoder::default()),
        )
    }

    /// Scan `source` as a region of the given kind
    pub fn parse(kind: ValueKind, source: &str, options: &ScanOptions) -> Self {
        match kind {
            ValueKind::Text => Self::text(source, options),
            ValueKind::Attribute => Self::attribute(source, options),
        }
    }

    /// Scan element text content
    pub fn text(source: &str, options: &ScanOptions) -> Self {
        Self::from_parts(
            scan_text(source, options),
            options.origin,
            Arc::new(BuiltinEntities),
            Arc::new(TextEncoder::default()),
        )
    }

    /// Scan an attribute value, with or without its enclosing quotes.
    /// Re-encoding keeps the quote style found in `source`.
    pub fn attribute(source: &str, options: &ScanOptions) -> Self {
        let encoder = match source.chars().next() {
            Some(q @ ('"' | '\'')) => AttributeEncoder::quoted(q),
            _ => AttributeEncoder::interior(),
        };
        Self::from_parts(
            scan_attribute_value(source, options),
            options.origin,
            Arc::new(BuiltinEntities),
            Arc::new(encoder),
        )
    }

    fn from_parts(
        mut spans: Vec<Span>,
        origin: usize,
        resolver: Arc<dyn EntityResolver>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        restamp(&mut spans, origin);
        XmlValue {
            spans,
            origin,
            revision: 0,
            cache: ValueCache::new(),
            resolver,
            encoder,
        }
    }

    /// Use another entity resolver. Drops the cached value.
    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = resolver;
        self.invalidate();
        self
    }

    /// Use another encoder for whole-value replacement
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    #[inline]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Current source text of the region
    pub fn source(&self) -> String {
        source_text(&self.spans)
    }

    /// Absolute document offset of the region
    #[inline]
    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn physical_len(&self) -> usize {
        self.spans.iter().map(Span::len).sum()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a decoded value for the current revision is cached
    pub fn is_cached(&self) -> bool {
        self.cache.is_valid(self.revision)
    }

    fn current(&mut self) -> &Arc<DecodedValue> {
        let revision = self.revision;
        let spans = &self.spans;
        let resolver = &self.resolver;
        self.cache.get(revision, || {
            trace!(revision, spans = spans.len(), "decoding value");
            Decoder::new(&**resolver).decode(spans, revision)
        })
    }

    /// Shareable snapshot of the decoded value at the current revision
    pub fn snapshot(&mut self) -> Arc<DecodedValue> {
        Arc::clone(self.current())
    }

    /// Decoded text
    pub fn decoded(&mut self) -> &str {
        self.current().text()
    }

    /// Map a physical offset within the region to a decoded offset
    pub fn physical_to_display(&mut self, physical: usize) -> Option<usize> {
        self.current().physical_to_display(physical)
    }

    /// Map a decoded offset to a physical offset within the region
    pub fn display_to_physical(&mut self, display: usize) -> Option<usize> {
        self.current().display_to_physical(display)
    }

    /// Insert `text` at decoded offset `at`.
    ///
    /// Returns `None` if `at` is out of range or not a char boundary.
    pub fn insert(&mut self, text: &str, at: usize) -> Option<EditOutcome> {
        let snapshot = self.snapshot();
        let plan = EditPlanner::new(&self.spans, &snapshot).insert(text, at)?;
        Some(self.apply(plan, &snapshot))
    }

    /// Remove decoded range `start..end`.
    ///
    /// Returns `None` for an invalid range.
    pub fn remove(&mut self, start: usize, end: usize) -> Option<EditOutcome> {
        let snapshot = self.snapshot();
        let plan = EditPlanner::new(&self.spans, &snapshot).remove(start, end)?;
        Some(self.apply(plan, &snapshot))
    }

    /// Split into two values at decoded offset `at`, so that the decoded
    /// texts of the parts concatenate to the original.
    ///
    /// Gives the value back unchanged if `at` is not a char boundary.
    pub fn split(mut self, at: usize) -> Result<(XmlValue, XmlValue), XmlValue> {
        let snapshot = self.snapshot();
        let plan = EditPlanner::new(&self.spans, &snapshot).split(at);
        let Some(plan) = plan else {
            return Err(self);
        };

        let parts = match plan {
            SplitPlan::AllRight => {
                let left = self.derive(self.encoder.encode(""), self.origin);
                self.bump();
                (left, self)
            }
            SplitPlan::AllLeft => {
                let right = self.derive(self.encoder.encode(""), self.origin + snapshot.physical_len());
                self.bump();
                (self, right)
            }
            SplitPlan::Spans {
                left,
                right,
                physical_cut,
            } => (
                self.derive(left, self.origin),
                self.derive(right, self.origin + physical_cut),
            ),
            SplitPlan::Reencode {
                left,
                right,
                physical_cut,
            } => {
                debug!(at, "split inside an expansion, re-encoding both parts");
                (
                    self.derive(self.encoder.encode(&left), self.origin),
                    self.derive(self.encoder.encode(&right), self.origin + physical_cut),
                )
            }
        };
        Ok(parts)
    }

    /// Drop the cached decoded value
    pub fn invalidate(&mut self) {
        self.bump();
        self.cache.invalidate();
    }

    fn bump(&mut self) -> u64 {
        self.revision = self.revision.wrapping_add(1);
        self.revision
    }

    /// New value sharing this one's resolver and encoder
    fn derive(&self, spans: Vec<Span>, origin: usize) -> XmlValue {
        let mut value = Self::from_parts(spans, origin, Arc::clone(&self.resolver), Arc::clone(&self.encoder));
        value.revision = self.revision.wrapping_add(1);
        value
    }

    fn apply(&mut self, plan: Plan, snapshot: &DecodedValue) -> EditOutcome {
        let outcome = plan.outcome();
        match plan {
            Plan::Unchanged => {}
            Plan::Splice {
                span,
                offset,
                remove,
                insert,
            } => {
                let revision = self.bump();
                let raw = &mut self.spans[span].raw;
                raw.replace_range(offset..offset + remove, &insert);
                if raw.is_empty() {
                    // Segment indices shift, decode afresh
                    self.spans.remove(span);
                    restamp(&mut self.spans, self.origin);
                    self.cache.invalidate();
                } else {
                    let start = self.spans[span].start;
                    restamp(&mut self.spans[span..], start);
                    self.cache
                        .install(snapshot.spliced(span, offset, remove, &insert, revision));
                }
                trace!(revision, span, offset, remove, inserted = insert.len(), "span edited in place");
            }
            Plan::Replace(text) => {
                let revision = self.bump();
                self.spans = self.encoder.encode(&text);
                restamp(&mut self.spans, self.origin);
                self.cache.invalidate();
                debug!(revision, len = text.len(), "value re-encoded");
            }
            Plan::Delete => {
                self.bump();
                self.spans.retain(|s| s.kind == SpanKind::Delimiter);
                restamp(&mut self.spans, self.origin);
                self.cache.invalidate();
            }
        }
        outcome
    }
}

impl fmt::Debug for XmlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlValue")
            .field("spans", &self.spans)
            .field("origin", &self.origin)
            .field("revision", &self.revision)
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dtd::EntityTable;
    use crate::mapping::encoder::FnEncoder;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text(source: &str) -> XmlValue {
        XmlValue::text(source, &ScanOptions::default())
    }

    fn counting_encoder() -> (Arc<AtomicUsize>, Arc<dyn Encoder>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let encoder = FnEncoder(move |text: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            TextEncoder::default().encode(text)
        });
        (calls, Arc::new(encoder))
    }

    fn fresh_decode(value: &XmlValue) -> DecodedValue {
        Decoder::new(&BuiltinEntities).decode(value.spans(), value.revision())
    }

    #[test]
    fn test_attribute_reference_mapping() {
        let mut value = XmlValue::attribute("a&amp;b", &ScanOptions::default());
        assert_eq!(value.decoded(), "a&b");
        assert_eq!(value.physical_len(), 7);

        let snapshot = value.snapshot();
        assert_eq!(snapshot.gaps().len(), 1);
        let gap = snapshot.gaps()[0];
        assert_eq!((gap.display_start, gap.physical_start, gap.shift), (1, 1, 4));

        assert_eq!(value.physical_to_display(1), Some(1));
        assert_eq!(value.physical_to_display(5), Some(2));
        assert_eq!(value.display_to_physical(1), Some(1));
        // Offset of "b": the shift after the reference applies
        assert_eq!(value.display_to_physical(2), Some(6));
    }

    #[test]
    fn test_quoted_reference_mapping() {
        let mut value = XmlValue::attribute("\"&amp;b\"", &ScanOptions::default());
        assert_eq!(value.decoded(), "&b");
        assert_eq!(value.snapshot().gaps().len(), 2);
        assert_eq!(value.physical_to_display(0), Some(0));
        assert_eq!(value.physical_to_display(1), Some(0));
        assert_eq!(value.physical_to_display(3), Some(1));
        assert_eq!(value.physical_to_display(6), Some(1));
        assert_eq!(value.display_to_physical(0), Some(0));
        assert_eq!(value.display_to_physical(1), Some(6));

        // Same mapping inside the quotes as without them
        let mut bare = XmlValue::attribute("&amp;b", &ScanOptions::default());
        assert_eq!(bare.physical_to_display(0), Some(0));
    }

    #[test]
    fn test_reference_after_cdata_section() {
        let mut value = text("<![CDATA[a]]>&amp;");
        assert_eq!(value.decoded(), "a&");
        assert_eq!(value.physical_to_display(10), Some(1));
        assert_eq!(value.physical_to_display(13), Some(1));
        assert_eq!(value.physical_to_display(15), Some(2));
        assert_eq!(value.display_to_physical(1), Some(10));
        assert_eq!(value.display_to_physical(2), Some(18));
    }

    #[test]
    fn test_cdata_section_mapping() {
        let mut value = text("<![CDATA[x<y]]>");
        assert_eq!(value.decoded(), "x<y");
        assert_eq!(value.physical_to_display(9), Some(0));
        assert_eq!(value.physical_to_display(0), Some(0));
        assert_eq!(value.display_to_physical(3), Some(12));
    }

    #[test]
    fn test_remove_everything_deletes() {
        for source in ["plain", "a&amp;b", "<![CDATA[x]]>y", ""] {
            let mut value = text(source);
            let len = value.decoded().len();
            assert_eq!(value.remove(0, len), Some(EditOutcome::Deleted), "{source}");
            assert_eq!(value.decoded(), "");
        }

        let mut value = XmlValue::attribute("\"a&amp;b\"", &ScanOptions::default());
        assert_eq!(value.remove(0, 3), Some(EditOutcome::Deleted));
        assert_eq!(value.decoded(), "");
        assert_eq!(value.source(), "\"\"");
    }

    #[test]
    fn test_in_place_insert_skips_encoder() {
        let (calls, encoder) = counting_encoder();
        let mut value = text("hello world").with_encoder(encoder);

        assert_eq!(value.insert("big ", 6), Some(EditOutcome::InPlace));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(value.decoded(), "hello big world");

        assert_eq!(value.insert("<", 0), Some(EditOutcome::Replaced));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(value.decoded(), "<hello big world");
        assert_eq!(value.source(), "&lt;hello big world");
    }

    #[test]
    fn test_cross_boundary_remove_uses_encoder() {
        let (calls, encoder) = counting_encoder();
        let mut value = text("ab&amp;cd").with_encoder(encoder);
        assert_eq!(value.remove(1, 4), Some(EditOutcome::Replaced));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(value.decoded(), "ad");
    }

    #[test]
    fn test_in_place_edit_patches_cache() {
        let mut value = text("ab&amp;cd");
        value.decoded();
        assert_eq!(value.insert("xy", 1), Some(EditOutcome::InPlace));
        assert!(value.is_cached());
        assert_eq!(*value.snapshot(), fresh_decode(&value));
        assert_eq!(value.source(), "axyb&amp;cd");
        assert_eq!(value.display_to_physical(5), Some(9));
        assert_eq!(value.spans()[2].start, 9);
    }

    #[test]
    fn test_edit_next_to_bare_ampersand_keeps_meaning() {
        let mut value = text("x&");
        assert_eq!(value.decoded(), "x&");
        assert_eq!(value.insert("amp;", 2), Some(EditOutcome::Replaced));
        assert_eq!(value.decoded(), "x&amp;");
        let mut rescanned = text(&value.source());
        assert_eq!(rescanned.decoded(), "x&amp;");
    }

    #[test]
    fn test_emptied_span_is_dropped() {
        let mut value = text("ab&amp;");
        assert_eq!(value.remove(0, 2), Some(EditOutcome::InPlace));
        assert!(!value.is_cached());
        assert_eq!(value.spans().len(), 1);
        assert_eq!(value.decoded(), "&");
    }

    #[test]
    fn test_invalid_edits() {
        let mut value = text("é");
        let revision = value.revision();
        assert_eq!(value.insert("x", 1), None);
        assert_eq!(value.insert("x", 5), None);
        assert_eq!(value.remove(1, 2), None);
        assert_eq!(value.insert("", 0), Some(EditOutcome::Unchanged));
        assert_eq!(value.remove(2, 2), Some(EditOutcome::Unchanged));
        assert_eq!(value.revision(), revision);
    }

    #[test]
    fn test_edits_bump_revision() {
        let mut value = text("abc");
        value.insert("x", 1);
        assert_eq!(value.revision(), 1);
        value.remove(0, 1);
        assert_eq!(value.revision(), 2);
        value.invalidate();
        assert_eq!(value.revision(), 3);
        assert!(!value.is_cached());
    }

    #[test]
    fn test_origin_and_restamp() {
        let mut value = XmlValue::text("a&amp;b", &ScanOptions::at(100));
        assert_eq!(value.origin(), 100);
        assert_eq!(value.spans()[1].start, 101);
        assert_eq!(value.physical_to_display(6), Some(2));

        let value = XmlValue::new(vec![
            Span::new(SpanKind::RawChars, "ab", 40),
            Span::new(SpanKind::CharEntityRef, "&lt;", 0),
        ]);
        assert_eq!(value.origin(), 40);
        assert_eq!(value.spans()[1].start, 42);
    }

    #[test]
    fn test_split_at_boundary() {
        let value = XmlValue::attribute("\"ab&amp;cd\"", &ScanOptions::at(10));
        let (mut left, mut right) = value.split(3).unwrap();
        assert_eq!(left.decoded(), "ab&");
        assert_eq!(right.decoded(), "cd");
        assert_eq!(left.source(), "\"ab&amp;\"");
        assert_eq!(right.source(), "\"cd\"");
        assert_eq!(right.origin(), 18);
        assert_eq!(right.spans()[1].start, 19);
    }

    #[test]
    fn test_split_ends() {
        let original = text("abc");
        let revision = original.revision();
        let (mut left, mut right) = original.split(0).unwrap();
        assert_eq!(left.decoded(), "");
        assert_eq!(right.decoded(), "abc");
        assert_eq!(left.revision(), revision + 1);
        assert_eq!(right.revision(), revision + 1);

        let (mut left, mut right) = text("abc").split(7).unwrap();
        assert_eq!(left.decoded(), "abc");
        assert_eq!(right.decoded(), "");
        assert_eq!(right.origin(), 3);
    }

    #[test]
    fn test_split_rejects_mid_char() {
        let mut value = text("é").split(1).unwrap_err();
        assert_eq!(value.decoded(), "é");
    }

    #[test]
    fn test_split_inside_expansion() {
        let mut table = EntityTable::new();
        table.declare_internal("e", "hello");
        let value = text("x&e;y").with_resolver(Arc::new(table));
        let (mut left, mut right) = value.split(3).unwrap();
        assert_eq!(left.decoded(), "xhe");
        assert_eq!(right.decoded(), "lloy");
        assert_eq!(right.origin(), 4);
    }

    #[test]
    fn test_oversized_expansion_kept_literally() {
        let mut table = EntityTable::new().with_expansion_limit(8);
        table.declare_internal("a", "abcd");
        table.declare_internal("b", "&a;&a;&a;");
        let mut value = text("x&b;&a;").with_resolver(Arc::new(table));
        assert_eq!(value.decoded(), "x&b;abcd");
        assert_eq!(value.physical_to_display(4), Some(4));
    }

    #[test]
    fn test_parse_by_kind() {
        let mut value = XmlValue::parse(ValueKind::Attribute, "'it&apos;s'", &ScanOptions::default());
        assert_eq!(value.decoded(), "it's");
        value.insert("'", 0);
        assert_eq!(value.source(), "'&apos;it&apos;s'");

        let mut value = XmlValue::parse(ValueKind::Text, "'it&apos;s'", &ScanOptions::default());
        assert_eq!(value.decoded(), "'it's'");
    }

    #[test]
    fn test_resolver_swap_invalidates() {
        let mut value = text("&e;");
        assert_eq!(value.decoded(), "&e;");
        let mut table = EntityTable::new();
        table.declare_internal("e", "E");
        let mut value = value.with_resolver(Arc::new(table));
        assert_eq!(value.decoded(), "E");
    }

    fn arb_source() -> impl Strategy<Value = String> {
        let piece = prop::sample::select(vec![
            "a",
            "bc",
            " ",
            "é",
            "&amp;",
            "&lt;",
            "&#233;",
            "&#x1F600;",
            "<![CDATA[x<y]]>",
            "<![CDATA[]]>",
            "]]>",
        ]);
        prop::collection::vec(piece, 0..10).prop_map(|pieces| pieces.concat())
    }

    /// Attribute values: quoted with either quote, or bare interiors
    fn arb_attribute() -> impl Strategy<Value = String> {
        let piece = prop::sample::select(vec![
            "a", "bc", " ", "é", ">", "]]>", "&amp;", "&lt;", "&#233;", "&quot;", "&apos;",
        ]);
        let quote = prop::sample::select(vec!["\"", "'", ""]);
        (quote, prop::collection::vec(piece, 0..10))
            .prop_map(|(quote, pieces)| format!("{quote}{}{quote}", pieces.concat()))
    }

    fn arb_value() -> impl Strategy<Value = (ValueKind, String)> {
        prop_oneof![
            arb_source().prop_map(|source| (ValueKind::Text, source)),
            arb_attribute().prop_map(|source| (ValueKind::Attribute, source)),
        ]
    }

    fn parse((kind, source): &(ValueKind, String)) -> XmlValue {
        XmlValue::parse(*kind, source, &ScanOptions::default())
    }

    /// Whether the source of an edited value scans back unambiguously. A
    /// bare attribute interior starting with a quote would read as quoted.
    fn rescannable((kind, source): &(ValueKind, String)) -> bool {
        *kind == ValueKind::Text || source.starts_with(['"', '\''])
    }

    fn arb_insert() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["z", "<", "&", "hi ", "]]", ">", "é", "\"", "'", "amp;"])
    }

    fn boundaries(text: &str) -> Vec<usize> {
        text.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_offsets_stay_in_bounds(input in arb_value()) {
            let snapshot = parse(&input).snapshot();
            let (len, physical_len) = (snapshot.len(), snapshot.physical_len());

            let mut previous = 0;
            for p in 0..=physical_len {
                let d = snapshot.physical_to_display(p).unwrap();
                prop_assert!(d <= len);
                prop_assert!(d >= previous, "not monotonic at {}", p);
                previous = d;
            }
            for d in 0..=len {
                prop_assert!(snapshot.display_to_physical(d).unwrap() <= physical_len);
            }
            prop_assert_eq!(snapshot.physical_to_display(physical_len + 1), None);
            prop_assert_eq!(snapshot.display_to_physical(len + 1), None);
        }

        #[test]
        fn prop_gap_starts_map_exactly(input in arb_value()) {
            let snapshot = parse(&input).snapshot();
            for gap in snapshot.gaps() {
                prop_assert_eq!(snapshot.display_to_physical(gap.display_start), Some(gap.physical_start));
                prop_assert_eq!(snapshot.physical_to_display(gap.physical_start), Some(gap.display_start));
            }
        }

        #[test]
        fn prop_span_starts_map_exactly(input in arb_value()) {
            let snapshot = parse(&input).snapshot();
            for seg in snapshot.segments() {
                prop_assert_eq!(snapshot.physical_to_display(seg.physical_start), Some(seg.display_start));
                prop_assert!(snapshot.display_to_physical(seg.display_start).unwrap() <= seg.physical_start);
            }
        }

        #[test]
        fn prop_insert_law(input in arb_value(), insert in arb_insert(), at in any::<prop::sample::Index>()) {
            let mut value = parse(&input);
            let old = value.decoded().to_string();
            let k = *at.get(&boundaries(&old));

            let outcome = value.insert(insert, k).unwrap();
            let expected = format!("{}{}{}", &old[..k], insert, &old[k..]);
            prop_assert_eq!(value.decoded(), expected.as_str());
            if outcome == EditOutcome::InPlace {
                let snapshot = value.snapshot();
                prop_assert_eq!(&*snapshot, &fresh_decode(&value));
            }
            if rescannable(&input) {
                let mut rescanned = parse(&(input.0, value.source()));
                prop_assert_eq!(rescanned.decoded(), expected.as_str());
            }
        }

        #[test]
        fn prop_remove_law(input in arb_value(), a in any::<prop::sample::Index>(), b in any::<prop::sample::Index>()) {
            let mut value = parse(&input);
            let old = value.decoded().to_string();
            let bounds = boundaries(&old);
            let (x, y) = (*a.get(&bounds), *b.get(&bounds));
            let (start, end) = (x.min(y), x.max(y));

            let outcome = value.remove(start, end).unwrap();
            let expected = format!("{}{}", &old[..start], &old[end..]);
            prop_assert_eq!(value.decoded(), expected.as_str());
            if outcome == EditOutcome::InPlace && value.is_cached() {
                let snapshot = value.snapshot();
                prop_assert_eq!(&*snapshot, &fresh_decode(&value));
            }
            if rescannable(&input) {
                let mut rescanned = parse(&(input.0, value.source()));
                prop_assert_eq!(rescanned.decoded(), expected.as_str());
            }
        }

        #[test]
        fn prop_split_law(input in arb_value(), at in any::<prop::sample::Index>()) {
            let mut value = parse(&input);
            let old = value.decoded().to_string();
            let k = *at.get(&boundaries(&old));

            let (mut left, mut right) = value.split(k).unwrap();
            let joined = format!("{}{}", left.decoded(), right.decoded());
            prop_assert_eq!(joined, old);
        }
    }
}
