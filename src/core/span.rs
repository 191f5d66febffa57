//! Span - a classified run of source text
//!
//! A value region (attribute value or element text) arrives as an ordered
//! sequence of spans. Each span owns its raw text and remembers where it
//! started in the original document.

/// Lexical class of a span, deciding how it decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Plain character data, decoded verbatim
    RawChars,
    /// Whitespace run, decoded verbatim
    Whitespace,
    /// `&#NNN;`, `&#xHH;` or a predefined entity, decoded to one char
    CharEntityRef,
    /// `&name;`, resolved through an entity resolver
    EntityRef,
    /// `<![CDATA[`
    CdataStart,
    /// `]]>`
    CdataEnd,
    /// Quote characters and other markup with no decoded content
    Delimiter,
    /// Malformed input, decoded verbatim
    Error,
}

impl SpanKind {
    /// Kinds whose decoded text is always identical to their raw text
    #[inline]
    pub const fn is_verbatim(self) -> bool {
        matches!(self, SpanKind::RawChars | SpanKind::Whitespace | SpanKind::Error)
    }

    /// Kinds that never contribute decoded characters
    #[inline]
    pub const fn is_markup(self) -> bool {
        matches!(self, SpanKind::CdataStart | SpanKind::CdataEnd | SpanKind::Delimiter)
    }

    /// Kinds that are references (`&...;`)
    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(self, SpanKind::CharEntityRef | SpanKind::EntityRef)
    }
}

/// A span of source text.
///
/// The physical length is always `raw.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    /// Source text exactly as it appears in the document
    pub raw: String,
    /// Byte offset of the span in the original document
    pub start: usize,
}

impl Span {
    /// Create a new span
    #[inline]
    pub fn new(kind: SpanKind, raw: impl Into<String>, start: usize) -> Self {
        Span {
            kind,
            raw: raw.into(),
            start,
        }
    }

    /// Physical length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Check if this span is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Get the end offset (exclusive)
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    /// Split a verbatim span at a byte offset into its raw text.
    ///
    /// Returns `None` if `at` is not strictly inside the span or not a
    /// char boundary.
    pub fn split_at(&self, at: usize) -> Option<(Span, Span)> {
        if at == 0 || at >= self.raw.len() || !self.raw.is_char_boundary(at) {
            return None;
        }
        let (head, tail) = self.raw.split_at(at);
        Some((
            Span::new(self.kind, head, self.start),
            Span::new(self.kind, tail, self.start + at),
        ))
    }
}

/// Restamp span starts so the sequence is contiguous from `origin`.
pub fn restamp(spans: &mut [Span], origin: usize) {
    let mut pos = origin;
    for span in spans {
        span.start = pos;
        pos += span.raw.len();
    }
}

/// Concatenate the raw text of a span sequence.
pub fn source_text(spans: &[Span]) -> String {
    let mut out = String::with_capacity(spans.iter().map(Span::len).sum());
    for span in spans {
        out.push_str(&span.raw);
    }
    out
}
