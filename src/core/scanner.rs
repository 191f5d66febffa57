//! SIMD-accelerated value scanning using memchr
//!
//! Splits the source of one value region (element text or an attribute
//! value) into typed spans. Uses memchr crate for fast byte searching with
//! SIMD acceleration:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)

use super::entities::predefined;
use super::span::{Span, SpanKind};
use memchr::{memchr2, memchr3, memmem};

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

/// Options controlling how a region is split into spans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Absolute document offset of the first byte of the region
    pub origin: usize,
    /// Emit pure-whitespace runs as `Whitespace` spans
    pub split_whitespace: bool,
    /// Emit a bare `&` or `<` as an `Error` span instead of character data
    pub strict: bool,
}

impl ScanOptions {
    /// Options with the given origin
    pub fn at(origin: usize) -> Self {
        ScanOptions {
            origin,
            ..Self::default()
        }
    }
}

/// Scanner for delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Find next text break: '&', '<' or ']' (for stray CDATA end detection)
    #[inline]
    pub fn find_text_break(&self) -> Option<usize> {
        memchr3(b'&', b'<', b']', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find next '&' or '<' (attribute value boundaries)
    #[inline]
    pub fn find_attribute_break(&self) -> Option<usize> {
        memchr2(b'&', b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find the next occurrence of a byte sequence
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Length of the reference starting at the current '&', including the
    /// terminating ';'. Returns `None` for a bare ampersand.
    pub fn reference_len(&self) -> Option<usize> {
        let rest = &self.input[self.pos..];
        if rest.first() != Some(&b'&') {
            return None;
        }
        let body_start = if rest.get(1) == Some(&b'#') { 2 } else { 1 };
        let mut end = body_start;
        if body_start == 2 {
            while end < rest.len() && rest[end].is_ascii_alphanumeric() {
                end += 1;
            }
        } else {
            if end >= rest.len() || !is_name_start_char(rest[end]) {
                return None;
            }
            end += 1;
            while end < rest.len() && is_name_char(rest[end]) {
                end += 1;
            }
        }
        if end > body_start && rest.get(end) == Some(&b';') {
            Some(end + 1)
        } else {
            None
        }
    }
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Accumulates spans while a region is scanned
struct SpanBuilder<'a> {
    input: &'a str,
    options: &'a ScanOptions,
    spans: Vec<Span>,
    /// Start of the pending character-data run
    run_start: usize,
}

impl<'a> SpanBuilder<'a> {
    fn new(input: &'a str, options: &'a ScanOptions) -> Self {
        SpanBuilder {
            input,
            options,
            spans: Vec::new(),
            run_start: 0,
        }
    }

    /// Emit the pending run of character data up to `until`
    fn flush(&mut self, until: usize) {
        if until > self.run_start {
            let run_start = self.run_start;
            if self.options.split_whitespace {
                self.push_split_whitespace(run_start, until);
            } else {
                self.push(SpanKind::RawChars, run_start, until);
            }
        }
        self.run_start = until;
    }

    fn push_split_whitespace(&mut self, start: usize, end: usize) {
        let bytes = self.input.as_bytes();
        let mut pos = start;
        while pos < end {
            let ws = is_whitespace(bytes[pos]);
            let run = pos;
            while pos < end && is_whitespace(bytes[pos]) == ws {
                pos += 1;
            }
            let kind = if ws { SpanKind::Whitespace } else { SpanKind::RawChars };
            self.push(kind, run, pos);
        }
    }

    /// Flush pending data and emit one token span covering `start..end`
    fn token(&mut self, kind: SpanKind, start: usize, end: usize) {
        self.flush(start);
        self.push(kind, start, end);
        self.run_start = end;
    }

    fn push(&mut self, kind: SpanKind, start: usize, end: usize) {
        self.spans.push(Span::new(
            kind,
            &self.input[start..end],
            self.options.origin + start,
        ));
    }

    /// Handle the '&' at the scanner position. Returns the position to
    /// continue from.
    fn reference(&mut self, scanner: &Scanner<'_>) -> usize {
        let pos = scanner.position();
        match scanner.reference_len() {
            Some(len) => {
                let raw = &self.input[pos..pos + len];
                let kind = if raw.as_bytes()[1] == b'#' || predefined(&raw[1..len - 1]).is_some() {
                    SpanKind::CharEntityRef
                } else {
                    SpanKind::EntityRef
                };
                self.token(kind, pos, pos + len);
                pos + len
            }
            None => self.bare(pos),
        }
    }

    /// A bare markup character: an error span in strict mode, data otherwise
    fn bare(&mut self, pos: usize) -> usize {
        if self.options.strict {
            self.token(SpanKind::Error, pos, pos + 1);
        }
        pos + 1
    }

    fn finish(mut self) -> Vec<Span> {
        self.flush(self.input.len());
        self.spans
    }
}

/// Split element text content into spans.
///
/// Recognises CDATA sections, references, and stray `]]>` sequences
/// (emitted as `CdataEnd` so the decoder can degrade them).
pub fn scan_text(input: &str, options: &ScanOptions) -> Vec<Span> {
    let mut builder = SpanBuilder::new(input, options);
    let mut scanner = Scanner::new(input.as_bytes());

    while !scanner.is_eof() {
        let Some(pos) = scanner.find_text_break() else {
            break;
        };
        scanner.set_position(pos);

        let next = if scanner.starts_with(CDATA_START.as_bytes()) {
            let content_start = pos + CDATA_START.len();
            builder.token(SpanKind::CdataStart, pos, content_start);
            scanner.set_position(content_start);
            match scanner.find_sequence(CDATA_END.as_bytes()) {
                Some(end) => {
                    if end > content_start {
                        builder.push(SpanKind::RawChars, content_start, end);
                    }
                    builder.run_start = end;
                    builder.token(SpanKind::CdataEnd, end, end + CDATA_END.len());
                    end + CDATA_END.len()
                }
                None => {
                    // Unterminated section runs to the end of the region
                    if input.len() > content_start {
                        builder.push(SpanKind::RawChars, content_start, input.len());
                    }
                    builder.run_start = input.len();
                    input.len()
                }
            }
        } else if scanner.starts_with(CDATA_END.as_bytes()) {
            builder.token(SpanKind::CdataEnd, pos, pos + CDATA_END.len());
            pos + CDATA_END.len()
        } else {
            match scanner.peek_at(0) {
                Some(b'&') => builder.reference(&scanner),
                Some(b'<') => builder.bare(pos),
                _ => pos + 1,
            }
        };
        scanner.set_position(next);
    }

    builder.finish()
}

/// Split an attribute value into spans.
///
/// Enclosing quotes, when present, become `Delimiter` spans. CDATA is not
/// recognised inside attribute values.
pub fn scan_attribute_value(input: &str, options: &ScanOptions) -> Vec<Span> {
    let mut builder = SpanBuilder::new(input, options);
    let bytes = input.as_bytes();

    let quote = match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => Some(q),
        _ => None,
    };
    let mut end = input.len();
    if let Some(q) = quote {
        builder.token(SpanKind::Delimiter, 0, 1);
        if bytes.len() >= 2 && bytes[bytes.len() - 1] == q {
            end -= 1;
        }
    }

    let mut scanner = Scanner::new(&bytes[..end]);
    scanner.set_position(builder.run_start);
    while !scanner.is_eof() {
        let Some(pos) = scanner.find_attribute_break() else {
            break;
        };
        scanner.set_position(pos);
        let next = match scanner.peek_at(0) {
            Some(b'&') => builder.reference(&scanner),
            _ => builder.bare(pos),
        };
        scanner.set_position(next);
    }

    builder.flush(end);
    if end < input.len() {
        builder.token(SpanKind::Delimiter, end, input.len());
    }
    builder.spans
}
