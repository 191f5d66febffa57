//! Re-encoding policies
//!
//! When an edit cannot be applied inside a single span, the whole decoded
//! value is rebuilt and handed to an [`Encoder`], which serializes it back
//! into a fresh span sequence. The encoder decides the escaping strategy
//! and whether CDATA is used.

use crate::core::entities::{contains_cdata_end, escape_char};
use crate::core::span::{Span, SpanKind};

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

/// Serializes a plain string into spans that decode back to it
pub trait Encoder: Send + Sync {
    fn encode(&self, text: &str) -> Vec<Span>;
}

/// Adapts a plain function or closure into an [`Encoder`]
#[derive(Debug, Clone, Copy)]
pub struct FnEncoder<F>(pub F);

impl<F> Encoder for FnEncoder<F>
where
    F: Fn(&str) -> Vec<Span> + Send + Sync,
{
    fn encode(&self, text: &str) -> Vec<Span> {
        (self.0)(text)
    }
}

/// When element text is wrapped in a CDATA section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CdataPolicy {
    /// Always escape with references
    #[default]
    Never,
    /// Use CDATA when escaping would cost more than the section markers
    WhenShorter,
    /// Always use CDATA
    Always,
}

/// Encoder for element text content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextEncoder {
    pub cdata: CdataPolicy,
}

impl TextEncoder {
    pub fn new(cdata: CdataPolicy) -> Self {
        TextEncoder { cdata }
    }

    fn use_cdata(&self, text: &str) -> bool {
        match self.cdata {
            CdataPolicy::Never => false,
            CdataPolicy::Always => true,
            CdataPolicy::WhenShorter => {
                !contains_cdata_end(text)
                    && escape_overhead(text, None) > CDATA_START.len() + CDATA_END.len()
            }
        }
    }
}

impl Encoder for TextEncoder {
    fn encode(&self, text: &str) -> Vec<Span> {
        let mut sink = SpanSink::default();
        if self.use_cdata(text) {
            sink.cdata(text);
        } else {
            sink.escaped(text, None);
        }
        sink.spans
    }
}

/// Encoder for attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEncoder {
    /// Enclosing quote; `None` encodes the value interior only, escaping
    /// double quotes
    pub quote: Option<char>,
}

impl AttributeEncoder {
    pub fn quoted(quote: char) -> Self {
        AttributeEncoder { quote: Some(quote) }
    }

    pub fn interior() -> Self {
        AttributeEncoder { quote: None }
    }
}

impl Default for AttributeEncoder {
    fn default() -> Self {
        Self::quoted('"')
    }
}

impl Encoder for AttributeEncoder {
    fn encode(&self, text: &str) -> Vec<Span> {
        let mut sink = SpanSink::default();
        let mut buf = [0u8; 4];
        let quote: Option<&str> = match self.quote {
            Some(q) => Some(&*q.encode_utf8(&mut buf)),
            None => None,
        };
        if let Some(q) = quote {
            sink.push(SpanKind::Delimiter, q);
        }
        // '>' needs no escaping in attributes
        sink.escaped(text, Some(self.quote.unwrap_or('"')));
        if let Some(q) = quote {
            sink.push(SpanKind::Delimiter, q);
        }
        sink.spans
    }
}

/// Extra bytes escaping `text` would add
fn escape_overhead(text: &str, quote: Option<char>) -> usize {
    text.chars()
        .filter_map(|c| escape_char(c, quote).map(|e| e.len() - c.len_utf8()))
        .sum()
}

/// Collects spans with contiguous offsets
#[derive(Default)]
struct SpanSink {
    spans: Vec<Span>,
    pos: usize,
}

impl SpanSink {
    fn push(&mut self, kind: SpanKind, raw: &str) {
        self.spans.push(Span::new(kind, raw, self.pos));
        self.pos += raw.len();
    }

    /// Plain runs as `RawChars`, markup characters as references
    fn escaped(&mut self, text: &str, quote: Option<char>) {
        let mut run_start = 0;
        for (i, c) in text.char_indices() {
            if let Some(escape) = escape_char(c, quote) {
                if i > run_start {
                    self.push(SpanKind::RawChars, &text[run_start..i]);
                }
                self.push(SpanKind::CharEntityRef, escape);
                run_start = i + c.len_utf8();
            }
        }
        if text.len() > run_start {
            self.push(SpanKind::RawChars, &text[run_start..]);
        }
    }

    /// Wrap in CDATA sections, splitting any `]]>` across two sections
    fn cdata(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut rest = text;
        loop {
            let (section, next) = match rest.find(CDATA_END) {
                // Keep "]]" in this section and ">" in the next
                Some(at) => (&rest[..at + 2], Some(&rest[at + 2..])),
                None => (rest, None),
            };
            self.push(SpanKind::CdataStart, CDATA_START);
            if !section.is_empty() {
                self.push(SpanKind::RawChars, section);
            }
            self.push(SpanKind::CdataEnd, CDATA_END);
            match next {
                Some(next) => rest = next,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entities::BuiltinEntities;
    use crate::core::span::source_text;
    use crate::mapping::decoder::Decoder;

    fn decoded(spans: &[Span]) -> String {
        Decoder::new(&BuiltinEntities).decode(spans, 0).text().to_string()
    }

    #[test]
    fn test_text_escaping() {
        let spans = TextEncoder::default().encode("a<b & c>d");
        assert_eq!(source_text(&spans), "a&lt;b &amp; c&gt;d");
        assert_eq!(decoded(&spans), "a<b & c>d");
        assert_eq!(spans[0].kind, SpanKind::RawChars);
        assert_eq!(spans[1].kind, SpanKind::CharEntityRef);
    }

    #[test]
    fn test_plain_text_single_span() {
        let spans = TextEncoder::default().encode("hello world");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::RawChars);
    }

    #[test]
    fn test_empty_text() {
        assert!(TextEncoder::default().encode("").is_empty());
        assert!(TextEncoder::new(CdataPolicy::Always).encode("").is_empty());
    }

    #[test]
    fn test_cdata_always() {
        let spans = TextEncoder::new(CdataPolicy::Always).encode("x<y");
        assert_eq!(source_text(&spans), "<![CDATA[x<y]]>");
        assert_eq!(decoded(&spans), "x<y");
    }

    #[test]
    fn test_cdata_splits_terminator() {
        let spans = TextEncoder::new(CdataPolicy::Always).encode("a]]>b");
        assert_eq!(source_text(&spans), "<![CDATA[a]]]]><![CDATA[>b]]>");
        assert_eq!(decoded(&spans), "a]]>b");
    }

    #[test]
    fn test_cdata_when_shorter() {
        let encoder = TextEncoder::new(CdataPolicy::WhenShorter);
        assert_eq!(source_text(&encoder.encode("a<b")), "a&lt;b");
        let heavy = "<<<<<<<<";
        assert_eq!(source_text(&encoder.encode(heavy)), "<![CDATA[<<<<<<<<]]>");
        assert_eq!(decoded(&encoder.encode("<<<<<<<<]]>")), "<<<<<<<<]]>");
    }

    #[test]
    fn test_attribute_quoted() {
        let spans = AttributeEncoder::quoted('"').encode("say \"hi\" & 'bye' > x");
        assert_eq!(source_text(&spans), "\"say &quot;hi&quot; &amp; 'bye' > x\"");
        assert_eq!(decoded(&spans), "say \"hi\" & 'bye' > x");
        assert_eq!(spans[0].kind, SpanKind::Delimiter);
    }

    #[test]
    fn test_attribute_single_quoted() {
        let spans = AttributeEncoder::quoted('\'').encode("it's");
        assert_eq!(source_text(&spans), "'it&apos;s'");
    }

    #[test]
    fn test_attribute_interior() {
        let spans = AttributeEncoder::interior().encode("a&b");
        assert_eq!(source_text(&spans), "a&amp;b");
    }

    #[test]
    fn test_fn_encoder() {
        let encoder = FnEncoder(|text: &str| vec![Span::new(SpanKind::RawChars, text.to_uppercase(), 0)]);
        assert_eq!(source_text(&encoder.encode("abc")), "ABC");
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let spans = TextEncoder::default().encode("a<b");
        let starts: Vec<_> = spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 1, 5]);
    }
}
