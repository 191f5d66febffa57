//! XML Entity Decoding
//!
//! Handles decoding of single references as they appear in span text:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Also holds the escaping rules the encoders and the edit planner share.

use memchr::{memchr, memchr2, memchr3};

/// Resolves general entity names to their replacement text.
///
/// Returning `None` makes the decoder pass the raw reference through
/// literally.
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Resolver that knows only the five predefined XML entities
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEntities;

impl EntityResolver for BuiltinEntities {
    fn resolve(&self, name: &str) -> Option<String> {
        predefined(name).map(String::from)
    }
}

/// Look up one of the predefined XML entities
#[inline]
pub fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Strip `&` and `;` from a reference, returning the name part.
///
/// `&#65;` yields `#65`.
#[inline]
pub fn reference_name(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('&')?.strip_suffix(';')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Decode a character reference (`&#NNN;`, `&#xHH;`, or a predefined
/// entity) to its single character.
pub fn decode_char_ref(raw: &str) -> Option<char> {
    let name = reference_name(raw)?;
    match name.strip_prefix('#') {
        Some(numeric) => decode_numeric(numeric),
        None => predefined(name),
    }
}

/// Decode the digits of a numeric character reference
fn decode_numeric(entity: &str) -> Option<char> {
    let (digits, radix) = match entity.strip_prefix(['x', 'X']) {
        // Hexadecimal: &#xHHHH;
        Some(hex) => (hex, 16),
        // Decimal: &#DDDD;
        None => (entity, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let codepoint = u32::from_str_radix(digits, radix).ok()?;

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Check whether `text` may be spliced into character data without
/// escaping.
///
/// Outside CDATA, markup-significant characters are refused, including
/// both quote styles since the enclosing quote is not known at this
/// level. Inside CDATA only the section terminator is refused.
pub fn is_verbatim_safe(text: &str, in_cdata: bool) -> bool {
    if in_cdata {
        return !contains_cdata_end(text);
    }
    let bytes = text.as_bytes();
    memchr3(b'<', b'&', b'"', bytes).is_none() && memchr(b'\'', bytes).is_none()
}

/// Check for a `<` or `&`, which start markup or a reference outside
/// CDATA
#[inline]
pub fn contains_markup_start(text: &str) -> bool {
    memchr2(b'<', b'&', text.as_bytes()).is_some()
}

/// Check for the `]]>` sequence
#[inline]
pub fn contains_cdata_end(text: &str) -> bool {
    memchr::memmem::find(text.as_bytes(), b"]]>").is_some()
}

/// Escape a character for character data, or `None` if it stands as is.
///
/// `quote` selects which quote character must be escaped, for attribute
/// values.
#[inline]
pub fn escape_char(c: char, quote: Option<char>) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '&' => Some("&amp;"),
        '>' if quote.is_none() => Some("&gt;"),
        '"' if quote == Some('"') => Some("&quot;"),
        '\'' if quote == Some('\'') => Some("&apos;"),
        _ => None,
    }
}
