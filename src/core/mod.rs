//! Core value lexing primitives
//!
//! - Span: classified run of source text
//! - Scanner: SIMD-accelerated span splitting using memchr
//! - Entities: single reference decoding and escaping rules
//! - DTD: entity declaration store used as an entity resolver

pub mod dtd;
pub mod entities;
pub mod scanner;
pub mod span;
