//! Parallel batch decode
//!
//! Uses Rayon to decode many independent value sources at once.

use crate::core::entities::EntityResolver;
use crate::core::scanner::ScanOptions;
use crate::mapping::{Decoder, ValueKind};
use rayon::prelude::*;

/// Decode multiple sources of the same kind in parallel.
///
/// Results are in input order. Every source is scanned with the same
/// options, so span starts are relative to `options.origin`.
pub fn decode_parallel<S>(
    sources: &[S],
    kind: ValueKind,
    options: &ScanOptions,
    resolver: &dyn EntityResolver,
) -> Vec<String>
where
    S: AsRef<str> + Sync,
{
    sources
        .par_iter()
        .map(|source| {
            let spans = kind.scan(source.as_ref(), options);
            Decoder::new(resolver).decode(&spans, 0).into_text()
        })
        .collect()
}
