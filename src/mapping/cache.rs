//! Revision-stamped cache for a decoded value
//!
//! Holds at most one [`DecodedValue`] snapshot, tagged with the revision
//! of the source it was computed from. The owner bumps its revision on
//! every mutation and calls [`ValueCache::invalidate`] for any edit to its
//! source, including edits that cannot affect the value. There are two
//! states: uncomputed and valid.

use super::decoder::DecodedValue;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    slot: Option<Arc<DecodedValue>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value if it was computed at `revision`, otherwise
    /// compute, store and return a fresh one.
    pub fn get(
        &mut self,
        revision: u64,
        compute: impl FnOnce() -> DecodedValue,
    ) -> &Arc<DecodedValue> {
        if !self.is_valid(revision) {
            self.slot = None;
        }
        self.slot.get_or_insert_with(|| {
            let value = compute();
            debug_assert_eq!(value.revision(), revision, "decoded value stamped with wrong revision");
            Arc::new(value)
        })
    }

    /// The cached value, if valid at `revision`
    pub fn peek(&self, revision: u64) -> Option<&Arc<DecodedValue>> {
        self.slot.as_ref().filter(|v| v.revision() == revision)
    }

    pub fn is_valid(&self, revision: u64) -> bool {
        self.peek(revision).is_some()
    }

    /// Store a snapshot built elsewhere, replacing any cached one
    pub fn install(&mut self, value: DecodedValue) {
        self.slot = Some(Arc::new(value));
    }

    /// Drop the cached value unconditionally
    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entities::BuiltinEntities;
    use crate::core::span::{Span, SpanKind};
    use crate::mapping::decoder::Decoder;

    fn decode(revision: u64) -> DecodedValue {
        let spans = vec![Span::new(SpanKind::RawChars, "abc", 0)];
        Decoder::new(&BuiltinEntities).decode(&spans, revision)
    }

    #[test]
    fn test_computes_once_per_revision() {
        let mut cache = ValueCache::new();
        let mut calls = 0;
        cache.get(1, || {
            calls += 1;
            decode(1)
        });
        cache.get(1, || {
            calls += 1;
            decode(1)
        });
        assert_eq!(calls, 1);
        assert!(cache.is_valid(1));
    }

    #[test]
    fn test_stale_revision_recomputes() {
        let mut cache = ValueCache::new();
        cache.get(1, || decode(1));
        assert!(!cache.is_valid(2));
        assert!(cache.peek(2).is_none());

        let value = cache.get(2, || decode(2));
        assert_eq!(value.revision(), 2);
    }

    #[test]
    fn test_invalidate_drops_value() {
        let mut cache = ValueCache::new();
        cache.get(3, || decode(3));
        cache.invalidate();
        assert!(!cache.is_valid(3));
    }

    #[test]
    fn test_install_snapshot() {
        let mut cache = ValueCache::new();
        cache.install(decode(5));
        assert!(cache.is_valid(5));
        assert_eq!(cache.peek(5).unwrap().text(), "abc");
    }

    #[test]
    fn test_snapshots_outlive_invalidation() {
        let mut cache = ValueCache::new();
        let snapshot = Arc::clone(cache.get(1, || decode(1)));
        cache.invalidate();
        assert_eq!(snapshot.text(), "abc");
    }
}
