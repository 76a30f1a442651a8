//! Thread-safe bounded LRU cache mapping query source text to its compiled
//! expression.
//!
//! A bounded-with-eviction shape, with a locking strategy tuned for a
//! read-heavy cache hit rate: a single `RwLock` over an insertion-ordered
//! map, where the common
//! "already most-recently-used" read hits the read-lock fast path and only
//! an actual promotion (or insert, or eviction) takes the write lock. A
//! `parking_lot::RwLock` is used rather than `std::sync::RwLock` for the
//! same reason `jq-value` reaches for `parking_lot` elsewhere in this
//! workspace: no poisoning to thread through every call site.
//!
//! The map itself is an [`indexmap::IndexMap`], whose iteration order is
//! insertion order — the least-recently-used entry is always the first
//! one, and "promote to most-recently-used" is "move to the end" (`shift_remove`
//! followed by re-`insert`, which is what keeps the *other* entries in
//! their relative order — an `indexmap::IndexMap::swap_remove` would instead
//! swap the last element into the removed slot, silently reordering an
//! unrelated entry).

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::sync::Arc;

use indexmap::IndexMap;
use jq_ast::CompiledExpr;
use jq_error::ParseError;
use parking_lot::RwLock;

/// Used whenever a caller configures a capacity of `0` (or doesn't
/// configure one at all).
pub const DEFAULT_CAPACITY: usize = 256;

/// A bounded LRU cache from query source text to its compiled form.
///
/// Safe to share across threads: every operation takes the lock it needs
/// and releases it before returning. [`CompiledCache::get`] never blocks a
/// concurrent reader that also finds its key already most-recently-used —
/// only an actual promotion, insert, or eviction acquires the write lock.
pub struct CompiledCache {
    capacity: usize,
    entries: RwLock<IndexMap<Arc<str>, Arc<CompiledExpr>>>,
}

impl CompiledCache {
    /// `capacity <= 0` is replaced by [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        CompiledCache { capacity, entries: RwLock::new(IndexMap::new()) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Look up `key`, promoting it to most-recently-used if found.
    ///
    /// Fast path: a read lock that finds the entry already at the
    /// most-recently-used end (the last position) returns directly,
    /// without ever acquiring the write lock. Otherwise the write lock is
    /// taken to move the entry to the end; the existence check is redone
    /// under the write lock in case a concurrent `set`/`invalidate`
    /// evicted the key between the two lock acquisitions.
    pub fn get(&self, key: &str) -> Option<Arc<CompiledExpr>> {
        {
            let entries = self.entries.read();
            match entries.get_full(key) {
                Some((idx, _, value)) if idx + 1 == entries.len() => return Some(Arc::clone(value)),
                None => return None,
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write();
        let (key, value) = entries.shift_remove_entry(key)?;
        entries.insert(key, Arc::clone(&value));
        Some(value)
    }

    /// Insert or update `key`, promoting it to most-recently-used. Evicts
    /// the current least-recently-used entry first if inserting a new key
    /// would exceed capacity.
    pub fn set(&self, key: impl Into<Arc<str>>, value: Arc<CompiledExpr>) {
        let key = key.into();
        let mut entries = self.entries.write();
        entries.shift_remove(&key);
        if entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::trace!(capacity = self.capacity, evicted = %evicted, "cache eviction");
            }
        }
        entries.insert(key, value);
    }

    /// Return the cached entry for `key`, compiling and inserting it via
    /// `compile_fn` on a miss. `compile_fn` runs outside any lock — two
    /// threads racing on the same key may both compile, but both still
    /// observe a consistent cache afterward, and whichever finishes first
    /// simply gets overwritten by the second. A failing compile is never
    /// cached, so the key stays free for the next `get_or_compile` to
    /// retry.
    pub fn get_or_compile(
        &self,
        key: &str,
        compile_fn: impl FnOnce() -> Result<CompiledExpr, ParseError>,
    ) -> Result<Arc<CompiledExpr>, ParseError> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let compiled = Arc::new(compile_fn()?);
        self.set(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.write().shift_remove(key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jq_ast::{Arena, NodeKind};

    fn fake_compiled(text: &str) -> CompiledExpr {
        let mut arena = Arena::new();
        let root = arena.alloc(jq_ast::Node::new(NodeKind::NumberLiteral(0.0), 0));
        CompiledExpr::new(text.to_string(), arena, root)
    }

    #[test]
    fn zero_capacity_is_replaced_by_default() {
        let cache = CompiledCache::new(0);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let cache = CompiledCache::new(2);
        cache.set("a", Arc::new(fake_compiled("a")));
        cache.set("b", Arc::new(fake_compiled("b")));
        cache.set("c", Arc::new(fake_compiled("c")));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn getting_an_entry_protects_it_from_the_next_eviction() {
        let cache = CompiledCache::new(2);
        cache.set("a", Arc::new(fake_compiled("a")));
        cache.set("b", Arc::new(fake_compiled("b")));
        // Touch "a" so "b" becomes the least-recently-used entry.
        assert!(cache.get("a").is_some());
        cache.set("c", Arc::new(fake_compiled("c")));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn get_or_compile_invokes_compiler_once_per_key_across_serial_calls() {
        let cache = CompiledCache::new(8);
        let calls = std::sync::atomic::AtomicUsize::new(0);
        for _ in 0..5 {
            let result = cache.get_or_compile("q", || {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(fake_compiled("q"))
            });
            assert!(result.is_ok());
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_compiles_are_not_cached() {
        let cache = CompiledCache::new(8);
        let err = jq_error::ParseError::new(
            jq_diagnostics_codes::DiagnosticCode::UnexpectedEof,
            "boom",
            0,
        );
        let result = cache.get_or_compile("bad", || Err(err.clone()));
        assert!(result.is_err());
        assert_eq!(cache.len(), 0);
        // Retrying the same key should invoke the compiler again, not
        // silently return the old failure.
        let result = cache.get_or_compile("bad", || Ok(fake_compiled("bad")));
        assert!(result.is_ok());
    }

    #[test]
    fn invalidate_and_clear_remove_entries() {
        let cache = CompiledCache::new(8);
        cache.set("a", Arc::new(fake_compiled("a")));
        cache.set("b", Arc::new(fake_compiled("b")));
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn concurrent_get_or_compile_on_one_key_converges_on_one_value() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache = Arc::new(CompiledCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let calls = Arc::clone(&calls);
                    scope.spawn(move || {
                        cache.get_or_compile("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(fake_compiled("shared"))
                        })
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().expect("thread should not panic").is_ok());
            }
        });
        assert_eq!(cache.len(), 1);
        // No deadlock, and at most one compile per racing thread — far
        // fewer than the no-caching worst case of 16.
        assert!(calls.load(Ordering::SeqCst) <= 16);
    }
}
