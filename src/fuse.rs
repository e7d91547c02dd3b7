//! Fusion of vector and lexical result sets into one candidate pool.
//!
//! When duplicates are dropped, a passage surfaced by both indexes
//! appears once and its provenance (which retrieval path found it) is
//! discarded — an intentional information loss. Dedup is stable: first
//! occurrence wins, vector results before lexical results, so the pool
//! order is deterministic rather than hash-iteration-defined.

use std::collections::HashSet;

/// Merge two retrieval result sets.
///
/// `keep_duplicates = false` (default): set union by exact text equality,
/// first-seen order preserved. `true`: plain concatenation, both orders
/// and duplicates intact.
pub fn merge(
    vector_results: Vec<String>,
    lexical_results: Vec<String>,
    keep_duplicates: bool,
) -> Vec<String> {
    if keep_duplicates {
        let mut pool = vector_results;
        pool.extend(lexical_results);
        return pool;
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut pool = Vec::new();
    for text in vector_results.into_iter().chain(lexical_results) {
        if seen.insert(text.clone()) {
            pool.push(text);
        }
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedup_produces_set_union() {
        let pool = merge(owned(&["a", "b", "c"]), owned(&["b", "c", "d"]), false);
        assert_eq!(pool, owned(&["a", "b", "c", "d"]));
    }

    #[test]
    fn keep_duplicates_concatenates() {
        let pool = merge(owned(&["a", "b", "c"]), owned(&["b", "c", "d"]), true);
        assert_eq!(pool, owned(&["a", "b", "c", "b", "c", "d"]));
    }

    #[test]
    fn dedup_discards_provenance() {
        // "b" came from both indexes; after the merge nothing records
        // which path surfaced it.
        let pool = merge(owned(&["b"]), owned(&["b"]), false);
        assert_eq!(pool, owned(&["b"]));
    }

    #[test]
    fn dedup_order_is_first_seen_deterministic() {
        let a = merge(owned(&["x", "y"]), owned(&["y", "z"]), false);
        let b = merge(owned(&["x", "y"]), owned(&["y", "z"]), false);
        assert_eq!(a, b);
        assert_eq!(a, owned(&["x", "y", "z"]));
    }

    #[test]
    fn empty_inputs() {
        assert!(merge(Vec::new(), Vec::new(), false).is_empty());
        assert_eq!(merge(Vec::new(), owned(&["a"]), false), owned(&["a"]));
        assert_eq!(merge(owned(&["a"]), Vec::new(), true), owned(&["a"]));
    }
}
