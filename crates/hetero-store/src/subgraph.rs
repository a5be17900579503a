//! Memoized edge-type-restricted subgraphs.

use hetero_types::{StoreError, StructuralGraph};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Sorted, deduplicated set of edge type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubgraphKey(Box<[String]>);

impl SubgraphKey {
    pub fn new<S: AsRef<str>>(edge_types: &[S]) -> Self {
        let mut names: Vec<String> = edge_types.iter().map(|s| s.as_ref().to_string()).collect();
        names.sort();
        names.dedup();
        Self(names.into_boxed_slice())
    }

    pub fn edge_types(&self) -> &[String] {
        &self.0
    }
}

/// Subgraphs extracted so far, keyed by edge type set. Entries are never
/// evicted.
#[derive(Debug, Default)]
pub struct SubgraphCache {
    entries: Mutex<HashMap<SubgraphKey, Arc<StructuralGraph>>>,
}

impl SubgraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached subgraph for `key`, running `extract` on a miss.
    ///
    /// The lock is held while extracting, so concurrent misses on the same
    /// key extract once.
    pub fn get_or_extract<F>(
        &self,
        key: SubgraphKey,
        extract: F,
    ) -> Result<Arc<StructuralGraph>, StoreError>
    where
        F: FnOnce(&[String]) -> Result<StructuralGraph, StoreError>,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Internal(format!("failed to acquire lock: {}", e)))?;
        if let Some(sg) = entries.get(&key) {
            tracing::debug!(edge_types = ?key.edge_types(), "subgraph cache hit");
            return Ok(Arc::clone(sg));
        }
        tracing::debug!(edge_types = ?key.edge_types(), "subgraph cache miss");
        let sg = Arc::new(extract(key.edge_types())?);
        entries.insert(key, Arc::clone(&sg));
        Ok(sg)
    }

    pub fn contains(&self, key: &SubgraphKey) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn key_ignores_order_and_duplicates() {
        assert_eq!(
            SubgraphKey::new(&["b", "a", "b"]),
            SubgraphKey::new(&["a", "b"])
        );
    }

    #[test]
    fn extracts_once_per_key() {
        let cache = SubgraphCache::new();
        let calls = AtomicUsize::new(0);
        let extract = |types: &[String]| -> Result<StructuralGraph, StoreError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(StructuralGraph {
                vertex_map: vec![types.len() as i64],
                ..Default::default()
            })
        };
        let a = cache.get_or_extract(SubgraphKey::new(&["x", "y"]), extract).unwrap();
        let b = cache.get_or_extract(SubgraphKey::new(&["y", "x"]), extract).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_extraction_is_not_cached() {
        let cache = SubgraphCache::new();
        let key = SubgraphKey::new(&["x"]);
        let err = cache
            .get_or_extract(key.clone(), |_| Err(StoreError::Lookup("x".to_string())))
            .unwrap_err();
        assert!(matches!(err, StoreError::Lookup(_)));
        assert!(!cache.contains(&key));
    }

    #[test]
    fn concurrent_misses_extract_once() {
        let cache = Arc::new(SubgraphCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_extract(SubgraphKey::new(&["e"]), |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(StructuralGraph::default())
                        })
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
