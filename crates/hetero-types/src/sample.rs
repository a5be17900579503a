//! Sampling output and the per-batch renumbering products.

use crate::{PygEdgeType, Tensor};
use std::collections::BTreeMap;

/// Output of one sampling step: parallel arrays, one entry per sampled edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleResult {
    pub sources: Vec<i64>,
    pub destinations: Vec<i64>,
    /// Edge type numeral of each sampled edge.
    pub indices: Vec<i32>,
}

impl SampleResult {
    pub fn new(sources: Vec<i64>, destinations: Vec<i64>, indices: Vec<i32>) -> Self {
        Self {
            sources,
            destinations,
            indices,
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// True when the three arrays have the same length.
    pub fn is_aligned(&self) -> bool {
        self.sources.len() == self.destinations.len() && self.sources.len() == self.indices.len()
    }

    /// Every endpoint of the sample, sorted and deduplicated.
    pub fn nodes_of_interest(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .sources
            .iter()
            .chain(self.destinations.iter())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Global vertex ids of one batch grouped by vertex type.
///
/// Each group is sorted ascending; a vertex's position in its group is its
/// batch-local id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoiIndex {
    groups: BTreeMap<String, Vec<i64>>,
}

impl NoiIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a group; `ids` must already be sorted ascending.
    pub fn insert(&mut self, vertex_type: impl Into<String>, ids: Vec<i64>) {
        debug_assert!(ids.windows(2).all(|w| w[0] <= w[1]));
        self.groups.insert(vertex_type.into(), ids);
    }

    pub fn get(&self, vertex_type: &str) -> Option<&[i64]> {
        self.groups.get(vertex_type).map(Vec::as_slice)
    }

    pub fn contains_type(&self, vertex_type: &str) -> bool {
        self.groups.contains_key(vertex_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[i64])> {
        self.groups.iter().map(|(t, ids)| (t.as_str(), ids.as_slice()))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of vertex types present.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn num_vertices(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Batch-local id of `global_id` within `vertex_type`.
    pub fn local_id(&self, vertex_type: &str, global_id: i64) -> Option<usize> {
        self.groups.get(vertex_type)?.binary_search(&global_id).ok()
    }

    /// Global id at `local_id` within `vertex_type`.
    pub fn global_id(&self, vertex_type: &str, local_id: usize) -> Option<i64> {
        self.groups.get(vertex_type)?.get(local_id).copied()
    }

    /// Union of all groups, sorted.
    pub fn all_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.groups.values().flatten().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<i64>> {
        self.groups
    }
}

/// Batch-local ids keyed by canonical edge type (`row_dict` / `col_dict`).
pub type EdgeGroups = BTreeMap<PygEdgeType, Tensor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_global_ids_are_inverse() {
        let mut noi = NoiIndex::new();
        noi.insert("blue", vec![3, 4]);
        noi.insert("red", vec![1]);
        assert_eq!(noi.local_id("blue", 4), Some(1));
        assert_eq!(noi.global_id("blue", 1), Some(4));
        assert_eq!(noi.local_id("blue", 1), None);
        assert_eq!(noi.all_ids(), vec![1, 3, 4]);
        assert_eq!(noi.num_vertices(), 3);
    }

    #[test]
    fn nodes_of_interest_is_sorted_union() {
        let s = SampleResult::new(vec![5, 2], vec![2, 9], vec![0, 0]);
        assert!(s.is_aligned());
        assert_eq!(s.nodes_of_interest(), vec![2, 5, 9]);
    }
}
