//! Contiguous per-type vertex id ranges.

use hetero_types::{StoreError, TypeRange};
use std::collections::HashSet;
use std::ops::Range;

/// Partition of `[0, N)` into one half-open range per vertex type, sorted by
/// range start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOffsetTable {
    names: Vec<String>,
    starts: Vec<i64>,
    ends: Vec<i64>,
}

impl TypeOffsetTable {
    /// Builds the table from ranges reported by a renumbering pass.
    ///
    /// Ranges must tile `[0, N)` without gaps or overlaps once sorted by start.
    pub fn from_ranges(mut ranges: Vec<TypeRange>) -> Result<Self, StoreError> {
        ranges.sort_by_key(|r| (r.start, r.end));

        let mut seen = HashSet::new();
        let mut expected_start = 0;
        for r in &ranges {
            if r.end < r.start {
                return Err(StoreError::Construction(format!(
                    "vertex type {} has inverted range [{}, {})",
                    r.type_name, r.start, r.end
                )));
            }
            if r.start != expected_start {
                return Err(StoreError::Construction(format!(
                    "vertex type {} starts at {}, expected {}",
                    r.type_name, r.start, expected_start
                )));
            }
            if !seen.insert(r.type_name.as_str()) {
                return Err(StoreError::Construction(format!(
                    "vertex type {} has more than one range",
                    r.type_name
                )));
            }
            expected_start = r.end;
        }

        Ok(Self {
            names: ranges.iter().map(|r| r.type_name.clone()).collect(),
            starts: ranges.iter().map(|r| r.start).collect(),
            ends: ranges.iter().map(|r| r.end).collect(),
        })
    }

    /// Builds the table from per-type vertex counts, ordering types by name.
    pub fn from_counts<S: Into<String>>(counts: impl IntoIterator<Item = (S, usize)>) -> Self {
        let mut counts: Vec<(String, usize)> =
            counts.into_iter().map(|(n, c)| (n.into(), c)).collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0));

        let mut table = Self::default();
        let mut next = 0i64;
        for (name, count) in counts {
            table.names.push(name);
            table.starts.push(next);
            next += count as i64;
            table.ends.push(next);
        }
        table
    }

    /// Position of the type owning `global_id`.
    pub fn type_index_of(&self, global_id: i64) -> Result<usize, StoreError> {
        if global_id < 0 {
            return Err(StoreError::Lookup(format!(
                "vertex id {} is outside every type range",
                global_id
            )));
        }
        // First range whose end is past the id; empty ranges are skipped.
        let idx = self.ends.partition_point(|&end| end <= global_id);
        if idx == self.ends.len() {
            return Err(StoreError::Lookup(format!(
                "vertex id {} is outside every type range (total {})",
                global_id,
                self.total()
            )));
        }
        Ok(idx)
    }

    pub fn type_of(&self, global_id: i64) -> Result<&str, StoreError> {
        let idx = self.type_index_of(global_id)?;
        Ok(&self.names[idx])
    }

    pub fn range_of(&self, vertex_type: &str) -> Result<Range<i64>, StoreError> {
        self.names
            .iter()
            .position(|n| n == vertex_type)
            .map(|i| self.starts[i]..self.ends[i])
            .ok_or_else(|| StoreError::Lookup(format!("unknown vertex type: {}", vertex_type)))
    }

    /// Every global id of `vertex_type`, ascending.
    pub fn ids_of(&self, vertex_type: &str) -> Result<Vec<i64>, StoreError> {
        Ok(self.range_of(vertex_type)?.collect())
    }

    /// Exclusive range ends, ascending; the haystack for type lookups.
    pub fn ends(&self) -> &[i64] {
        &self.ends
    }

    /// Type names in range order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Total number of vertices covered.
    pub fn total(&self) -> i64 {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Range<i64>)> {
        self.names
            .iter()
            .zip(self.starts.iter().zip(self.ends.iter()))
            .map(|(n, (&s, &e))| (n.as_str(), s..e))
    }
}
