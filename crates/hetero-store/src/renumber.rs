//! Per-batch renumbering of sampler output into type-local ids.

use crate::store::HeteroStore;
use hetero_types::{
    EdgeGroups, NoiIndex, NumericBackend, PropertyGraph, PygEdgeType, SampleRenumber,
    SampleResult, SearchSide, StoreError, Tensor,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

impl<G, B> HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    /// Row positions of `sample` grouped by edge type name, each group in
    /// sample order.
    fn edge_rows_by_type(
        &self,
        sample: &SampleResult,
    ) -> Result<BTreeMap<String, Vec<usize>>, StoreError> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        if let Some((only, _)) = self.edge_registry.single() {
            groups.insert(only.to_string(), (0..sample.len()).collect());
            return Ok(groups);
        }

        let numerals: Vec<i32> = sample
            .indices
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names = self.graph.edge_types_from_numerals(&numerals)?;
        let name_of: HashMap<i32, String> = numerals.into_iter().zip(names).collect();

        for (row, numeral) in sample.indices.iter().enumerate() {
            let name = name_of.get(numeral).ok_or_else(|| {
                StoreError::Internal(format!("edge type numeral {} was not decoded", numeral))
            })?;
            groups.entry(name.clone()).or_default().push(row);
        }
        Ok(groups)
    }

    /// Batch-local ids of `global_ids` within the `vertex_type` bucket.
    fn localize(
        &self,
        noi_index: &NoiIndex,
        vertex_type: &str,
        global_ids: &[i64],
    ) -> Result<Tensor, StoreError> {
        let table = noi_index.get(vertex_type).ok_or_else(|| {
            StoreError::Consistency(format!("no nodes of interest of type {}", vertex_type))
        })?;
        let positions = self
            .backend
            .searchsorted(table, global_ids, SearchSide::Left);

        let mut local = Vec::with_capacity(positions.len());
        for (&global, &pos) in global_ids.iter().zip(positions.iter()) {
            // An insertion point is not a match; the id must be in the bucket.
            if table.get(pos) != Some(&global) {
                return Err(StoreError::Consistency(format!(
                    "vertex {} is missing from the {} nodes of interest",
                    global, vertex_type
                )));
            }
            local.push(pos as i64);
        }
        let local = self
            .backend
            .cast(Tensor::from_i64(local), self.config.vertex_dtype)?;
        Ok(self.backend.to_device(local))
    }
}

impl<G, B> SampleRenumber for HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    fn group_nodes_of_interest(&self, global_ids: &[i64]) -> Result<NoiIndex, StoreError> {
        let mut ids = global_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut noi_index = NoiIndex::new();
        let (Some(&lowest), Some(&highest)) = (ids.first(), ids.last()) else {
            return Ok(noi_index);
        };
        if lowest < 0 || highest >= self.offsets.total() {
            let bad = if lowest < 0 { lowest } else { highest };
            return Err(StoreError::Lookup(format!(
                "vertex id {} is outside every type range (total {})",
                bad,
                self.offsets.total()
            )));
        }

        if self.offsets.len() == 1 {
            noi_index.insert(self.offsets.names()[0].clone(), ids);
            return Ok(noi_index);
        }

        // Sorted ids give non-decreasing type positions; split into runs.
        let labels = self
            .backend
            .searchsorted(self.offsets.ends(), &ids, SearchSide::Right);
        let names = self.offsets.names();
        let mut run_start = 0;
        for i in 1..=ids.len() {
            if i == ids.len() || labels[i] != labels[run_start] {
                let name = names.get(labels[run_start]).ok_or_else(|| {
                    StoreError::Lookup(format!(
                        "vertex id {} is outside every type range",
                        ids[run_start]
                    ))
                })?;
                noi_index.insert(name.clone(), ids[run_start..i].to_vec());
                run_start = i;
            }
        }
        Ok(noi_index)
    }

    fn renumber_sampled_edges(
        &self,
        sample: &SampleResult,
        noi_index: &NoiIndex,
    ) -> Result<(EdgeGroups, EdgeGroups), StoreError> {
        // With one edge type the numerals are never read and may be absent.
        let aligned = if self.edge_registry.single().is_some() {
            sample.sources.len() == sample.destinations.len()
        } else {
            sample.is_aligned()
        };
        if !aligned {
            return Err(StoreError::ShapeMismatch(format!(
                "sample has {} sources, {} destinations, {} edge types",
                sample.sources.len(),
                sample.destinations.len(),
                sample.indices.len()
            )));
        }

        let mut row_dict = EdgeGroups::new();
        let mut col_dict = EdgeGroups::new();
        for (edge_type, rows) in self.edge_rows_by_type(sample)? {
            let pyg: PygEdgeType = self.edge_registry.pyg_edge_type_of(&edge_type)?.clone();
            let sources: Vec<i64> = rows.iter().map(|&r| sample.sources[r]).collect();
            let destinations: Vec<i64> = rows.iter().map(|&r| sample.destinations[r]).collect();

            let src = self.localize(noi_index, &pyg.src_type, &sources)?;
            let dst = self.localize(noi_index, &pyg.dst_type, &destinations)?;
            row_dict.insert(pyg.clone(), src);
            col_dict.insert(pyg, dst);
        }
        Ok((row_dict, col_dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetero_graph::InMemoryPropertyGraph;
    use hetero_tensor::CpuBackend;
    use hetero_types::{DType, EdgeRecord, RenumberPolicy, StoreConfig, VertexRecord};

    /// blue 0-1, green 2-3, red 4-5, with one edge type per endpoint pair.
    fn store() -> HeteroStore<InMemoryPropertyGraph, CpuBackend> {
        let g = InMemoryPropertyGraph::new();
        for (t, ids) in [("blue", [0, 1]), ("green", [2, 3]), ("red", [4, 5])] {
            let records: Vec<VertexRecord> = ids.iter().map(|&i| VertexRecord::new(i)).collect();
            g.add_vertices(t, &records).unwrap();
        }
        g.add_edges(Some("etype1"), &[EdgeRecord::new(0, 2), EdgeRecord::new(1, 3)])
            .unwrap();
        g.add_edges(Some("etype2"), &[EdgeRecord::new(4, 5)]).unwrap();
        g.add_edges(Some("etype3"), &[EdgeRecord::new(5, 1)]).unwrap();
        let config = StoreConfig::default().with_renumber(RenumberPolicy::Keep);
        HeteroStore::new(g, CpuBackend::new(), config).unwrap()
    }

    #[test]
    fn groups_sorted_ids_by_type() {
        let store = store();
        let noi = store.group_nodes_of_interest(&[5, 0, 3, 2, 0]).unwrap();
        assert_eq!(noi.get("blue"), Some(&[0][..]));
        assert_eq!(noi.get("green"), Some(&[2, 3][..]));
        assert_eq!(noi.get("red"), Some(&[5][..]));
        assert!(store.group_nodes_of_interest(&[]).unwrap().is_empty());
        assert!(matches!(
            store.group_nodes_of_interest(&[6]),
            Err(StoreError::Lookup(_))
        ));
    }

    #[test]
    fn renumbers_per_edge_type_in_sample_order() {
        let store = store();
        let graph = store.graph();
        let e1 = graph.edge_type_numeral("etype1").unwrap();
        let e2 = graph.edge_type_numeral("etype2").unwrap();
        let e3 = graph.edge_type_numeral("etype3").unwrap();

        let sample = SampleResult::new(vec![0, 5, 5, 1], vec![3, 4, 1, 2], vec![e1, e2, e3, e1]);
        let noi = store.group_nodes_of_interest(&sample.nodes_of_interest()).unwrap();
        let (rows, cols) = store.renumber_sampled_edges(&sample, &noi).unwrap();

        let t1 = PygEdgeType::new("blue", "etype1", "green");
        assert_eq!(rows[&t1].to_i64_vec(), vec![0, 1]);
        assert_eq!(cols[&t1].to_i64_vec(), vec![1, 0]);
        let t2 = PygEdgeType::new("red", "etype2", "red");
        assert_eq!(rows[&t2].to_i64_vec(), vec![1]);
        assert_eq!(cols[&t2].to_i64_vec(), vec![0]);
        let t3 = PygEdgeType::new("red", "etype3", "blue");
        assert_eq!(rows[&t3].to_i64_vec(), vec![1]);
        assert_eq!(cols[&t3].to_i64_vec(), vec![1]);
        assert_eq!(rows[&t1].dtype(), DType::Int64);
    }

    #[test]
    fn missing_endpoint_is_consistency_error() {
        let store = store();
        let e1 = store.graph().edge_type_numeral("etype1").unwrap();
        let sample = SampleResult::new(vec![1], vec![3], vec![e1]);
        let mut noi = NoiIndex::new();
        noi.insert("blue", vec![0]);
        noi.insert("green", vec![3]);
        let err = store.renumber_sampled_edges(&sample, &noi).unwrap_err();
        assert!(matches!(err, StoreError::Consistency(ref m) if m.contains("vertex 1")));

        let mut noi = NoiIndex::new();
        noi.insert("blue", vec![1]);
        let err = store.renumber_sampled_edges(&sample, &noi).unwrap_err();
        assert!(matches!(err, StoreError::Consistency(ref m) if m.contains("green")));
    }

    #[test]
    fn misaligned_sample_is_rejected() {
        let store = store();
        let sample = SampleResult::new(vec![0, 1], vec![2], vec![0, 0]);
        let err = store
            .renumber_sampled_edges(&sample, &NoiIndex::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch(_)));
    }

    #[test]
    fn single_edge_type_needs_no_numerals() {
        let g = InMemoryPropertyGraph::new();
        let nodes: Vec<VertexRecord> = (0..3).map(VertexRecord::new).collect();
        g.add_vertices("node", &nodes).unwrap();
        g.add_edges(Some("link"), &[EdgeRecord::new(0, 1), EdgeRecord::new(1, 2)])
            .unwrap();
        let config = StoreConfig::default().with_renumber(RenumberPolicy::Keep);
        let store = HeteroStore::new(g, CpuBackend::new(), config).unwrap();

        let sample = SampleResult::new(vec![2, 0], vec![1, 2], vec![]);
        let noi = store.group_nodes_of_interest(&sample.nodes_of_interest()).unwrap();
        let (rows, cols) = store.renumber_sampled_edges(&sample, &noi).unwrap();
        let link = PygEdgeType::new("node", "link", "node");
        assert_eq!(rows[&link].to_i64_vec(), vec![2, 0]);
        assert_eq!(cols[&link].to_i64_vec(), vec![1, 2]);

        let ragged = SampleResult::new(vec![0, 1], vec![1], vec![]);
        assert!(matches!(
            store.renumber_sampled_edges(&ragged, &noi),
            Err(StoreError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn unknown_numeral_propagates() {
        let store = store();
        let sample = SampleResult::new(vec![0], vec![2], vec![9]);
        let err = store
            .renumber_sampled_edges(&sample, &NoiIndex::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::Graph(_)));
    }
}
