//! Edge index accessor: the graph-store half of [`HeteroStore`].

use crate::store::HeteroStore;
use hetero_types::{
    EdgeAttr, EdgeIndex, EdgeLayout, GraphStore, NumericBackend, PropertyGraph, StoreError, Tensor,
};

impl<G, B> HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    /// Source and destination ids of `edge_type`, in storage order.
    fn fetch_edge_index(&self, edge_type: &str) -> Result<(Tensor, Tensor), StoreError> {
        let types = match self.edge_registry.single() {
            // One edge type: skip the type filter.
            Some((only, _)) if only == edge_type => None,
            Some(_) => {
                return Err(StoreError::Lookup(format!(
                    "edge type {} is not present in the graph",
                    edge_type
                )))
            }
            None => {
                self.edge_registry.descriptor_of(edge_type)?;
                Some(vec![edge_type.to_string()])
            }
        };

        let src_col = self.graph.src_col_name().to_string();
        let dst_col = self.graph.dst_col_name().to_string();
        let columns = [src_col.clone(), dst_col.clone()];
        let deferred = self
            .graph
            .get_edge_data(None, types.as_deref(), Some(&columns[..]))?;
        if !deferred.is_ready() {
            tracing::debug!(edge_type = edge_type, "forcing edge index");
        }
        let mut frame = deferred.force()?;

        let dtype = self.config.vertex_dtype;
        let src = self.backend.from_column(frame.take_column(&src_col)?)?;
        let dst = self.backend.from_column(frame.take_column(&dst_col)?)?;
        let src = self.backend.to_device(self.backend.cast(src, dtype)?);
        let dst = self.backend.to_device(self.backend.cast(dst, dtype)?);
        Ok((src, dst))
    }
}

impl<G, B> GraphStore for HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    fn get_edge_index(&self, attr: EdgeAttr) -> Result<EdgeIndex, StoreError> {
        if attr.layout != EdgeLayout::Coo {
            return Err(StoreError::UnsupportedLayout(attr.layout));
        }

        let (src, dst) = self.fetch_edge_index(attr.edge_type.edge_type_name())?;
        if src.len() != dst.len() {
            return Err(StoreError::ShapeMismatch(format!(
                "edge type {}: {} sources but {} destinations",
                attr.edge_type,
                src.len(),
                dst.len()
            )));
        }
        Ok(EdgeIndex {
            src,
            dst,
            layout: attr.layout,
            is_sorted: attr.is_sorted,
        })
    }

    fn get_all_edge_attrs(&self) -> Vec<EdgeAttr> {
        self.edge_registry.all_descriptors()
    }

    fn put_edge_index(&self, _edge_index: EdgeIndex, attr: EdgeAttr) -> Result<(), StoreError> {
        Err(StoreError::NotImplemented(format!(
            "adding edge indices is not supported ({})",
            attr.edge_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetero_graph::InMemoryPropertyGraph;
    use hetero_tensor::CpuBackend;
    use hetero_types::{
        BackendError, DType, EdgeRecord, RenumberPolicy, StoreConfig, VertexRecord,
    };

    fn store() -> HeteroStore<InMemoryPropertyGraph, CpuBackend> {
        let g = InMemoryPropertyGraph::new();
        g.add_vertices("author", &[VertexRecord::new(0), VertexRecord::new(1)])
            .unwrap();
        g.add_vertices("paper", &[VertexRecord::new(2), VertexRecord::new(3)])
            .unwrap();
        g.add_edges(Some("writes"), &[EdgeRecord::new(1, 3), EdgeRecord::new(0, 2)])
            .unwrap();
        g.add_edges(Some("cites"), &[EdgeRecord::new(3, 2)]).unwrap();
        let config = StoreConfig::default()
            .with_renumber(RenumberPolicy::Keep)
            .with_vertex_dtype(DType::Int32);
        HeteroStore::new(g, CpuBackend::new(), config).unwrap()
    }

    #[test]
    fn filters_by_type_and_casts_ids() {
        let store = store();
        let ei = store
            .get_edge_index(EdgeAttr::coo(("author", "writes", "paper")))
            .unwrap();
        assert_eq!(ei.src.to_i64_vec(), vec![1, 0]);
        assert_eq!(ei.dst.to_i64_vec(), vec![3, 2]);
        assert_eq!(ei.src.dtype(), DType::Int32);
        assert!(!ei.is_sorted);

        let ei = store.get_edge_index(EdgeAttr::coo("cites")).unwrap();
        assert_eq!(ei.len(), 1);
    }

    #[test]
    fn non_coo_layouts_are_unsupported() {
        let store = store();
        let err = store
            .get_edge_index(EdgeAttr::new("writes", EdgeLayout::Csr))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedLayout(EdgeLayout::Csr)));
        let err = store
            .get_edge_index(EdgeAttr::new("writes", EdgeLayout::Csc).sorted(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedLayout(EdgeLayout::Csc)));
    }

    #[test]
    fn sorted_flag_is_echoed() {
        let ei = store()
            .get_edge_index(EdgeAttr::coo("writes").sorted(true))
            .unwrap();
        assert!(ei.is_sorted);
        assert_eq!(ei.layout, EdgeLayout::Coo);
    }

    #[test]
    fn ids_too_wide_for_vertex_dtype_fail() {
        let g = InMemoryPropertyGraph::new();
        g.add_vertices("v", &[VertexRecord::new(0), VertexRecord::new(3_000_000_000)])
            .unwrap();
        g.add_edges(Some("e"), &[EdgeRecord::new(0, 3_000_000_000)])
            .unwrap();
        let config = StoreConfig::default()
            .with_renumber(RenumberPolicy::Keep)
            .with_vertex_dtype(DType::Int32);
        let store = HeteroStore::new(g, CpuBackend::new(), config).unwrap();
        let err = store.get_edge_index(EdgeAttr::coo("e")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Backend(BackendError::OutOfRange { dtype: DType::Int32, .. })
        ));
    }

    #[test]
    fn unknown_edge_type_is_lookup() {
        let err = store().get_edge_index(EdgeAttr::coo("likes")).unwrap_err();
        assert!(matches!(err, StoreError::Lookup(_)));
    }

    #[test]
    fn descriptors_and_writes() {
        let store = store();
        let attrs = store.get_all_edge_attrs();
        assert_eq!(attrs.len(), 2);
        assert!(attrs.iter().all(|a| a.layout == EdgeLayout::Coo && !a.is_sorted));

        let ei = store.get_edge_index(EdgeAttr::coo("cites")).unwrap();
        let err = store.put_edge_index(ei, EdgeAttr::coo("cites")).unwrap_err();
        assert!(matches!(err, StoreError::NotImplemented(_)));
    }
}
