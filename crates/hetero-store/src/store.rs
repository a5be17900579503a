//! HeteroStore: graph and feature store over a property graph and a numeric backend.

use crate::edge_registry::EdgeTypeRegistry;
use crate::offsets::TypeOffsetTable;
use crate::subgraph::{SubgraphCache, SubgraphKey};
use crate::tensor_registry::TensorAttrRegistry;
use hetero_types::{
    DType, FeatureStore, GraphStore, NumericBackend, PropertyGraph, RenumberPolicy, StoreConfig,
    StoreError, StructuralGraph, SubgraphOptions, Tensor,
};
use std::sync::Arc;

/// Read-only graph store and feature store backed by a property graph.
///
/// Construction infers the default feature tensors, makes vertex ids
/// contiguous per type (per [`RenumberPolicy`]), and resolves the endpoint
/// types of every edge type. After that the offsets and descriptors are
/// immutable; only the subgraph cache grows.
pub struct HeteroStore<G, B> {
    pub(crate) graph: G,
    pub(crate) backend: B,
    pub(crate) config: StoreConfig,
    pub(crate) offsets: TypeOffsetTable,
    pub(crate) edge_registry: EdgeTypeRegistry,
    pub(crate) tensor_attrs: TensorAttrRegistry,
    subgraphs: SubgraphCache,
    old_vertex_col: Option<String>,
    old_edge_col: Option<String>,
}

impl<G, B> HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    pub fn new(graph: G, backend: B, config: StoreConfig) -> Result<Self, StoreError> {
        if graph.edge_types().iter().any(Option::is_none) {
            return Err(StoreError::Construction(
                "unspecified edge types are not allowed".to_string(),
            ));
        }
        if config.device != backend.device() {
            return Err(StoreError::Construction(format!(
                "configured device {:?} is not served by backend {} (device {:?})",
                config.device,
                backend.name(),
                backend.device()
            )));
        }
        if !config.vertex_dtype.is_integer() {
            return Err(StoreError::Construction(format!(
                "vertex ids need an integer dtype, got {}",
                config.vertex_dtype
            )));
        }

        // Before renumbering, so a saved old-id column is not taken for a feature.
        let tensor_attrs = TensorAttrRegistry::infer_defaults(
            &graph.vertex_types(),
            &graph.vertex_property_names(),
            &config.feature_attr,
            &config.label_attr,
            config.property_dtype,
            config.vertex_dtype,
        );

        let (offsets, old_vertex_col, old_edge_col) = Self::renumber_graph(&graph, config.renumber)?;
        let edge_registry = EdgeTypeRegistry::build(&graph)?;

        tracing::info!(
            vertex_types = offsets.len(),
            edge_types = edge_registry.len(),
            num_vertices = offsets.total(),
            renumber = ?config.renumber,
            backend = backend.name(),
            "hetero store ready"
        );

        Ok(Self {
            graph,
            backend,
            config,
            offsets,
            edge_registry,
            tensor_attrs,
            subgraphs: SubgraphCache::new(),
            old_vertex_col,
            old_edge_col,
        })
    }

    #[allow(clippy::type_complexity)]
    fn renumber_graph(
        graph: &G,
        policy: RenumberPolicy,
    ) -> Result<(TypeOffsetTable, Option<String>, Option<String>), StoreError> {
        let (old_vertex_col, old_edge_col) = match policy {
            RenumberPolicy::Auto => {
                let v = format!("{}_old", graph.vertex_col_name());
                let e = format!("{}_old", graph.edge_id_col_name());
                tracing::warn!(
                    old_vertex_col = %v,
                    old_edge_col = %e,
                    "renumber policy not specified; renumbering by default and saving previous ids"
                );
                (Some(v), Some(e))
            }
            RenumberPolicy::Renumber | RenumberPolicy::Keep => (None, None),
        };

        let offsets = match policy {
            RenumberPolicy::Auto | RenumberPolicy::Renumber => {
                let ranges = graph.renumber_vertices_by_type(old_vertex_col.as_deref())?;
                // Edge ids are renumbered alongside so partitions stay aligned.
                graph.renumber_edges_by_type(old_edge_col.as_deref())?;
                TypeOffsetTable::from_ranges(ranges)?
            }
            RenumberPolicy::Keep => {
                let mut counts = Vec::new();
                for vertex_type in graph.vertex_types() {
                    let n = graph.num_vertices(Some(vertex_type.as_str()))?;
                    counts.push((vertex_type, n));
                }
                TypeOffsetTable::from_counts(counts)
            }
        };
        Ok((offsets, old_vertex_col, old_edge_col))
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn type_offsets(&self) -> &TypeOffsetTable {
        &self.offsets
    }

    pub fn edge_registry(&self) -> &EdgeTypeRegistry {
        &self.edge_registry
    }

    /// Property holding the vertex ids from before renumbering, if kept.
    pub fn old_vertex_col_name(&self) -> Option<&str> {
        self.old_vertex_col.as_deref()
    }

    /// Property holding the edge ids from before renumbering, if kept.
    pub fn old_edge_col_name(&self) -> Option<&str> {
        self.old_edge_col.as_deref()
    }

    /// Global ids of every vertex of `vertex_types`, concatenated in request order.
    pub fn get_vertex_index<S: AsRef<str>>(&self, vertex_types: &[S]) -> Result<Tensor, StoreError> {
        let dtype = self.config.vertex_dtype;
        let mut parts = Vec::with_capacity(vertex_types.len().max(1));
        for vertex_type in vertex_types {
            let range = self.offsets.range_of(vertex_type.as_ref())?;
            parts.push(self.backend.arange(range.start, range.end, dtype)?);
        }
        if parts.is_empty() {
            parts.push(self.backend.arange(0, 0, dtype)?);
        }
        let index = self.backend.concatenate(&parts)?;
        Ok(self.backend.to_device(index))
    }

    /// Registers an extra named tensor built from `properties` of `vertex_type`.
    pub fn create_named_tensor(
        &mut self,
        attr_name: &str,
        properties: Vec<String>,
        vertex_type: &str,
        dtype: DType,
    ) {
        self.tensor_attrs
            .register(vertex_type, attr_name, properties, dtype);
    }

    /// Structural subgraph holding only edges of `edge_types`, extracted on
    /// first request and cached for the life of the store.
    pub fn subgraph<S: AsRef<str>>(
        &self,
        edge_types: &[S],
    ) -> Result<Arc<StructuralGraph>, StoreError> {
        if edge_types.is_empty() {
            return Err(StoreError::Value(
                "a subgraph needs at least one edge type".to_string(),
            ));
        }
        for edge_type in edge_types {
            self.edge_registry.descriptor_of(edge_type.as_ref())?;
        }

        let options = SubgraphOptions {
            edge_weight_property: Some(self.graph.type_col_name().to_string()),
            default_edge_weight: 1.0,
            check_multi_edges: false,
            renumber_graph: true,
            add_edge_data: false,
        };
        self.subgraphs
            .get_or_extract(SubgraphKey::new(edge_types), |types| {
                let selection = self.graph.select_edges(types)?;
                Ok(self.graph.extract_subgraph(&selection, &options)?)
            })
    }

    /// Number of subgraphs extracted so far.
    pub fn cached_subgraphs(&self) -> usize {
        self.subgraphs.len()
    }

    /// Number of registered tensor attributes.
    pub fn len(&self) -> usize {
        self.tensor_attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor_attrs.is_empty()
    }
}

impl<G, B> HeteroStore<G, B>
where
    G: PropertyGraph + 'static,
    B: NumericBackend + 'static,
{
    /// Shares the store as its graph-store and feature-store halves.
    pub fn into_stores(self) -> (Arc<dyn GraphStore>, Arc<dyn FeatureStore>) {
        let store = Arc::new(self);
        let graph_store: Arc<dyn GraphStore> = store.clone();
        let feature_store: Arc<dyn FeatureStore> = store;
        (graph_store, feature_store)
    }
}

impl<G, B> std::fmt::Debug for HeteroStore<G, B>
where
    B: NumericBackend,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeteroStore")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("offsets", &self.offsets)
            .field("edge_types", &self.edge_registry.len())
            .field("tensor_attrs", &self.tensor_attrs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetero_graph::InMemoryPropertyGraph;
    use hetero_tensor::CpuBackend;
    use hetero_types::{Device, EdgeAttr, EdgeRecord, VertexRecord};
    use serde_json::json;

    fn graph() -> InMemoryPropertyGraph {
        let g = InMemoryPropertyGraph::new();
        g.add_vertices(
            "author",
            &[
                VertexRecord::new(100).with_property("w", json!(1.0)),
                VertexRecord::new(101).with_property("w", json!(2.0)),
            ],
        )
        .unwrap();
        g.add_vertices("paper", &[VertexRecord::new(200).with_property("w", json!(3.0))])
            .unwrap();
        g.add_edges(Some("writes"), &[EdgeRecord::new(100, 200), EdgeRecord::new(101, 200)])
            .unwrap();
        g
    }

    #[test]
    fn auto_policy_saves_old_ids() {
        let g = graph();
        let store = HeteroStore::new(g.clone(), CpuBackend::new(), StoreConfig::default()).unwrap();
        assert_eq!(store.old_vertex_col_name(), Some("_VERTEX__old"));
        assert_eq!(store.old_edge_col_name(), Some("_EDGE_ID__old"));
        assert_eq!(store.type_offsets().range_of("author").unwrap(), 0..2);
        assert_eq!(store.type_offsets().range_of("paper").unwrap(), 2..3);
        assert!(g.vertex_property_names().contains(&"_VERTEX__old".to_string()));

        // The saved column is not part of the inferred features.
        let x = store.tensor_attrs.find("paper", "x").unwrap();
        assert_eq!(x.properties.value().cloned().flatten(), Some(vec!["w".to_string()]));
    }

    #[test]
    fn renumber_policy_overwrites_ids() {
        let g = graph();
        let config = StoreConfig::default().with_renumber(RenumberPolicy::Renumber);
        let store = HeteroStore::new(g.clone(), CpuBackend::new(), config).unwrap();
        assert_eq!(store.old_vertex_col_name(), None);
        assert_eq!(g.vertex_property_names(), vec!["w".to_string()]);
        assert_eq!(store.type_offsets().total(), 3);
    }

    #[test]
    fn float_vertex_dtype_is_rejected() {
        let config = StoreConfig::default().with_vertex_dtype(DType::Float32);
        let err = HeteroStore::new(graph(), CpuBackend::new(), config).unwrap_err();
        assert!(matches!(err, StoreError::Construction(_)));
    }

    #[test]
    fn device_must_match_backend() {
        let mut config = StoreConfig::default();
        config.device = Device::Gpu(0);
        let err = HeteroStore::new(graph(), CpuBackend::new(), config.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Construction(ref m) if m.contains("Gpu(0)")));

        let store = HeteroStore::new(graph(), CpuBackend::on_device(Device::Gpu(0)), config).unwrap();
        let ei = store.get_edge_index(EdgeAttr::coo("writes")).unwrap();
        assert_eq!(ei.src.device(), Device::Gpu(0));
        assert_eq!(ei.dst.device(), Device::Gpu(0));
        let ix = store.get_vertex_index(&["author"]).unwrap();
        assert_eq!(ix.device(), Device::Gpu(0));
    }

    #[test]
    fn vertex_index_follows_request_order() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), StoreConfig::default()).unwrap();
        let ix = store.get_vertex_index(&["paper", "author"]).unwrap();
        assert_eq!(ix.to_i64_vec(), vec![2, 0, 1]);
        assert_eq!(ix.dtype(), DType::Int64);
        assert!(store.get_vertex_index::<&str>(&[]).unwrap().is_empty());
        assert!(matches!(
            store.get_vertex_index(&["venue"]),
            Err(StoreError::Lookup(_))
        ));
    }

    #[test]
    fn named_tensors_extend_the_registry() {
        let mut store =
            HeteroStore::new(graph(), CpuBackend::new(), StoreConfig::default()).unwrap();
        assert_eq!(store.len(), 2);
        store.create_named_tensor("weight", vec!["w".to_string()], "paper", DType::Float64);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get_all_tensor_attrs().len(), 3);
    }

    #[test]
    fn subgraph_is_cached_by_type_set() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), StoreConfig::default()).unwrap();
        let a = store.subgraph(&["writes"]).unwrap();
        let b = store.subgraph(&["writes", "writes"]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.cached_subgraphs(), 1);
        assert_eq!(a.num_edges(), 2);
        assert_eq!(a.weights, vec![0.0, 0.0]);
        assert!(matches!(store.subgraph::<&str>(&[]), Err(StoreError::Value(_))));
        assert!(matches!(store.subgraph(&["cites"]), Err(StoreError::Lookup(_))));
    }
}
