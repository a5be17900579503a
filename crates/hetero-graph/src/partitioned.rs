//! Partitioned property graph whose row fetches are deferred.

use crate::memory::InMemoryPropertyGraph;
use hetero_types::{
    Deferred, EdgeSelection, Frame, GraphError, PropertyGraph, StructuralGraph, SubgraphOptions,
    TypeRange,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Property graph spread over `num_partitions` partitions by `id mod n`.
///
/// Vertex and edge frames are returned unevaluated and come back in
/// partition order, so row order need not match the requested id order.
#[derive(Debug, Clone)]
pub struct PartitionedPropertyGraph {
    graph: InMemoryPropertyGraph,
    num_partitions: usize,
    forced: Arc<AtomicUsize>,
}

impl PartitionedPropertyGraph {
    pub fn new(graph: InMemoryPropertyGraph, num_partitions: usize) -> Self {
        Self {
            graph,
            num_partitions: num_partitions.max(1),
            forced: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The unpartitioned graph, for loading.
    pub fn inner(&self) -> &InMemoryPropertyGraph {
        &self.graph
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// How many deferred frames have been materialized so far.
    pub fn force_count(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }

    fn partition_order(frame: Frame, id_col: &str, n: usize) -> Result<Frame, GraphError> {
        let ids = frame
            .column(id_col)?
            .as_i64()
            .ok_or_else(|| GraphError::Other(format!("{} is not an integer column", id_col)))?
            .to_vec();
        let mut out = Frame::new();
        for part in 0..n as i64 {
            let rows: Vec<usize> = ids
                .iter()
                .enumerate()
                .filter(|(_, id)| id.rem_euclid(n as i64) == part)
                .map(|(row, _)| row)
                .collect();
            if rows.is_empty() {
                continue;
            }
            out.append(frame.take(&rows))?;
        }
        if out.num_columns() == 0 {
            return Ok(frame);
        }
        Ok(out)
    }

    fn deferred_fetch(
        &self,
        id_col: &'static str,
        fetch: impl FnOnce(&InMemoryPropertyGraph) -> Result<Deferred<Frame>, GraphError>
            + Send
            + 'static,
    ) -> Deferred<Frame> {
        let graph = self.graph.clone();
        let n = self.num_partitions;
        let forced = Arc::clone(&self.forced);
        Deferred::pending(move || {
            forced.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(partitions = n, "materializing partitioned frame");
            let frame = fetch(&graph)?.force()?;
            Self::partition_order(frame, id_col, n)
        })
    }
}

impl PropertyGraph for PartitionedPropertyGraph {
    fn vertex_col_name(&self) -> &str {
        self.graph.vertex_col_name()
    }

    fn edge_id_col_name(&self) -> &str {
        self.graph.edge_id_col_name()
    }

    fn src_col_name(&self) -> &str {
        self.graph.src_col_name()
    }

    fn dst_col_name(&self) -> &str {
        self.graph.dst_col_name()
    }

    fn type_col_name(&self) -> &str {
        self.graph.type_col_name()
    }

    fn vertex_types(&self) -> Vec<String> {
        self.graph.vertex_types()
    }

    fn edge_types(&self) -> Vec<Option<String>> {
        self.graph.edge_types()
    }

    fn vertex_property_names(&self) -> Vec<String> {
        self.graph.vertex_property_names()
    }

    fn num_vertices(&self, vertex_type: Option<&str>) -> Result<usize, GraphError> {
        self.graph.num_vertices(vertex_type)
    }

    fn get_vertex_data(
        &self,
        vertex_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError> {
        let ids = vertex_ids.map(<[i64]>::to_vec);
        let types = types.map(<[String]>::to_vec);
        let columns = columns.map(<[String]>::to_vec);
        Ok(self.deferred_fetch(crate::memory::VERTEX_COL, move |g| {
            g.get_vertex_data(ids.as_deref(), types.as_deref(), columns.as_deref())
        }))
    }

    fn get_edge_data(
        &self,
        edge_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError> {
        let ids = edge_ids.map(<[i64]>::to_vec);
        let types = types.map(<[String]>::to_vec);
        let columns = columns.map(<[String]>::to_vec);
        Ok(self.deferred_fetch(crate::memory::EDGE_ID_COL, move |g| {
            g.get_edge_data(ids.as_deref(), types.as_deref(), columns.as_deref())
        }))
    }

    fn renumber_vertices_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError> {
        self.graph.renumber_vertices_by_type(prev_id_column)
    }

    fn renumber_edges_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError> {
        self.graph.renumber_edges_by_type(prev_id_column)
    }

    fn edge_types_from_numerals(&self, numerals: &[i32]) -> Result<Vec<String>, GraphError> {
        self.graph.edge_types_from_numerals(numerals)
    }

    fn select_edges(&self, edge_types: &[String]) -> Result<EdgeSelection, GraphError> {
        self.graph.select_edges(edge_types)
    }

    fn extract_subgraph(
        &self,
        selection: &EdgeSelection,
        options: &SubgraphOptions,
    ) -> Result<StructuralGraph, GraphError> {
        self.graph.extract_subgraph(selection, options)
    }
}
