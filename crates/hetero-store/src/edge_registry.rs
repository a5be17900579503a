//! Edge type descriptors derived from the endpoints actually present.

use hetero_types::{
    EdgeAttr, EdgeLayout, EdgeTypeKey, Frame, PropertyGraph, PygEdgeType, StoreError,
};
use std::collections::{BTreeMap, BTreeSet};

/// One COO descriptor per edge type, keyed by edge type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeTypeRegistry {
    attrs: BTreeMap<String, EdgeAttr>,
}

impl EdgeTypeRegistry {
    /// Scans each edge type of `graph` and resolves its single
    /// `(src_type, dst_type)` pair.
    pub fn build<G: PropertyGraph + ?Sized>(graph: &G) -> Result<Self, StoreError> {
        let mut attrs = BTreeMap::new();
        for edge_type in graph.edge_types() {
            let edge_type = edge_type.ok_or_else(|| {
                StoreError::Construction("unspecified edge types are not allowed".to_string())
            })?;

            let columns = [
                graph.src_col_name().to_string(),
                graph.dst_col_name().to_string(),
            ];
            tracing::debug!(edge_type = %edge_type, "forcing edge endpoints");
            let edges = graph
                .get_edge_data(
                    None,
                    Some(std::slice::from_ref(&edge_type)),
                    Some(&columns[..]),
                )?
                .force()?;
            let num_edges = edges.num_rows();
            if num_edges == 0 {
                return Err(StoreError::Construction(format!(
                    "edge type {} has no edges",
                    edge_type
                )));
            }

            let srcs = unique_ids(&edges, graph.src_col_name())?;
            let dsts = unique_ids(&edges, graph.dst_col_name())?;
            let src_type = single_vertex_type(graph, &edge_type, "source", &srcs)?;
            let dst_type = single_vertex_type(graph, &edge_type, "destination", &dsts)?;

            let pyg = PygEdgeType::new(src_type, edge_type.clone(), dst_type);
            let attr = EdgeAttr {
                edge_type: EdgeTypeKey::Triple(pyg),
                layout: EdgeLayout::Coo,
                is_sorted: false,
                size: Some((num_edges, num_edges)),
            };
            attrs.insert(edge_type, attr);
        }
        Ok(Self { attrs })
    }

    pub fn descriptor_of(&self, edge_type: &str) -> Result<&EdgeAttr, StoreError> {
        self.attrs
            .get(edge_type)
            .ok_or_else(|| StoreError::Lookup(format!("unknown edge type: {}", edge_type)))
    }

    /// Canonical triple of `edge_type`.
    pub fn pyg_edge_type_of(&self, edge_type: &str) -> Result<&PygEdgeType, StoreError> {
        let attr = self.descriptor_of(edge_type)?;
        attr.pyg_edge_type().ok_or_else(|| {
            StoreError::Internal(format!("edge type {} has no endpoint types", edge_type))
        })
    }

    pub fn all_descriptors(&self) -> Vec<EdgeAttr> {
        self.attrs.values().cloned().collect()
    }

    /// The only descriptor, when exactly one edge type exists.
    pub fn single(&self) -> Option<(&str, &EdgeAttr)> {
        if self.attrs.len() != 1 {
            return None;
        }
        self.attrs.iter().next().map(|(n, a)| (n.as_str(), a))
    }

    pub fn contains(&self, edge_type: &str) -> bool {
        self.attrs.contains_key(edge_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

fn unique_ids(frame: &Frame, column: &str) -> Result<Vec<i64>, StoreError> {
    let ids = frame.column(column)?.as_i64().ok_or_else(|| {
        StoreError::Construction(format!("column {} does not hold vertex ids", column))
    })?;
    Ok(ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
}

fn single_vertex_type<G: PropertyGraph + ?Sized>(
    graph: &G,
    edge_type: &str,
    side: &str,
    ids: &[i64],
) -> Result<String, StoreError> {
    let type_col = graph.type_col_name().to_string();
    let frame = graph
        .get_vertex_data(Some(ids), None, Some(std::slice::from_ref(&type_col)))?
        .force()?;
    let types: BTreeSet<String> = frame
        .column(&type_col)?
        .as_utf8()
        .ok_or_else(|| StoreError::Construction(format!("column {} is not textual", type_col)))?
        .iter()
        .cloned()
        .collect();

    let mut types = types.into_iter();
    match (types.next(), types.next()) {
        (Some(t), None) => Ok(t),
        (None, _) => Err(StoreError::Construction(format!(
            "edge type {} has {} vertices with no type",
            edge_type, side
        ))),
        (Some(a), Some(b)) => Err(StoreError::Construction(format!(
            "edge type {} is associated with multiple {} types ({}, {}, ...)",
            edge_type, side, a, b
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetero_graph::InMemoryPropertyGraph;
    use hetero_types::{EdgeRecord, VertexRecord};

    fn typed_graph() -> InMemoryPropertyGraph {
        let g = InMemoryPropertyGraph::new();
        g.add_vertices("author", &[VertexRecord::new(0), VertexRecord::new(1)])
            .unwrap();
        g.add_vertices("paper", &[VertexRecord::new(2), VertexRecord::new(3)])
            .unwrap();
        g.add_edges(Some("writes"), &[EdgeRecord::new(0, 2), EdgeRecord::new(1, 3)])
            .unwrap();
        g.add_edges(Some("cites"), &[EdgeRecord::new(2, 3)]).unwrap();
        g
    }

    #[test]
    fn resolves_endpoint_types() {
        let registry = EdgeTypeRegistry::build(&typed_graph()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.pyg_edge_type_of("writes").unwrap(),
            &PygEdgeType::new("author", "writes", "paper")
        );
        let cites = registry.descriptor_of("cites").unwrap();
        assert_eq!(cites.layout, EdgeLayout::Coo);
        assert!(!cites.is_sorted);
        assert_eq!(cites.size, Some((1, 1)));
        assert!(registry.single().is_none());
        assert!(matches!(registry.descriptor_of("likes"), Err(StoreError::Lookup(_))));
    }

    #[test]
    fn mixed_endpoint_types_fail() {
        let g = typed_graph();
        g.add_edges(Some("cites"), &[EdgeRecord::new(0, 3)]).unwrap();
        let err = EdgeTypeRegistry::build(&g).unwrap_err();
        assert!(matches!(err, StoreError::Construction(ref m) if m.contains("cites")));
    }

    #[test]
    fn untyped_edges_fail() {
        let g = typed_graph();
        g.add_edges(None, &[EdgeRecord::new(0, 1)]).unwrap();
        assert!(matches!(
            EdgeTypeRegistry::build(&g),
            Err(StoreError::Construction(_))
        ));
    }
}
