//! Records exchanged with the property graph: loading rows, type ranges,
//! edge selections, and extracted structural subgraphs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// One vertex to load, with its property values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: i64,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl VertexRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: serde_json::Value) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }
}

/// One edge to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: i64,
    pub dst: i64,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl EdgeRecord {
    pub fn new(src: i64, dst: i64) -> Self {
        Self {
            src,
            dst,
            properties: HashMap::new(),
        }
    }
}

/// Contiguous id range owned by one type, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRange {
    pub type_name: String,
    pub start: i64,
    pub end: i64,
}

impl TypeRange {
    pub fn new(type_name: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            type_name: type_name.into(),
            start,
            end,
        }
    }

    pub fn range(&self) -> Range<i64> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Edges picked by a selection predicate, identified by edge id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSelection {
    pub edge_ids: Vec<i64>,
}

/// How a structural subgraph is extracted from a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphOptions {
    /// Edge property used as weight; the type column weights by type numeral.
    #[serde(default)]
    pub edge_weight_property: Option<String>,
    #[serde(default = "default_edge_weight")]
    pub default_edge_weight: f64,
    /// Reject selections holding more than one edge between the same pair.
    #[serde(default)]
    pub check_multi_edges: bool,
    /// Compact vertex ids to `0..n` in ascending global id order.
    #[serde(default = "default_true")]
    pub renumber_graph: bool,
    /// Keep the originating edge ids alongside the structure.
    #[serde(default)]
    pub add_edge_data: bool,
}

fn default_edge_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for SubgraphOptions {
    fn default() -> Self {
        Self {
            edge_weight_property: None,
            default_edge_weight: default_edge_weight(),
            check_multi_edges: false,
            renumber_graph: true,
            add_edge_data: false,
        }
    }
}

/// Weighted edge list extracted from the property graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralGraph {
    pub sources: Vec<i64>,
    pub destinations: Vec<i64>,
    pub weights: Vec<f64>,
    /// Local vertex id -> global vertex id; empty when not renumbered.
    pub vertex_map: Vec<i64>,
    pub edge_ids: Option<Vec<i64>>,
}

impl StructuralGraph {
    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_map.len()
    }
}
