//! Property graph implementations: materialized in-memory tables and a
//! partitioned variant whose fetches are deferred until forced.

mod memory;
mod partitioned;

pub use hetero_types::{GraphError, PropertyGraph};
pub use memory::{InMemoryPropertyGraph, DST_COL, EDGE_ID_COL, SRC_COL, TYPE_COL, VERTEX_COL};
pub use partitioned::PartitionedPropertyGraph;
