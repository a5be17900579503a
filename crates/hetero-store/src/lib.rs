//! Graph and feature store adapter over a heterogeneous property graph.
//!
//! [`HeteroStore`] serves COO edge indices and feature tensors by type, and
//! renumbers sampler output into the per-type local ids a mini-batch needs.

mod edge_index;
mod edge_registry;
mod features;
mod offsets;
mod renumber;
mod store;
mod subgraph;
mod tensor_registry;

pub use edge_registry::EdgeTypeRegistry;
pub use hetero_types::{
    FeatureStore, GraphStore, RenumberPolicy, SampleRenumber, StoreConfig, StoreError,
};
pub use offsets::TypeOffsetTable;
pub use store::HeteroStore;
pub use subgraph::{SubgraphCache, SubgraphKey};
pub use tensor_registry::TensorAttrRegistry;
