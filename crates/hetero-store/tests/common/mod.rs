//! Shared fixtures for store tests.

#![allow(dead_code)]

use hetero_graph::InMemoryPropertyGraph;
use hetero_store::{HeteroStore, RenumberPolicy, StoreConfig};
use hetero_tensor::CpuBackend;
use hetero_types::{EdgeRecord, VertexRecord};
use serde_json::json;

pub type CpuStore = HeteroStore<InMemoryPropertyGraph, CpuBackend>;

/// Installs a test-writer subscriber once; `RUST_LOG` controls the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Citation graph with scattered pre-renumbering ids.
///
/// author: 100, 101, 102 (x1, x2, y); paper: 200, 201 (x1, x2, y).
/// writes: author -> paper; cites: paper -> paper.
pub fn citation_graph() -> InMemoryPropertyGraph {
    let g = InMemoryPropertyGraph::new();
    let authors: Vec<VertexRecord> = [100, 101, 102]
        .iter()
        .map(|&id| {
            VertexRecord::new(id)
                .with_property("x1", json!(id as f64 / 100.0))
                .with_property("x2", json!(id as f64))
                .with_property("y", json!(0))
        })
        .collect();
    g.add_vertices("author", &authors).unwrap();
    let papers: Vec<VertexRecord> = [200, 201]
        .iter()
        .map(|&id| {
            VertexRecord::new(id)
                .with_property("x1", json!(id as f64 / 100.0))
                .with_property("x2", json!(id as f64))
                .with_property("y", json!(1))
        })
        .collect();
    g.add_vertices("paper", &papers).unwrap();
    g.add_edges(
        Some("writes"),
        &[
            EdgeRecord::new(100, 200),
            EdgeRecord::new(101, 200),
            EdgeRecord::new(102, 201),
        ],
    )
    .unwrap();
    g.add_edges(Some("cites"), &[EdgeRecord::new(201, 200)]).unwrap();
    g
}

pub fn citation_store(policy: RenumberPolicy) -> CpuStore {
    let config = StoreConfig::default().with_renumber(policy);
    HeteroStore::new(citation_graph(), CpuBackend::new(), config).unwrap()
}
