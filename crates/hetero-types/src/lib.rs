//! Core types and traits for the heterogeneous graph store adapter.
//!
//! Descriptor shapes follow the PyG `EdgeAttr` / `TensorAttr` contract so a
//! mini-batch loader can address edge indices and feature tensors by type.

mod attr;
mod config;
mod deferred;
mod frame;
mod records;
mod sample;
mod tensor;
mod traits;

pub use attr::*;
pub use config::*;
pub use deferred::Deferred;
pub use frame::{Column, Frame};
pub use records::*;
pub use sample::*;
pub use tensor::*;
pub use traits::*;
