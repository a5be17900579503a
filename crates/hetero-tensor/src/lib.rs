//! Numeric backend implementations.

mod cpu;

pub use cpu::CpuBackend;
pub use hetero_types::{NumericBackend, SearchSide};
