//! Circuit graph representation and validation.
//!
//! The [`Circuit`] struct holds all devices, nodes, and their connections
//! in a form suitable for simulation. Circuits are assembled directly
//! through the `add_*` builders; the pin assembler and the K-table
//! benches both build theirs this way.

mod graph;
mod types;
mod validate;

pub use graph::Circuit;
pub use types::*;
pub use validate::validate_circuit;
