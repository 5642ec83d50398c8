// src/dag/mod.rs

//! Task dependency graph and generation layering.
//!
//! - [`graph`] holds the insertion-ordered adjacency of task names.
//! - [`layers`] turns a graph into ordered generations ("blocks") and
//!   rejects cycles and dangling predecessor names.

pub mod graph;
pub mod layers;

pub use graph::DagGraph;
pub use layers::{Generations, compute_generations};
