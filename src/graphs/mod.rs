//! Graph representations and generators.

pub mod bvgraph;
pub mod random;
