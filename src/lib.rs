//! A compressed representation for very large directed graphs, based on the
//! Boldi-Vigna (BV) adjacency compression scheme: reference compression
//! against nearby nodes, interval run-length compression for consecutive
//! runs of successors, and universal-code residual gaps for what is left.
//!
//! Start with [`prelude::BvGraphSeq`] for forward-only scanning (cheapest to
//! open, no offset index needed), [`prelude::BvGraph`] for random access to
//! an arbitrary node, and [`prelude::BvComp`] (or
//! [`prelude::compress_to_basename`]) to build a compressed graph from
//! successor lists.

pub mod bits;
pub mod elias_fano;
pub mod error;
pub mod graphs;
pub mod properties;

pub use error::{Error, Result};

/// Re-exports of the types most programs need.
pub mod prelude {
    pub use crate::bits::Codes;
    pub use crate::error::{Error, Result};
    pub use crate::graphs::bvgraph::{
        BvComp, BvGraph, BvGraphSeq, CompStats, LoadMode, compress_to_basename, concat_chunks,
    };
    pub use crate::graphs::random::ErdosRenyi;
    pub use crate::properties::CompFlags;
}
