//! A compressed graph representation using the adjacency-compression
//! techniques described in "The WebGraph Framework I: Compression
//! Techniques" (Boldi & Vigna, WWW 2004).
//!
//! A compressed graph with basename `BASENAME` is described by up to four
//! files:
//!
//! - `BASENAME.graph`: a bitstream of successor lists, one per node.
//! - `BASENAME.properties`: a plain-text file of compression parameters and
//!   graph metadata.
//! - `BASENAME.offsets`: γ-coded gaps between the bit offsets of successive
//!   nodes' records in `.graph`, used to rebuild random-access support.
//! - `BASENAME.ef`: an [Elias-Fano][`crate::elias_fano::EliasFano`]
//!   encoding of the offsets, built once from `.offsets` and cached for
//!   subsequent loads — random access needs this, sequential scanning does
//!   not.
//!
//! [`BvGraphSeq`] provides forward-only, offset-index-free access;
//! [`BvGraph`] provides random access to an arbitrary node; [`BvComp`]
//! builds the `.graph`/`.offsets`/`.properties` triple from successor
//! lists.

pub const GRAPH_EXTENSION: &str = "graph";
pub const PROPERTIES_EXTENSION: &str = "properties";
pub const OFFSETS_EXTENSION: &str = "offsets";
pub const EF_EXTENSION: &str = "ef";

mod decode;
mod masked_iter;
mod offsets;

pub mod comp;
pub mod random_access;
pub mod sequential;

pub use comp::{BvComp, CompStats, compress_to_basename, concat_chunks};
pub use masked_iter::MaskedIter;
pub use offsets::OffsetsWriter;
pub use random_access::{BvGraph, LoadMode};
pub use sequential::{BvGraphSeq, NodeIterator};
