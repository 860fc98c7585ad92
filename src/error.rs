//! Error taxonomy for the crate.
//!
//! Every fallible public operation returns [`Error`]. Internal helpers are
//! free to use [`anyhow::Result`] for ad-hoc context (e.g. "while parsing
//! properties file foo.properties") and convert to a typed variant at the
//! module boundary.

use std::path::PathBuf;

/// Errors produced while building, loading, or querying a compressed graph.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A decoding invariant was violated: the bitstream does not describe a
    /// valid successor list for the given node.
    #[error("corrupt graph at node {node}: {reason}")]
    Corrupt {
        /// The node whose record failed to decode.
        node: usize,
        /// Human-readable description of the violated invariant.
        reason: String,
    },

    /// A query referenced a node outside `[0, num_nodes)`, or a random-access
    /// query was issued on a sequential-only handle.
    #[error("node {0} is out of range")]
    OutOfRange(usize),

    /// The builder was given a successor list that is not strictly
    /// increasing, contains a duplicate, or contains a value outside
    /// `[0, num_nodes)`.
    #[error("invalid input at node {node}: {reason}")]
    InvalidInput {
        /// The offending node.
        node: usize,
        /// What was wrong with its successor list.
        reason: String,
    },

    /// The `.properties` file declares a codec combination or `graphclass`
    /// this crate does not implement.
    #[error("unsupported graph version/codec combination: {0}")]
    UnsupportedVersion(String),

    /// A basename does not resolve to a readable `.graph`/`.properties` pair.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// An underlying I/O error, propagated with context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
