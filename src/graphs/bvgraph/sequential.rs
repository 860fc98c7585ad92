//! Sequential (forward-only) access to a compressed graph.
//!
//! A [`BvGraphSeq`] needs only the `.graph` bitstream and the `.properties`
//! metadata — no offset index — because it decodes nodes strictly in order
//! and resolves back-references from a small ring-buffer cache of the last
//! `compression_window` lists rather than by seeking (spec §4.5, "Sequential
//! decoding").

use std::collections::VecDeque;
use std::path::Path;

use super::decode::decode_record;
use crate::bits::SliceBitReader;
use crate::error::{Error, Result};
use crate::properties::{self, CompFlags};

/// A graph opened for sequential scanning. Cheap to clone: cloning just
/// copies the (small) metadata and the handle to the graph bytes, and each
/// clone's [`iter`](Self::iter) starts its own independent cursor.
#[derive(Debug, Clone)]
pub struct BvGraphSeq<B> {
    graph: B,
    num_nodes: usize,
    num_arcs: u64,
    comp_flags: CompFlags,
}

impl BvGraphSeq<Vec<u8>> {
    /// Loads `<basename>.graph` and `<basename>.properties`.
    pub fn with_basename<P: AsRef<Path>>(basename: P) -> Result<Self> {
        let basename = basename.as_ref();
        let props = properties::read(basename.with_extension(super::PROPERTIES_EXTENSION))?;
        let graph_path = basename.with_extension(super::GRAPH_EXTENSION);
        let graph = std::fs::read(&graph_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(graph_path.clone())
            } else {
                Error::Io(e)
            }
        })?;
        log::debug!(
            "opened {} for sequential scan ({} nodes, {} arcs)",
            graph_path.display(),
            props.num_nodes,
            props.num_arcs
        );
        Ok(BvGraphSeq {
            graph,
            num_nodes: props.num_nodes,
            num_arcs: props.num_arcs,
            comp_flags: props.comp_flags,
        })
    }
}

impl<B: AsRef<[u8]>> BvGraphSeq<B> {
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    pub fn comp_flags(&self) -> &CompFlags {
        &self.comp_flags
    }

    /// Starts a fresh, independent scan from node 0.
    pub fn iter(&self) -> NodeIterator<'_, B> {
        NodeIterator {
            graph: self,
            reader: SliceBitReader::new(self.graph.as_ref()),
            next_node: 0,
            cache: VecDeque::with_capacity(self.comp_flags.compression_window + 1),
        }
    }
}

/// Yields `(node, successors)` pairs in order. Each item's reference window
/// is satisfied from the small cache kept alongside the cursor; references
/// outside that window indicate a corrupt stream (spec §4.3's invariant that
/// `reference <= compression_window`).
pub struct NodeIterator<'g, B: AsRef<[u8]>> {
    graph: &'g BvGraphSeq<B>,
    reader: SliceBitReader<&'g [u8]>,
    next_node: usize,
    cache: VecDeque<(usize, Vec<usize>)>,
}

impl<'g, B: AsRef<[u8]>> NodeIterator<'g, B> {
    /// The node that the next call to [`next`](Iterator::next) will decode.
    pub fn next_node(&self) -> usize {
        self.next_node
    }
}

impl<'g, B: AsRef<[u8]>> Iterator for NodeIterator<'g, B> {
    type Item = Result<(usize, Vec<usize>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_node >= self.graph.num_nodes {
            return None;
        }
        let node = self.next_node;
        let reader = &mut self.reader;
        let cache = &self.cache;
        let result = decode_record(reader, &self.graph.comp_flags, node, |target| {
            cache
                .iter()
                .find(|(n, _)| *n == target)
                .map(|(_, succ)| succ.clone())
                .ok_or_else(|| Error::Corrupt {
                    node,
                    reason: format!("reference to node {target} fell outside the sequential cache"),
                })
        });
        let successors = match result {
            Ok(s) => s,
            Err(e) => {
                self.next_node = self.graph.num_nodes; // stop on corruption
                return Some(Err(e));
            }
        };

        self.cache.push_back((node, successors.clone()));
        while self.cache.len() > self.graph.comp_flags.compression_window {
            self.cache.pop_front();
        }

        self.next_node += 1;
        Some(Ok((node, successors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{BitWrite, BitWriter};
    use crate::properties::CompFlags;

    #[test]
    fn iterates_nodes_in_order_plain_case() {
        // Simpler graph with window=0 so there is no reference machinery to
        // hand-trace: 0 -> [5], 1 -> [], 2 -> [0, 1].
        let mut w = BitWriter::new(Vec::new());
        w.write_gamma(1).unwrap(); // node 0: outdegree 1
        w.write_gamma(0).unwrap(); // 0 intervals
        w.write_zeta(crate::bits::int_to_nat(5), 3).unwrap(); // residual 5

        w.write_gamma(0).unwrap(); // node 1: outdegree 0

        w.write_gamma(2).unwrap(); // node 2: outdegree 2
        w.write_gamma(0).unwrap(); // 0 intervals
        w.write_zeta(crate::bits::int_to_nat(-2), 3).unwrap(); // residual 0 (0 - 2 = -2)
        w.write_zeta(0, 3).unwrap(); // residual 1 (gap = 1 - 0 - 1 = 0)
        let (bytes, _) = w.finish().unwrap();

        let graph = BvGraphSeq {
            graph: bytes,
            num_nodes: 3,
            num_arcs: 3,
            comp_flags: CompFlags {
                compression_window: 0,
                ..CompFlags::default()
            },
        };
        let collected: Result<Vec<_>> = graph.iter().collect();
        let collected = collected.unwrap();
        assert_eq!(
            collected,
            vec![(0, vec![5]), (1, vec![]), (2, vec![0, 1])]
        );
    }

    #[test]
    fn drops_corrupt_tail() {
        // outdegree claims 2 successors but the stream ends after 1 residual.
        let mut w = BitWriter::new(Vec::new());
        w.write_gamma(2).unwrap();
        w.write_gamma(0).unwrap();
        w.write_zeta(crate::bits::int_to_nat(0), 3).unwrap();
        let (bytes, _) = w.finish().unwrap();

        let graph = BvGraphSeq {
            graph: bytes,
            num_nodes: 1,
            num_arcs: 2,
            comp_flags: CompFlags {
                compression_window: 0,
                ..CompFlags::default()
            },
        };
        let collected: Vec<_> = graph.iter().collect();
        assert_eq!(collected.len(), 1);
        assert!(collected[0].is_err());
    }
}
