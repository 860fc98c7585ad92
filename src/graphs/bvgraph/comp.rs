//! Compressing a sequence of successor lists into the BV graph format
//! (spec §4.6, "Encoder").
//!
//! [`Compressor`] computes, for a single node and a single candidate
//! reference, the copy-block/interval/residual decomposition and its exact
//! bit cost; [`BvComp`] drives it over a sliding window of `compression_window`
//! candidates and greedily picks the cheapest, mirroring the reference
//! encoder this crate is descended from.

use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;

use super::offsets::{self, OffsetsWriter};
use crate::bits::{BitRead, BitWrite, BitWriter, SliceBitReader, int_to_nat, len_code};
use crate::error::Result;
use crate::properties::{self, CompFlags};

/// Running totals returned by [`BvComp::flush`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompStats {
    pub num_nodes: usize,
    pub num_arcs: u64,
    pub written_bits: u64,
    pub offsets_written_bits: u64,
}

/// A reusable scratch buffer that turns one node's successor list (and an
/// optional reference list) into the four blocks of spec §4.3, and can
/// report either the exact cost of writing them or actually write them.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compressor {
    outdegree: usize,
    blocks: Vec<usize>,
    extra_nodes: Vec<usize>,
    left_interval: Vec<usize>,
    len_interval: Vec<usize>,
    residuals: Vec<usize>,
}

impl Compressor {
    /// `min_interval_length == NO_INTERVALS` disables intervalization
    /// entirely: every extra node becomes a residual.
    const NO_INTERVALS: usize = 0;

    fn new() -> Self {
        Compressor {
            outdegree: 0,
            blocks: Vec::new(),
            extra_nodes: Vec::new(),
            left_interval: Vec::new(),
            len_interval: Vec::new(),
            residuals: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.outdegree = 0;
        self.blocks.clear();
        self.extra_nodes.clear();
        self.left_interval.clear();
        self.len_interval.clear();
        self.residuals.clear();
    }

    fn compress(&mut self, curr_list: &[usize], ref_list: Option<&[usize]>, min_interval_length: usize) {
        self.clear();
        self.outdegree = curr_list.len();
        if self.outdegree == 0 {
            return;
        }
        match ref_list {
            Some(ref_list) => self.diff_comp(curr_list, ref_list),
            None => self.extra_nodes.extend_from_slice(curr_list),
        }
        if !self.extra_nodes.is_empty() {
            if min_interval_length != Self::NO_INTERVALS {
                self.intervalize(min_interval_length);
            } else {
                self.residuals.extend_from_slice(&self.extra_nodes);
            }
        }
    }

    /// Splits a run of consecutive integers at least `min_interval_length`
    /// long out of `extra_nodes` into `(left_interval, len_interval)` pairs,
    /// leaving the rest in `residuals` (spec §4.3 Block C).
    fn intervalize(&mut self, min_interval_length: usize) {
        let n = self.extra_nodes.len();
        let mut i = 0;
        while i < n {
            let mut run_len = 1;
            while i + run_len < n && self.extra_nodes[i + run_len - 1] + 1 == self.extra_nodes[i + run_len] {
                run_len += 1;
            }
            if run_len >= min_interval_length {
                self.left_interval.push(self.extra_nodes[i]);
                self.len_interval.push(run_len);
                i += run_len;
            } else {
                self.residuals.push(self.extra_nodes[i]);
                i += 1;
            }
        }
    }

    /// Walks `curr_list` and `ref_list` in lockstep, alternating
    /// copy/ignore runs, matching the node already present in both with the
    /// node not present going to `extra_nodes` (spec §4.3 Block B).
    fn diff_comp(&mut self, curr_list: &[usize], ref_list: &[usize]) {
        let mut j = 0;
        let mut k = 0;
        let mut curr_block_len = 0usize;
        let mut copying = true;
        while j < curr_list.len() && k < ref_list.len() {
            if copying {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        self.blocks.push(curr_block_len);
                        copying = false;
                        curr_block_len = 0;
                    }
                    Ordering::Less => {
                        self.extra_nodes.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        j += 1;
                        k += 1;
                        curr_block_len += 1;
                    }
                }
            } else {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        k += 1;
                        curr_block_len += 1;
                    }
                    Ordering::Less => {
                        self.extra_nodes.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        self.blocks.push(curr_block_len);
                        copying = true;
                        curr_block_len = 0;
                    }
                }
            }
        }
        if copying && k < ref_list.len() {
            self.blocks.push(curr_block_len);
        }
        while j < curr_list.len() {
            self.extra_nodes.push(curr_list[j]);
            j += 1;
        }
        if !self.blocks.is_empty() {
            self.blocks[0] += 1;
        }
    }

    /// Exact bit length of writing this plan for `curr_node` with the given
    /// `reference` delta (`0` meaning "no reference"), under `flags`. Must
    /// match [`Self::write`] bit for bit — this is what lets the encoder's
    /// reference search compare candidates without actually emitting bits.
    fn cost(&self, curr_node: usize, reference: usize, flags: &CompFlags) -> u64 {
        let mut bits = len_code(self.outdegree as u64, flags.outdegrees) as u64;
        if self.outdegree != 0 && flags.compression_window > 0 {
            bits += len_code(reference as u64, flags.references) as u64;
            if reference != 0 {
                bits += len_code(self.blocks.len() as u64, flags.blocks) as u64;
                for (i, &b) in self.blocks.iter().enumerate() {
                    let v = if i == 0 { b } else { b - 1 };
                    bits += len_code(v as u64, flags.blocks) as u64;
                }
            }
        }
        if !self.extra_nodes.is_empty() && flags.min_interval_length != Self::NO_INTERVALS {
            bits += len_code(self.left_interval.len() as u64, flags.intervals) as u64;
            if let Some(&first_left) = self.left_interval.first() {
                bits += len_code(int_to_nat(first_left as i64 - curr_node as i64), flags.intervals) as u64;
                bits += len_code((self.len_interval[0] - flags.min_interval_length) as u64, flags.intervals) as u64;
                let mut prev = first_left + self.len_interval[0];
                for i in 1..self.left_interval.len() {
                    bits += len_code((self.left_interval[i] - prev - 1) as u64, flags.intervals) as u64;
                    bits += len_code(
                        (self.len_interval[i] - flags.min_interval_length) as u64,
                        flags.intervals,
                    ) as u64;
                    prev = self.left_interval[i] + self.len_interval[i];
                }
            }
        }
        if let Some(&first) = self.residuals.first() {
            bits += len_code(int_to_nat(first as i64 - curr_node as i64), flags.residuals) as u64;
            for i in 1..self.residuals.len() {
                bits += len_code((self.residuals[i] - self.residuals[i - 1] - 1) as u64, flags.residuals) as u64;
            }
        }
        bits
    }

    /// Writes this plan to `writer`, in the same shape [`Self::cost`] counted.
    fn write<W: BitWrite>(&self, writer: &mut W, curr_node: usize, reference: usize, flags: &CompFlags) -> Result<()> {
        writer.write_code(self.outdegree as u64, flags.outdegrees)?;
        if self.outdegree != 0 && flags.compression_window > 0 {
            writer.write_code(reference as u64, flags.references)?;
            if reference != 0 {
                writer.write_code(self.blocks.len() as u64, flags.blocks)?;
                for (i, &b) in self.blocks.iter().enumerate() {
                    let v = if i == 0 { b } else { b - 1 };
                    writer.write_code(v as u64, flags.blocks)?;
                }
            }
        }
        if !self.extra_nodes.is_empty() && flags.min_interval_length != Self::NO_INTERVALS {
            writer.write_code(self.left_interval.len() as u64, flags.intervals)?;
            if let Some(&first_left) = self.left_interval.first() {
                writer.write_code(int_to_nat(first_left as i64 - curr_node as i64), flags.intervals)?;
                writer.write_code(
                    (self.len_interval[0] - flags.min_interval_length) as u64,
                    flags.intervals,
                )?;
                let mut prev = first_left + self.len_interval[0];
                for i in 1..self.left_interval.len() {
                    writer.write_code((self.left_interval[i] - prev - 1) as u64, flags.intervals)?;
                    writer.write_code(
                        (self.len_interval[i] - flags.min_interval_length) as u64,
                        flags.intervals,
                    )?;
                    prev = self.left_interval[i] + self.len_interval[i];
                }
            }
        }
        if let Some(&first) = self.residuals.first() {
            writer.write_code(int_to_nat(first as i64 - curr_node as i64), flags.residuals)?;
            for i in 1..self.residuals.len() {
                writer.write_code((self.residuals[i] - self.residuals[i - 1] - 1) as u64, flags.residuals)?;
            }
        }
        Ok(())
    }
}

/// Builds a `.graph` + `.offsets` bitstream pair from successor lists pushed
/// in increasing node order.
pub struct BvComp<W: Write, O: Write> {
    /// The last `compression_window + 1` pushed successor lists, indexed by
    /// `node % capacity`.
    backrefs: Vec<Vec<usize>>,
    /// How many reference hops it took to decode each cached node, indexed
    /// the same way; used to enforce `max_ref_count`.
    ref_counts: Vec<usize>,
    writer: BitWriter<W>,
    offsets_writer: OffsetsWriter<O>,
    compressors: Vec<Compressor>,
    flags: CompFlags,
    curr_node: usize,
    start_node: usize,
    stats: CompStats,
}

impl<W: Write, O: Write> BvComp<W, O> {
    pub fn new(writer: W, offsets_writer: OffsetsWriter<O>, flags: CompFlags, start_node: usize) -> Self {
        let capacity = flags.compression_window + 1;
        BvComp {
            backrefs: vec![Vec::new(); capacity],
            ref_counts: vec![0; capacity],
            writer: BitWriter::new(writer),
            offsets_writer,
            compressors: (0..capacity).map(|_| Compressor::new()).collect(),
            flags,
            curr_node: start_node,
            start_node,
            stats: CompStats::default(),
        }
    }

    fn slot(&self, node: usize) -> usize {
        node % self.backrefs.len()
    }

    /// Pushes the next node's successor list. Nodes must be pushed in
    /// increasing, contiguous order starting at `start_node`; a node with no
    /// successors still needs an (empty) call.
    pub fn push<I: IntoIterator<Item = usize>>(&mut self, succ_iter: I) -> Result<()> {
        let slot = self.slot(self.curr_node);
        self.backrefs[slot].clear();
        self.backrefs[slot].extend(succ_iter);
        let curr_list = self.backrefs[slot].clone();

        self.stats.num_nodes += 1;
        self.stats.num_arcs += curr_list.len() as u64;

        let window = self.flags.compression_window;
        let max_delta = if window == 0 || self.curr_node == self.start_node {
            0
        } else {
            window.min(self.curr_node - self.start_node)
        };

        self.compressors[0].compress(&curr_list, None, self.flags.min_interval_length);
        let mut best_delta = 0usize;
        let mut best_bits = self.compressors[0].cost(self.curr_node, 0, &self.flags);
        let mut best_ref_count = 0usize;

        for delta in 1..=max_delta {
            let ref_node = self.curr_node - delta;
            let ref_slot = self.slot(ref_node);
            if self.ref_counts[ref_slot] >= self.flags.max_ref_count {
                continue;
            }
            if self.backrefs[ref_slot].is_empty() {
                continue;
            }
            let ref_list = self.backrefs[ref_slot].clone();
            self.compressors[delta].compress(&curr_list, Some(&ref_list), self.flags.min_interval_length);
            let bits = self.compressors[delta].cost(self.curr_node, delta, &self.flags);
            // Ties favor the larger ref value (the later candidate in this
            // ascending scan): a larger reference value flattens the
            // resulting reference-chain depth, and this crate's tie-break
            // must be deterministic so two implementations produce
            // bit-identical output.
            if bits <= best_bits {
                best_bits = bits;
                best_delta = delta;
                best_ref_count = self.ref_counts[ref_slot] + 1;
            }
        }

        log::trace!(
            "node {}: outdegree {}, chose reference delta {} ({} bits)",
            self.curr_node,
            curr_list.len(),
            best_delta,
            best_bits
        );
        let start_offset = self.writer.bit_pos();
        self.offsets_writer.push(start_offset)?;
        self.compressors[best_delta].write(&mut self.writer, self.curr_node, best_delta, &self.flags)?;

        self.ref_counts[slot] = best_ref_count;
        self.curr_node += 1;
        Ok(())
    }

    /// Pushes a whole sequence of successor lists via [`Self::push`].
    pub fn extend<L: IntoIterator<Item = V>, V: IntoIterator<Item = usize>>(&mut self, nodes: L) -> Result<()> {
        for succ in nodes {
            self.push(succ)?;
        }
        Ok(())
    }

    /// Finalizes both bitstreams and returns the accumulated statistics.
    /// The final offset (`offset(N)`, the bit length of the graph) is
    /// written here.
    pub fn flush(mut self) -> Result<CompStats> {
        let final_offset = self.writer.bit_pos();
        self.offsets_writer.push(final_offset)?;
        let (_, written_bits) = self.writer.finish()?;
        let (_, offsets_bits) = self.offsets_writer.finish()?;
        self.stats.written_bits = written_bits;
        self.stats.offsets_written_bits = offsets_bits;
        Ok(self.stats)
    }
}

/// Compresses `successors` (one entry per node, in order) to
/// `<basename>.graph`/`.offsets`/`.properties`, the all-in-one entry point
/// for the common case (spec's builder API, convenience wrapper around
/// [`BvComp`]).
pub fn compress_to_basename<P, L, V>(basename: P, flags: CompFlags, successors: L) -> Result<CompStats>
where
    P: AsRef<Path>,
    L: IntoIterator<Item = V>,
    V: IntoIterator<Item = usize>,
{
    let basename = basename.as_ref();
    log::debug!("compressing to basename {}", basename.display());
    let graph_file = std::fs::File::create(basename.with_extension(super::GRAPH_EXTENSION))?;
    let offsets_file = std::fs::File::create(basename.with_extension(super::OFFSETS_EXTENSION))?;
    let mut comp = BvComp::new(graph_file, OffsetsWriter::new(offsets_file), flags, 0);
    comp.extend(successors)?;
    let stats = comp.flush()?;
    log::debug!(
        "wrote {} nodes, {} arcs, {} bits to {}",
        stats.num_nodes,
        stats.num_arcs,
        stats.written_bits,
        basename.display()
    );
    properties::write(
        basename.with_extension(super::PROPERTIES_EXTENSION),
        stats.num_nodes,
        stats.num_arcs,
        &flags,
        stats.written_bits,
    )?;
    Ok(stats)
}

/// Concatenates already-compressed chunks (each built with the same
/// [`CompFlags`], e.g. by splitting one node range across several parallel
/// `compress_to_basename` calls) into a single `<output>.graph`/`.offsets`/
/// `.properties` triple, node ranges back to back in chunk order.
///
/// Reference chains never cross a chunk boundary (each chunk was compressed
/// starting fresh at `start_node = 0`), so chunks can be joined by copying
/// bits verbatim; only the offset index needs shifting by the running bit
/// length of the chunks already written.
pub fn concat_chunks<P: AsRef<Path>>(
    output_basename: P,
    chunk_basenames: &[P],
    flags: CompFlags,
) -> Result<CompStats> {
    let output_basename = output_basename.as_ref();
    let mut graph_out = BitWriter::new(std::fs::File::create(
        output_basename.with_extension(super::GRAPH_EXTENSION),
    )?);
    let mut offsets_out = OffsetsWriter::new(std::fs::File::create(
        output_basename.with_extension(super::OFFSETS_EXTENSION),
    )?);

    let mut total_nodes = 0usize;
    let mut total_arcs = 0u64;
    let mut bit_base = 0u64;
    offsets_out.push(0)?;

    for chunk_basename in chunk_basenames {
        let chunk_basename = chunk_basename.as_ref();
        let props = properties::read(chunk_basename.with_extension(super::PROPERTIES_EXTENSION))?;
        let graph_bytes =
            std::fs::read(chunk_basename.with_extension(super::GRAPH_EXTENSION))?;
        let offsets_bytes =
            std::fs::read(chunk_basename.with_extension(super::OFFSETS_EXTENSION))?;
        let chunk_offsets = offsets::decode_all(offsets_bytes, props.num_nodes)?;
        let chunk_bits = *chunk_offsets.last().unwrap_or(&0);

        let mut reader = SliceBitReader::new(&graph_bytes);
        for _ in 0..chunk_bits {
            graph_out.write_bit(reader.read_bit()?)?;
        }
        for &offset in &chunk_offsets[1..] {
            offsets_out.push(bit_base + offset)?;
        }

        bit_base += chunk_bits;
        total_nodes += props.num_nodes;
        total_arcs += props.num_arcs;
    }

    let (_, written_bits) = graph_out.finish()?;
    let (_, offsets_written_bits) = offsets_out.finish()?;
    properties::write(
        output_basename.with_extension(super::PROPERTIES_EXTENSION),
        total_nodes,
        total_arcs,
        &flags,
        written_bits,
    )?;

    Ok(CompStats {
        num_nodes: total_nodes,
        num_arcs: total_arcs,
        written_bits,
        offsets_written_bits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressor_no_reference() {
        let mut c = Compressor::new();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], None, 2);
        assert_eq!(c.outdegree, 7);
        assert!(c.blocks.is_empty());
        assert_eq!(c.left_interval, vec![0, 7]);
        assert_eq!(c.len_interval, vec![3, 3]);
        assert_eq!(c.residuals, vec![5]);
    }

    #[test]
    fn compressor_full_prefix_reference() {
        let mut c = Compressor::new();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2]), 2);
        assert_eq!(c.outdegree, 7);
        assert!(c.blocks.is_empty());
        assert_eq!(c.extra_nodes, vec![5, 7, 8, 9]);
        assert_eq!(c.left_interval, vec![7]);
        assert_eq!(c.len_interval, vec![3]);
        assert_eq!(c.residuals, vec![5]);
    }

    #[test]
    fn compressor_partial_reference_with_trailing_junk() {
        let mut c = Compressor::new();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2, 100]), 2);
        assert_eq!(c.blocks, vec![4]);
        assert_eq!(c.extra_nodes, vec![5, 7, 8, 9]);
        assert_eq!(c.left_interval, vec![7]);
        assert_eq!(c.len_interval, vec![3]);
    }

    #[test]
    fn compressor_alternating_blocks() {
        let mut c = Compressor::new();
        c.compress(&[0, 1, 2, 5, 7, 8, 9, 100], Some(&[0, 1, 2, 4, 7, 8, 9, 101]), 2);
        assert_eq!(c.outdegree, 8);
        assert_eq!(c.blocks, vec![4, 1, 3]);
        assert_eq!(c.extra_nodes, vec![5, 100]);
        assert!(c.left_interval.is_empty());
        assert_eq!(c.residuals, vec![5, 100]);
    }

    #[test]
    fn end_to_end_roundtrip() {
        use super::super::random_access::{BvGraph, LoadMode};
        use super::super::sequential::BvGraphSeq;

        let graph: Vec<Vec<usize>> = vec![
            vec![1, 2, 3],
            vec![2, 3, 4],
            vec![],
            vec![0, 1, 2, 3],
            vec![5],
            vec![],
        ];

        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("g");
        let stats = compress_to_basename(&basename, CompFlags::default(), graph.clone()).unwrap();
        assert_eq!(stats.num_nodes, 6);
        assert_eq!(stats.num_arcs, 8);

        let seq = BvGraphSeq::with_basename(&basename).unwrap();
        let decoded: Vec<Vec<usize>> = seq
            .iter()
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(decoded, graph);

        let random = BvGraph::with_basename(&basename, LoadMode::Standard).unwrap();
        for (node, expected) in graph.iter().enumerate() {
            assert_eq!(&random.successors(node).unwrap(), expected);
        }
    }

    #[test]
    fn tie_break_prefers_larger_ref_value() {
        use super::super::decode::read_outdegree_and_reference;
        use super::super::random_access::{BvGraph, LoadMode};
        use crate::bits::{BitSeek, Codes};

        // Gamma-coding the reference field gives len_gamma(1) == len_gamma(2)
        // (both fall in the same power-of-two bucket: values 1 and 2 both
        // code in 3 bits). With nodes 0 and 1 carrying identical successor
        // lists, referencing either one from node 2 produces the same
        // copy-block plan, so delta=1 and delta=2 cost exactly the same —
        // the only difference left is the reference field itself.
        let flags = CompFlags {
            references: Codes::Gamma,
            compression_window: 2,
            max_ref_count: 5,
            ..CompFlags::default()
        };

        let nodes: Vec<Vec<usize>> = vec![vec![10, 20, 30], vec![10, 20, 30], vec![10, 20, 30]];

        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("tie");
        compress_to_basename(&basename, flags, nodes.clone()).unwrap();

        let graph_bytes = std::fs::read(basename.with_extension(super::GRAPH_EXTENSION)).unwrap();
        let offsets_bytes = std::fs::read(basename.with_extension(super::OFFSETS_EXTENSION)).unwrap();
        let bit_offsets = offsets::decode_all(offsets_bytes, nodes.len()).unwrap();

        let mut reader = SliceBitReader::new(&graph_bytes);
        reader.seek_bit(bit_offsets[2]).unwrap();
        let (outdegree, reference) = read_outdegree_and_reference(&mut reader, &flags, 2).unwrap();
        assert_eq!(outdegree, 3);
        assert_eq!(
            reference, 2,
            "on an exact cost tie the larger reference value (delta=2, referencing node 0) must win over delta=1"
        );

        let random = BvGraph::with_basename(&basename, LoadMode::Standard).unwrap();
        assert_eq!(random.successors(2).unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn concat_chunks_matches_single_compression() {
        use super::super::random_access::{BvGraph, LoadMode};

        let chunk_a: Vec<Vec<usize>> = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let chunk_b: Vec<Vec<usize>> = vec![vec![1], vec![]];

        let dir = tempfile::tempdir().unwrap();
        let base_a = dir.path().join("a");
        let base_b = dir.path().join("b");
        let base_out = dir.path().join("out");

        compress_to_basename(&base_a, CompFlags::default(), chunk_a.clone()).unwrap();
        compress_to_basename(&base_b, CompFlags::default(), chunk_b.clone()).unwrap();

        let stats = concat_chunks(&base_out, &[base_a, base_b], CompFlags::default()).unwrap();
        assert_eq!(stats.num_nodes, 5);
        assert_eq!(stats.num_arcs, 5);

        let random = BvGraph::with_basename(&base_out, LoadMode::Standard).unwrap();
        for node in 0..chunk_a.len() {
            assert_eq!(random.successors(node).unwrap(), chunk_a[node]);
        }
        for node in 0..chunk_b.len() {
            let shifted: Vec<usize> = chunk_b[node].iter().map(|&v| v + chunk_a.len()).collect();
            assert_eq!(random.successors(chunk_a.len() + node).unwrap(), shifted);
        }
    }
}
