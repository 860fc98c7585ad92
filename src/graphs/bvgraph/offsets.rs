//! The `.offsets` artifact: γ-coded gaps between consecutive bit offsets
//! into `.graph` (spec §3, §4.4).

use std::io::Write;

use crate::bits::{BitRead, BitWrite, BitWriter, SliceBitReader};
use crate::elias_fano::{EliasFano, EliasFanoBuilder};
use crate::error::Result;

/// Streams `offset(0)=0, offset(1), ..., offset(N)` to a `.offsets`
/// bitstream as it is produced, one γ-coded gap at a time. Used by the
/// builder (spec §4.6, step 3).
pub struct OffsetsWriter<W: Write> {
    writer: BitWriter<W>,
    last_offset: u64,
}

impl<W: Write> OffsetsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BitWriter::new(writer),
            last_offset: 0,
        }
    }

    /// Pushes the next absolute bit offset (`offset(0)` must be `0`).
    pub fn push(&mut self, offset: u64) -> Result<()> {
        let gap = offset - self.last_offset;
        self.writer.write_gamma(gap)?;
        self.last_offset = offset;
        Ok(())
    }

    pub fn finish(self) -> Result<(W, u64)> {
        self.writer.finish()
    }
}

/// Streams the `.offsets` bitstream into a plain array of `N+1` absolute bit
/// offsets (spec §4.4 step 1).
pub fn decode_all<B: AsRef<[u8]>>(data: B, num_nodes: usize) -> Result<Vec<u64>> {
    let mut reader = SliceBitReader::new(data);
    let mut offsets = Vec::with_capacity(num_nodes + 1);
    let mut acc = 0u64;
    for _ in 0..=num_nodes {
        acc += reader.read_gamma()?;
        offsets.push(acc);
    }
    Ok(offsets)
}

/// Builds the succinct random-access offset index (spec §4.4 step 2) from a
/// decoded offset array.
pub fn build_elias_fano(offsets: &[u64]) -> EliasFano {
    let universe = *offsets.last().unwrap_or(&0);
    let mut builder = EliasFanoBuilder::new(offsets.len(), universe);
    for &o in offsets {
        builder.push(o);
    }
    builder.build()
}
