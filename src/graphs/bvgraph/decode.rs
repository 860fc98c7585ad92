//! The successor-list decoder: spec §4.3's state machine S0-S5.
//!
//! [`decode_record`] is shared by both access modes (spec §4.5); the only
//! difference between them is *how* a reference node's list is obtained —
//! random access recurses through the offset index with a depth cap,
//! sequential access looks it up in a ring-buffer cache — which is why that
//! part is a caller-supplied closure rather than baked in here.

use super::masked_iter::MaskedIter;
use crate::bits::{BitRead, BitReadCode, nat_to_int};
use crate::error::{Error, Result};
use crate::properties::CompFlags;

/// Reads Block A (outdegree) and, if present, the reference part of Block B
/// (the reference offset itself — the copy-block list is read separately by
/// [`read_copy_block`] once the reference's list is known).
pub fn read_outdegree_and_reference<R: BitRead>(
    reader: &mut R,
    flags: &CompFlags,
    node: usize,
) -> Result<(usize, usize)> {
    let outdegree = reader.read_code(flags.outdegrees)? as usize;
    if outdegree == 0 {
        return Ok((0, 0));
    }
    if flags.compression_window == 0 {
        return Ok((outdegree, 0));
    }
    let reference = reader.read_code(flags.references)? as usize;
    if reference > flags.compression_window || reference > node {
        return Err(Error::Corrupt {
            node,
            reason: format!(
                "reference {reference} exceeds window size {} or node index",
                flags.compression_window
            ),
        });
    }
    Ok((outdegree, reference))
}

/// Reads the copy-block list (the alternating run lengths of Block B),
/// spec §4.3.
pub fn read_copy_block<R: BitRead>(reader: &mut R, flags: &CompFlags) -> Result<Vec<usize>> {
    let block_count = reader.read_code(flags.blocks)? as usize;
    let mut blocks = Vec::with_capacity(block_count);
    for i in 0..block_count {
        let v = reader.read_code(flags.blocks)? as usize;
        blocks.push(if i == 0 { v } else { v + 1 });
    }
    Ok(blocks)
}

/// Reads Block C (the interval list).
pub fn read_intervals<R: BitRead>(
    reader: &mut R,
    flags: &CompFlags,
    node: usize,
) -> Result<Vec<(usize, usize)>> {
    let count = reader.read_code(flags.intervals)? as usize;
    let mut intervals = Vec::with_capacity(count);
    let mut prev_end_exclusive: i64 = 0;
    for i in 0..count {
        let left = if i == 0 {
            let nat = reader.read_code(flags.intervals)?;
            node as i64 + nat_to_int(nat)
        } else {
            let gap = reader.read_code(flags.intervals)? as i64;
            prev_end_exclusive + 1 + gap
        };
        if left < 0 {
            return Err(Error::Corrupt {
                node,
                reason: "interval left extreme is negative".into(),
            });
        }
        let len = reader.read_code(flags.intervals)? as usize + flags.min_interval_length;
        intervals.push((left as usize, len));
        prev_end_exclusive = left + len as i64;
    }
    Ok(intervals)
}

/// Reads Block D (the residual gap list), given the already-known count.
pub fn read_residuals<R: BitRead>(
    reader: &mut R,
    flags: &CompFlags,
    node: usize,
    count: usize,
) -> Result<Vec<usize>> {
    let mut residuals = Vec::with_capacity(count);
    let mut prev: i64 = 0;
    for i in 0..count {
        let value = if i == 0 {
            let nat = reader.read_code(flags.residuals)?;
            node as i64 + nat_to_int(nat)
        } else {
            let gap = reader.read_code(flags.residuals)? as i64;
            prev + 1 + gap
        };
        if value < 0 || (i > 0 && value <= prev) {
            return Err(Error::Corrupt {
                node,
                reason: "residual cursor is not strictly increasing".into(),
            });
        }
        residuals.push(value as usize);
        prev = value;
    }
    Ok(residuals)
}

/// Three-way merges the copied subset, the expanded intervals, and the
/// residuals into the final strictly increasing successor list (spec §4.3,
/// "decoding symmetry").
pub fn merge_successors(
    copied: Vec<usize>,
    intervals: &[(usize, usize)],
    residuals: Vec<usize>,
    node: usize,
) -> Result<Vec<usize>> {
    let expanded: Vec<usize> = intervals.iter().flat_map(|&(l, len)| l..l + len).collect();

    let mut out = Vec::with_capacity(copied.len() + expanded.len() + residuals.len());
    let mut a = copied.into_iter().peekable();
    let mut b = expanded.into_iter().peekable();
    let mut c = residuals.into_iter().peekable();
    loop {
        let candidates = [a.peek().copied(), b.peek().copied(), c.peek().copied()];
        let Some(min) = candidates.into_iter().flatten().min() else {
            break;
        };
        if a.peek() == Some(&min) {
            a.next();
        } else if b.peek() == Some(&min) {
            b.next();
        } else {
            c.next();
        }
        out.push(min);
    }

    for w in out.windows(2) {
        if w[0] >= w[1] {
            return Err(Error::Corrupt {
                node,
                reason: "decoded successor list is not strictly increasing".into(),
            });
        }
    }
    Ok(out)
}

/// Decodes node `node`'s successor list, given a way to resolve the
/// reference node's list (see module documentation).
pub fn decode_record<R: BitRead>(
    reader: &mut R,
    flags: &CompFlags,
    node: usize,
    mut resolve_ref: impl FnMut(usize) -> Result<Vec<usize>>,
) -> Result<Vec<usize>> {
    let (outdegree, reference) = read_outdegree_and_reference(reader, flags, node)?;
    if outdegree == 0 {
        return Ok(Vec::new());
    }

    let copied = if reference > 0 {
        let ref_list = resolve_ref(node - reference)?;
        let blocks = read_copy_block(reader, flags)?;
        MaskedIter::new(ref_list.into_iter(), blocks).collect::<Vec<_>>()
    } else {
        Vec::new()
    };
    if copied.len() > outdegree {
        return Err(Error::Corrupt {
            node,
            reason: "copy block copies more successors than the outdegree".into(),
        });
    }

    let extra_count = outdegree - copied.len();
    let (intervals, residual_count) = if extra_count > 0 && flags.min_interval_length != 0 {
        let intervals = read_intervals(reader, flags, node)?;
        let interval_total: usize = intervals.iter().map(|&(_, len)| len).sum();
        if interval_total > extra_count {
            return Err(Error::Corrupt {
                node,
                reason: "intervals cover more successors than are left to decode".into(),
            });
        }
        (intervals, extra_count - interval_total)
    } else {
        (Vec::new(), extra_count)
    };

    let residuals = if residual_count > 0 {
        read_residuals(reader, flags, node, residual_count)?
    } else {
        Vec::new()
    };

    let result = merge_successors(copied, &intervals, residuals, node)?;
    if result.len() != outdegree {
        return Err(Error::Corrupt {
            node,
            reason: format!(
                "decoded {} successors but outdegree declared {outdegree}",
                result.len()
            ),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{BitWrite, BitWriter};

    fn flags() -> CompFlags {
        CompFlags::default()
    }

    #[test]
    fn zero_outdegree_record() {
        let mut w = BitWriter::new(Vec::new());
        w.write_gamma(0).unwrap(); // outdegree
        let (bytes, _) = w.finish().unwrap();
        let mut r = crate::bits::SliceBitReader::new(bytes);
        let list = decode_record(&mut r, &flags(), 5, |_| unreachable!()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn plain_residuals_no_reference_no_intervals() {
        // node=0 with window > 0 still writes a reference field (value 0,
        // meaning "no reference"); only window == 0 omits it entirely.
        let mut w = BitWriter::new(Vec::new());
        w.write_gamma(3).unwrap(); // outdegree = 3
        w.write_unary(0).unwrap(); // reference = 0 (no reference)
        w.write_gamma(0).unwrap(); // 0 intervals
        // residuals: 1, 4, 10 (gaps from node 0: 1, then +2 (4-1-1), then +5 (10-4-1))
        w.write_zeta(crate::bits::int_to_nat(1), 3).unwrap();
        w.write_zeta(2, 3).unwrap();
        w.write_zeta(5, 3).unwrap();
        let (bytes, _) = w.finish().unwrap();
        let mut r = crate::bits::SliceBitReader::new(bytes);
        let list = decode_record(&mut r, &flags(), 0, |_| unreachable!()).unwrap();
        assert_eq!(list, vec![1, 4, 10]);
    }
}
