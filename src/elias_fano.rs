//! A succinct, monotone, `u64`-valued sequence supporting `O(1)`-ish
//! (constant up to a small sampled scan) random access via an Elias-Fano
//! representation.
//!
//! This backs the random-access offset index (spec §4.4): once the
//! gap-coded `.offsets` file has been decoded into a plain array of bit
//! offsets, it is re-encoded here so that `offset(u)` for an arbitrary `u`
//! can be fetched without scanning the whole array.
//!
//! The representation splits each value into high and low bits. The low bits
//! are stored in a fixed-width bit-packed array; the high bits are stored
//! implicitly as a bitvector (a "unary" stream of gaps between consecutive
//! high parts) with a sampled select index for fast lookup.

/// How many set bits separate consecutive entries of the select inventory.
/// A larger value uses less memory for the inventory but makes each
/// [`EliasFano::get`] scan further in the worst case.
const SELECT_SAMPLE: usize = 64;

#[derive(Debug, Clone)]
struct BitFieldVec {
    words: Vec<u64>,
    width: u32,
}

impl BitFieldVec {
    fn new(width: u32, len: usize) -> Self {
        let total_bits = width as u64 * len as u64;
        let n_words = (total_bits as usize).div_ceil(64) + 1;
        Self {
            words: vec![0; n_words],
            width,
        }
    }

    fn mask(&self) -> u64 {
        if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    fn set(&mut self, i: usize, value: u64) {
        if self.width == 0 {
            return;
        }
        let value = value & self.mask();
        let bit_pos = i as u64 * self.width as u64;
        let word = (bit_pos / 64) as usize;
        let off = bit_pos % 64;
        self.words[word] |= value << off;
        if off + self.width as u64 > 64 {
            self.words[word + 1] |= value >> (64 - off);
        }
    }

    fn get(&self, i: usize) -> u64 {
        if self.width == 0 {
            return 0;
        }
        let bit_pos = i as u64 * self.width as u64;
        let word = (bit_pos / 64) as usize;
        let off = bit_pos % 64;
        let mut value = self.words[word] >> off;
        if off + self.width as u64 > 64 {
            value |= self.words[word + 1] << (64 - off);
        }
        value & self.mask()
    }
}

#[derive(Debug, Clone)]
struct BitVec {
    words: Vec<u64>,
    len_bits: u64,
}

impl BitVec {
    fn new(len_bits: u64) -> Self {
        let n_words = (len_bits as usize).div_ceil(64).max(1);
        Self {
            words: vec![0; n_words],
            len_bits,
        }
    }

    #[inline]
    fn set(&mut self, pos: u64) {
        debug_assert!(pos < self.len_bits);
        let w = (pos / 64) as usize;
        let b = pos % 64;
        self.words[w] |= 1 << b;
    }

    #[inline]
    fn get(&self, pos: u64) -> bool {
        let w = (pos / 64) as usize;
        let b = pos % 64;
        (self.words[w] >> b) & 1 == 1
    }
}

/// Incrementally builds an [`EliasFano`] sequence from values pushed in
/// non-decreasing order, mirroring how the offset index is streamed in from
/// `.offsets` at load time (spec §4.4, step 1).
pub struct EliasFanoBuilder {
    low: BitFieldVec,
    low_bits: u32,
    high: BitVec,
    len: usize,
    universe: u64,
    count: usize,
    last: u64,
}

impl EliasFanoBuilder {
    /// `len` is the number of values that will be pushed; `universe` is an
    /// upper bound (inclusive) on the largest value.
    pub fn new(len: usize, universe: u64) -> Self {
        let low_bits = if len > 0 && universe >= len as u64 {
            (universe / len as u64).ilog2()
        } else {
            0
        };
        let high_bits_len = len as u64 + (universe >> low_bits) + 1;
        Self {
            low: BitFieldVec::new(low_bits, len),
            low_bits,
            high: BitVec::new(high_bits_len),
            len,
            universe,
            count: 0,
            last: 0,
        }
    }

    /// Appends the next value. Values must be pushed in non-decreasing order.
    pub fn push(&mut self, value: u64) {
        assert!(
            self.count == 0 || value >= self.last,
            "EliasFanoBuilder requires a non-decreasing sequence"
        );
        assert!(self.count < self.len, "pushed more values than declared");
        assert!(value <= self.universe, "value exceeds declared universe");

        let low_mask = if self.low_bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.low_bits) - 1
        };
        self.low.set(self.count, value & low_mask);
        let high = value >> self.low_bits;
        self.high.set(high + self.count as u64);

        self.last = value;
        self.count += 1;
    }

    /// Consumes the builder, building the select inventory needed for
    /// constant-time lookup.
    pub fn build(self) -> EliasFano {
        assert_eq!(self.count, self.len, "not all declared values were pushed");

        let mut samples = Vec::with_capacity(self.len / SELECT_SAMPLE + 1);
        let mut ones_seen = 0usize;
        for pos in 0..self.high.len_bits {
            if self.high.get(pos) {
                if ones_seen % SELECT_SAMPLE == 0 {
                    samples.push(pos);
                }
                ones_seen += 1;
            }
        }

        EliasFano {
            low: self.low,
            low_bits: self.low_bits,
            high: self.high,
            samples,
            len: self.len,
        }
    }
}

/// A read-only succinct monotone sequence. See the module documentation.
#[derive(Debug, Clone)]
pub struct EliasFano {
    low: BitFieldVec,
    low_bits: u32,
    high: BitVec,
    samples: Vec<u64>,
    len: usize,
}

impl EliasFano {
    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the position of the `rank`-th (0-indexed) set bit in `high`.
    fn select(&self, rank: usize) -> u64 {
        let block = rank / SELECT_SAMPLE;
        let mut pos = self.samples[block];
        let mut remaining = rank % SELECT_SAMPLE;
        if remaining == 0 {
            return pos;
        }
        loop {
            pos += 1;
            if self.high.get(pos) {
                remaining -= 1;
                if remaining == 0 {
                    return pos;
                }
            }
        }
    }

    /// Returns the `i`-th value of the sequence, `i < self.len()`.
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.len);
        let pos = self.select(i);
        let high_part = pos - i as u64;
        let low_part = self.low.get(i);
        (high_part << self.low_bits) | low_part
    }

    /// Serializes the structure to a flat, self-contained byte buffer
    /// (the `<basename>.ef` artifact of spec's supplemented features).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        out.extend_from_slice(&(self.low_bits as u64).to_le_bytes());
        out.extend_from_slice(&(self.high.len_bits).to_le_bytes());
        out.extend_from_slice(&(self.low.words.len() as u64).to_le_bytes());
        for w in &self.low.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.extend_from_slice(&(self.high.words.len() as u64).to_le_bytes());
        for w in &self.high.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.extend_from_slice(&(self.samples.len() as u64).to_le_bytes());
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    /// Deserializes a buffer produced by [`Self::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> crate::error::Result<Self> {
        let corrupt = || crate::error::Error::Corrupt {
            node: 0,
            reason: "truncated .ef file".into(),
        };
        let mut cursor = 0usize;
        let mut read_u64 = |data: &[u8]| -> crate::error::Result<u64> {
            let bytes = data.get(cursor..cursor + 8).ok_or_else(corrupt)?;
            cursor += 8;
            Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
        };

        let len = read_u64(data)? as usize;
        let low_bits = read_u64(data)? as u32;
        let high_len_bits = read_u64(data)?;
        let n_low_words = read_u64(data)? as usize;
        let mut low_words = Vec::with_capacity(n_low_words);
        for _ in 0..n_low_words {
            low_words.push(read_u64(data)?);
        }
        let n_high_words = read_u64(data)? as usize;
        let mut high_words = Vec::with_capacity(n_high_words);
        for _ in 0..n_high_words {
            high_words.push(read_u64(data)?);
        }
        let n_samples = read_u64(data)? as usize;
        let mut samples = Vec::with_capacity(n_samples);
        for _ in 0..n_samples {
            samples.push(read_u64(data)?);
        }

        Ok(EliasFano {
            low: BitFieldVec {
                words: low_words,
                width: low_bits,
            },
            low_bits,
            high: BitVec {
                words: high_words,
                len_bits: high_len_bits,
            },
            samples,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(values: &[u64]) -> EliasFano {
        let universe = *values.last().unwrap_or(&0);
        let mut b = EliasFanoBuilder::new(values.len(), universe);
        for &v in values {
            b.push(v);
        }
        b.build()
    }

    #[test]
    fn roundtrip_small() {
        let values = [0u64, 0, 3, 3, 7, 10, 10, 10, 42];
        let ef = build(&values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.get(i), v, "mismatch at {i}");
        }
    }

    #[test]
    fn roundtrip_dense_sequence() {
        let values: Vec<u64> = (0..2000u64).map(|x| x * 3).collect();
        let ef = build(&values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.get(i), v);
        }
    }

    #[test]
    fn serialize_roundtrip() {
        let values = [0u64, 5, 5, 9, 1000, 1000, 1001];
        let ef = build(&values);
        let bytes = ef.to_bytes();
        let ef2 = EliasFano::from_bytes(&bytes).unwrap();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef2.get(i), v);
        }
    }

    #[test]
    fn empty_sequence() {
        let ef = build(&[]);
        assert_eq!(ef.len(), 0);
    }
}
