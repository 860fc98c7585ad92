use std::io::Write;

use super::BitWrite;
use crate::error::Result;

/// A bit writer that streams completed bytes to an underlying [`Write`] as
/// soon as they fill up, rather than buffering the whole graph in memory.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    writer: W,
    current_byte: u8,
    bits_in_byte: u8,
    bit_pos: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current_byte: 0,
            bits_in_byte: 0,
            bit_pos: 0,
        }
    }

    /// Flushes any partial trailing byte (zero-padded) and returns the
    /// underlying writer along with the total number of bits written.
    pub fn finish(mut self) -> Result<(W, u64)> {
        if self.bits_in_byte > 0 {
            self.writer.write_all(&[self.current_byte])?;
        }
        self.writer.flush()?;
        Ok((self.writer, self.bit_pos))
    }
}

impl<W: Write> BitWrite for BitWriter<W> {
    #[inline]
    fn bit_pos(&self) -> u64 {
        self.bit_pos
    }

    #[inline]
    fn write_bit(&mut self, bit: u64) -> Result<()> {
        if bit != 0 {
            self.current_byte |= 1 << (7 - self.bits_in_byte);
        }
        self.bits_in_byte += 1;
        self.bit_pos += 1;
        if self.bits_in_byte == 8 {
            self.writer.write_all(&[self.current_byte])?;
            self.current_byte = 0;
            self.bits_in_byte = 0;
        }
        Ok(())
    }
}
