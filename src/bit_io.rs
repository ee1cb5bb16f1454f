//! Bit-level I/O.
//!
//! Bits are packed LSB-first: the first bit written lands in bit 0 of the
//! first byte. The core only ever appends to a [`BitWriter`]; byte alignment
//! and the final flush belong to the owner of the writer.

use crate::error::{Error, Result};

/// Maximum number of bits accepted by a single [`BitWriter::write_bits`] call.
pub const MAX_BITS_PER_CALL: u32 = 56;

/// Append-only bit writer.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    buffer: Vec<u8>,
    acc: u64,
    acc_bits: u32,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with `capacity` bytes preallocated.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Appends the low `count` bits of `bits`.
    ///
    /// `count` must not exceed [`MAX_BITS_PER_CALL`]; higher bits of `bits`
    /// are ignored.
    #[inline]
    pub fn write_bits(&mut self, bits: u64, count: u32) {
        debug_assert!(count <= MAX_BITS_PER_CALL);
        if count == 0 {
            return;
        }
        let masked = bits & ((1u64 << count) - 1);
        self.acc |= masked << self.acc_bits;
        self.acc_bits += count;
        while self.acc_bits >= 8 {
            self.buffer.push(self.acc as u8);
            self.acc >>= 8;
            self.acc_bits -= 8;
        }
    }

    /// Appends a single bit.
    #[inline]
    pub fn write_bool(&mut self, bit: bool) {
        self.write_bits(u64::from(bit), 1);
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.buffer.len() * 8 + self.acc_bits as usize
    }

    /// Pads the pending partial byte with zeros.
    pub fn zero_pad_to_byte(&mut self) {
        if self.acc_bits > 0 {
            self.buffer.push(self.acc as u8);
            self.acc = 0;
            self.acc_bits = 0;
        }
    }

    /// Flushes and returns the written bytes.
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.zero_pad_to_byte();
        self.buffer
    }
}

/// Reader for streams produced by [`BitWriter`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads `count` bits (at most 32 per call).
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(0);
        }
        if self.pos + count as usize > self.data.len() * 8 {
            return Err(Error::UnexpectedEof);
        }
        let mut value = 0u64;
        let mut got = 0u32;
        while got < count {
            let byte = self.data[self.pos / 8];
            let offset = (self.pos % 8) as u32;
            let take = (8 - offset).min(count - got);
            let chunk = (u64::from(byte) >> offset) & ((1u64 << take) - 1);
            value |= chunk << got;
            got += take;
            self.pos += take as usize;
        }
        Ok(value as u32)
    }

    /// Reads a single bit.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Number of bits consumed so far.
    #[must_use]
    pub fn bits_read(&self) -> usize {
        self.pos
    }
}

/// Writes `value` as a 6-bit length followed by the bits below its top bit.
pub(crate) fn write_var_u32(writer: &mut BitWriter, value: u32) {
    let len = 32 - value.leading_zeros();
    writer.write_bits(u64::from(len), 6);
    if len > 1 {
        writer.write_bits(u64::from(value), len - 1);
    }
}

/// Inverse of [`write_var_u32`].
pub(crate) fn read_var_u32(reader: &mut BitReader<'_>) -> Result<u32> {
    let len = reader.read_bits(6)?;
    match len {
        0 => Ok(0),
        1 => Ok(1),
        2..=32 => {
            let low = reader.read_bits(len - 1)?;
            Ok((1u32 << (len - 1)) | low)
        }
        _ => Err(Error::InvalidStream("varint length above 32")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lsb_first_packing() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1);
        writer.write_bits(0b10, 2);
        writer.write_bits(0b11111, 5);
        assert_eq!(writer.into_bytes(), vec![0b1111_1101]);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0xAB];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(4).unwrap(), 0xB);
        assert!(matches!(reader.read_bits(5), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_var_u32_extremes() {
        let mut writer = BitWriter::new();
        for v in [0u32, 1, 2, 3, 255, u32::MAX] {
            write_var_u32(&mut writer, v);
        }
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        for v in [0u32, 1, 2, 3, 255, u32::MAX] {
            assert_eq!(read_var_u32(&mut reader).unwrap(), v);
        }
    }

    proptest! {
        #[test]
        fn prop_bits_roundtrip(fields in prop::collection::vec((any::<u32>(), 0u32..=32), 0..64)) {
            let mut writer = BitWriter::new();
            for &(v, n) in &fields {
                writer.write_bits(u64::from(v), n);
            }
            let total = writer.bits_written();
            prop_assert_eq!(total, fields.iter().map(|&(_, n)| n as usize).sum::<usize>());
            let bytes = writer.into_bytes();
            let mut reader = BitReader::new(&bytes);
            for &(v, n) in &fields {
                let mask = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
                prop_assert_eq!(reader.read_bits(n).unwrap(), v & mask);
            }
        }
    }
}
