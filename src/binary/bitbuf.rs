// MSB-first bit buffer and bit reader.
//
// All bit-packed value types in the wire format (timepoints, content ids,
// genres) are built on these two types. Bit order is big-endian within a
// byte: the first bit appended lands in bit 7 of byte 0.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BitError {
    #[error("read of {width} bits at offset {offset} exceeds buffer of {len} bits")]
    OutOfBounds {
        offset: usize,
        width: u32,
        len: usize,
    },
    #[error("bit width {0} exceeds 64")]
    WidthTooLarge(u32),
    #[error("value {value:#x} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: u32 },
}

// ---------------------------------------------------------------------------
// Append-only buffer
// ---------------------------------------------------------------------------

/// An ordered, appendable sequence of bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuf {
    bytes: Vec<u8>,
    /// Total length in bits; the trailing `len % 8` bits live in the high
    /// bits of the last byte.
    len: usize,
}

impl BitBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length in whole bytes, rounding up.
    pub fn byte_len(&self) -> usize {
        self.len.div_ceil(8)
    }

    fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Append `value` as a fixed-width big-endian unsigned integer.
    pub fn append_uint(&mut self, value: u64, width: u32) -> Result<(), BitError> {
        if width > 64 {
            return Err(BitError::WidthTooLarge(width));
        }
        if width < 64 && value >> width != 0 {
            return Err(BitError::ValueTooWide { value, width });
        }
        for i in (0..width).rev() {
            self.push_bit(value >> i & 1 != 0);
        }
        Ok(())
    }

    /// Append raw bytes (byte-aligned fast path when possible).
    pub fn append_bytes(&mut self, data: &[u8]) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(data);
            self.len += data.len() * 8;
        } else {
            for &byte in data {
                for i in (0..8).rev() {
                    self.push_bit(byte >> i & 1 != 0);
                }
            }
        }
    }

    /// Append another buffer, preserving its bit length.
    pub fn append(&mut self, other: &BitBuf) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
        } else {
            for i in 0..other.len {
                let byte = other.bytes[i / 8];
                self.push_bit(byte >> (7 - i % 8) & 1 != 0);
            }
        }
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn pad_to_byte(&mut self) {
        // Trailing bits of the last byte are already zero.
        self.len = self.byte_len() * 8;
    }

    /// The packed bytes. The final partial byte, if any, is zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Fixed-width integer reads over a byte slice, at arbitrary bit offsets.
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Read a fixed-width big-endian unsigned integer and advance.
    pub fn read_uint(&mut self, width: u32) -> Result<u64, BitError> {
        if width > 64 {
            return Err(BitError::WidthTooLarge(width));
        }
        if self.remaining() < width as usize {
            return Err(BitError::OutOfBounds {
                offset: self.pos,
                width,
                len: self.data.len() * 8,
            });
        }
        let mut value: u64 = 0;
        for _ in 0..width {
            let byte = self.data[self.pos / 8];
            let bit = byte >> (7 - self.pos % 8) & 1;
            value = value << 1 | u64::from(bit);
            self.pos += 1;
        }
        Ok(value)
    }

    /// Read a single flag bit.
    pub fn read_flag(&mut self) -> Result<bool, BitError> {
        Ok(self.read_uint(1)? != 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_uint_packs_msb_first() {
        let mut buf = BitBuf::new();
        buf.append_uint(0b101, 3).unwrap();
        buf.append_uint(0b11111, 5).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_bytes(), &[0b1011_1111]);
    }

    #[test]
    fn append_uint_rejects_wide_values() {
        let mut buf = BitBuf::new();
        assert_eq!(
            buf.append_uint(0x10, 4),
            Err(BitError::ValueTooWide {
                value: 0x10,
                width: 4
            })
        );
        assert_eq!(buf.append_uint(0, 65), Err(BitError::WidthTooLarge(65)));
    }

    #[test]
    fn pad_to_byte_rounds_up() {
        let mut buf = BitBuf::new();
        buf.append_uint(0b1, 1).unwrap();
        assert_eq!(buf.byte_len(), 1);
        buf.pad_to_byte();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_bytes(), &[0x80]);
        // Padding an aligned buffer is a no-op.
        buf.pad_to_byte();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn append_bytes_unaligned() {
        let mut buf = BitBuf::new();
        buf.append_uint(0b1111, 4).unwrap();
        buf.append_bytes(&[0x0F]);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.as_bytes(), &[0xF0, 0xF0]);
    }

    #[test]
    fn append_buf_preserves_bit_length() {
        let mut a = BitBuf::new();
        a.append_uint(0b10, 2).unwrap();
        let mut b = BitBuf::new();
        b.append_uint(0b01, 2).unwrap();
        a.append(&b);
        assert_eq!(a.len(), 4);
        assert_eq!(a.as_bytes(), &[0b1001_0000]);
    }

    #[test]
    fn reader_roundtrip() {
        let mut buf = BitBuf::new();
        buf.append_uint(0x1ABCD, 17).unwrap();
        buf.append_uint(0x3F, 6).unwrap();
        buf.append_uint(1, 1).unwrap();
        buf.pad_to_byte();

        let mut r = BitReader::new(buf.as_bytes());
        assert_eq!(r.read_uint(17).unwrap(), 0x1ABCD);
        assert_eq!(r.read_uint(6).unwrap(), 0x3F);
        assert!(r.read_flag().unwrap());
    }

    #[test]
    fn reader_detects_overrun() {
        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(r.read_uint(8).unwrap(), 0xFF);
        assert!(matches!(
            r.read_uint(1),
            Err(BitError::OutOfBounds { .. })
        ));
    }
}
