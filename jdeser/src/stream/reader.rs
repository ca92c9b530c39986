/*!
 Sequential reader for the fixed-width and length-prefixed primitives that make up a stream.

 All multi-byte values are big-endian. Text uses Java's modified UTF-8, where `NUL` is written as two
 bytes and supplementary characters are written as surrogate pairs of three bytes each.
*/

use crate::error::stream::JavaStreamError;

/// A cursor over the raw bytes of a serialization stream with one byte of lookahead
#[derive(Debug)]
pub struct ByteReader<'a> {
    /// The stream we want to read
    stream: &'a [u8],
    /// The current index we are at in the stream
    idx: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, idx: 0 }
    }

    /// The offset of the next byte that will be read
    pub fn position(&self) -> usize {
        self.idx
    }

    /// The number of bytes that have not been consumed yet
    pub fn remaining(&self) -> usize {
        self.stream.len().saturating_sub(self.idx)
    }

    /// Whether every byte of the stream has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.idx >= self.stream.len()
    }

    /// Look at the next byte without consuming it
    pub fn peek_byte(&self) -> Result<u8, JavaStreamError> {
        self.stream
            .get(self.idx)
            .copied()
            .ok_or(JavaStreamError::TruncatedStream(self.idx + 1, self.stream.len()))
    }

    /// Consume the next byte
    pub fn read_byte(&mut self) -> Result<u8, JavaStreamError> {
        let byte = self.peek_byte()?;
        self.idx += 1;
        Ok(byte)
    }

    /// Read exactly `n` bytes from the stream
    pub fn read_exact_bytes(&mut self, n: usize) -> Result<&'a [u8], JavaStreamError> {
        let end = self
            .idx
            .checked_add(n)
            .ok_or(JavaStreamError::TruncatedStream(usize::MAX, self.stream.len()))?;
        let range = self
            .stream
            .get(self.idx..end)
            .ok_or(JavaStreamError::TruncatedStream(end, self.stream.len()))?;
        self.idx = end;
        Ok(range)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], JavaStreamError> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_exact_bytes(N)?);
        Ok(out)
    }

    pub fn read_i8(&mut self) -> Result<i8, JavaStreamError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, JavaStreamError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, JavaStreamError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, JavaStreamError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, JavaStreamError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, JavaStreamError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, JavaStreamError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, JavaStreamError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, JavaStreamError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Zero is `false`, anything else is `true`
    pub fn read_bool(&mut self) -> Result<bool, JavaStreamError> {
        Ok(self.read_byte()? != 0)
    }

    /// Read text prefixed with a 16-bit byte length
    pub fn read_utf(&mut self) -> Result<String, JavaStreamError> {
        let length = self.read_u16()?;
        let start = self.idx;
        decode_modified_utf8(self.read_exact_bytes(length as usize)?, start)
    }

    /// Read text prefixed with a 64-bit byte length
    pub fn read_long_utf(&mut self) -> Result<String, JavaStreamError> {
        let at = self.idx;
        let length = self.read_i64()?;
        let length =
            usize::try_from(length).map_err(|_| JavaStreamError::InvalidLength(length, at))?;
        let start = self.idx;
        decode_modified_utf8(self.read_exact_bytes(length)?, start)
    }
}

/// Decode modified UTF-8 bytes found at `offset` in the stream
pub(crate) fn decode_modified_utf8(bytes: &[u8], offset: usize) -> Result<String, JavaStreamError> {
    if bytes.is_ascii() {
        return Ok(bytes.iter().map(|&byte| byte as char).collect());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let first = bytes[idx];
        match first >> 4 {
            0..=7 => {
                units.push(first as u16);
                idx += 1;
            }
            12 | 13 => {
                let second = continuation(bytes, idx + 1, offset)?;
                units.push(((first & 0x1F) as u16) << 6 | (second & 0x3F) as u16);
                idx += 2;
            }
            14 => {
                let second = continuation(bytes, idx + 1, offset)?;
                let third = continuation(bytes, idx + 2, offset)?;
                units.push(
                    ((first & 0x0F) as u16) << 12
                        | ((second & 0x3F) as u16) << 6
                        | (third & 0x3F) as u16,
                );
                idx += 3;
            }
            _ => return Err(JavaStreamError::InvalidUtf(offset + idx)),
        }
    }

    // Unpaired surrogates are legal in Java strings but not in Rust ones
    Ok(char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

fn continuation(bytes: &[u8], at: usize, offset: usize) -> Result<u8, JavaStreamError> {
    match bytes.get(at) {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(*byte),
        _ => Err(JavaStreamError::InvalidUtf(offset + at)),
    }
}
