//! Program data decoding and encoding helpers
//!
//! Programs are densely packed big-endian fields with no padding. Every read
//! is bounds-checked against the buffer: running off the end is a
//! `TruncatedProgram` fault, never a read of whatever lies past it.

use alloy_primitives::{Address, B256, U256};

use crate::error::EngineError;
use crate::types::TOKEN_ID_LEN;

/// Largest field a program may carry
pub const MAX_FIELD_WIDTH: usize = 32;

#[inline]
fn field<'a>(data: &'a [u8], offset: usize, width: usize) -> Result<&'a [u8], EngineError> {
    let end = offset.checked_add(width).ok_or(EngineError::Overflow)?;
    if end > data.len() {
        return Err(EngineError::TruncatedProgram {
            offset,
            needed: end - data.len(),
        });
    }
    Ok(&data[offset..end])
}

/// Read a big-endian unsigned integer of `width` bytes (1..=32)
#[inline]
pub fn read_uint(data: &[u8], offset: usize, width: usize) -> Result<U256, EngineError> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return Err(EngineError::InvalidFieldWidth(width));
    }
    let bytes = field(data, offset, width)?;
    U256::try_from_be_slice(bytes).ok_or(EngineError::InvalidFieldWidth(width))
}

/// Read a u8
#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, EngineError> {
    Ok(field(data, offset, 1)?[0])
}

/// Read a big-endian u16
#[inline]
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16, EngineError> {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(field(data, offset, 2)?);
    Ok(u16::from_be_bytes(bytes))
}

/// Read a big-endian u64
#[inline]
pub fn read_u64(data: &[u8], offset: usize) -> Result<u64, EngineError> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(field(data, offset, 8)?);
    Ok(u64::from_be_bytes(bytes))
}

/// Read a big-endian u128 (the 16-byte amount field)
#[inline]
pub fn read_u128(data: &[u8], offset: usize) -> Result<u128, EngineError> {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(field(data, offset, 16)?);
    Ok(u128::from_be_bytes(bytes))
}

/// Read a 20-byte address
#[inline]
pub fn read_address(data: &[u8], offset: usize) -> Result<Address, EngineError> {
    Ok(Address::from_slice(field(data, offset, TOKEN_ID_LEN)?))
}

/// Read a full 32-byte word
#[inline]
pub fn read_word(data: &[u8], offset: usize) -> Result<B256, EngineError> {
    Ok(B256::from_slice(field(data, offset, 32)?))
}

/// Program reader with tracked cursor
///
/// The cursor only moves forward; a failed read leaves it where it was.
pub struct ProgramReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ProgramReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current cursor position
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left before the end of the program
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    #[inline]
    pub fn read_uint(&mut self, width: usize) -> Result<U256, EngineError> {
        let val = read_uint(self.data, self.offset, width)?;
        self.offset += width;
        Ok(val)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, EngineError> {
        let val = read_u8(self.data, self.offset)?;
        self.offset += 1;
        Ok(val)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, EngineError> {
        let val = read_u16(self.data, self.offset)?;
        self.offset += 2;
        Ok(val)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, EngineError> {
        let val = read_u64(self.data, self.offset)?;
        self.offset += 8;
        Ok(val)
    }

    #[inline]
    pub fn read_u128(&mut self) -> Result<u128, EngineError> {
        let val = read_u128(self.data, self.offset)?;
        self.offset += 16;
        Ok(val)
    }

    #[inline]
    pub fn read_address(&mut self) -> Result<Address, EngineError> {
        let val = read_address(self.data, self.offset)?;
        self.offset += TOKEN_ID_LEN;
        Ok(val)
    }

    #[inline]
    pub fn read_word(&mut self) -> Result<B256, EngineError> {
        let val = read_word(self.data, self.offset)?;
        self.offset += 32;
        Ok(val)
    }
}

/// Program writer, the inverse of [`ProgramReader`]
#[derive(Debug, Default, Clone)]
pub struct ProgramWriter {
    buf: Vec<u8>,
}

impl ProgramWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Write `value` as a `width`-byte big-endian field
    pub fn write_uint(&mut self, value: U256, width: usize) -> Result<&mut Self, EngineError> {
        if width == 0 || width > MAX_FIELD_WIDTH {
            return Err(EngineError::InvalidFieldWidth(width));
        }
        if value.bit_len() > width * 8 {
            return Err(EngineError::Overflow);
        }
        let bytes = value.to_be_bytes::<32>();
        self.buf.extend_from_slice(&bytes[MAX_FIELD_WIDTH - width..]);
        Ok(self)
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u128(&mut self, value: u128) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_address(&mut self, value: Address) -> &mut Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    pub fn write_word(&mut self, value: B256) -> &mut Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let data = [42u8, 0, 0, 0];
        assert_eq!(read_u8(&data, 0).unwrap(), 42);
        assert!(read_u8(&data, 4).is_err());
    }

    #[test]
    fn test_read_u16_big_endian() {
        let data = [0x12, 0x34, 0, 0];
        assert_eq!(read_u16(&data, 0).unwrap(), 0x1234);
        assert_eq!(
            read_u16(&data, 3),
            Err(EngineError::TruncatedProgram { offset: 3, needed: 1 })
        );
    }

    #[test]
    fn test_read_u128() {
        let mut data = [0u8; 16];
        data[15] = 0x01;
        data[0] = 0x80;
        assert_eq!(read_u128(&data, 0).unwrap(), (1u128 << 127) | 1);
        assert!(read_u128(&data, 1).is_err());
    }

    #[test]
    fn test_read_uint_widths() {
        let data: Vec<u8> = (1..=32).collect();
        assert_eq!(read_uint(&data, 0, 1).unwrap(), U256::from(1u8));
        assert_eq!(read_uint(&data, 0, 3).unwrap(), U256::from(0x010203u32));
        assert_eq!(
            read_uint(&data, 0, 32).unwrap(),
            U256::from_be_slice(&data)
        );
    }

    #[test]
    fn test_read_uint_rejects_bad_width() {
        let data = [0u8; 64];
        assert_eq!(read_uint(&data, 0, 0), Err(EngineError::InvalidFieldWidth(0)));
        assert_eq!(read_uint(&data, 0, 33), Err(EngineError::InvalidFieldWidth(33)));
    }

    #[test]
    fn test_read_address() {
        let mut data = [0u8; 21];
        data[1..].copy_from_slice(&[0xab; 20]);
        assert_eq!(read_address(&data, 1).unwrap(), Address::repeat_byte(0xab));
        assert!(read_address(&data, 2).is_err());
    }

    #[test]
    fn test_program_reader() {
        let data = [
            0x00, 0x04, // u16
            0xa5,       // u8
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, // u64
        ];

        let mut reader = ProgramReader::new(&data);
        assert_eq!(reader.remaining(), 11);

        assert_eq!(reader.read_u16().unwrap(), 4);
        assert_eq!(reader.offset(), 2);

        assert_eq!(reader.read_u8().unwrap(), 0xa5);
        assert_eq!(reader.read_u64().unwrap(), 42);
        assert!(reader.is_at_end());

        // Failed read does not move the cursor
        assert!(reader.read_u8().is_err());
        assert_eq!(reader.offset(), 11);
    }

    #[test]
    fn test_writer_matches_reader() {
        let mut writer = ProgramWriter::new();
        writer
            .write_u16(300)
            .write_address(Address::repeat_byte(0x11))
            .write_u128(u128::MAX)
            .write_uint(U256::from(0xbeefu32), 3)
            .unwrap();

        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 2 + 20 + 16 + 3);

        let mut reader = ProgramReader::new(&bytes);
        assert_eq!(reader.read_u16().unwrap(), 300);
        assert_eq!(reader.read_address().unwrap(), Address::repeat_byte(0x11));
        assert_eq!(reader.read_u128().unwrap(), u128::MAX);
        assert_eq!(reader.read_uint(3).unwrap(), U256::from(0xbeefu32));
    }

    #[test]
    fn test_writer_rejects_value_too_wide() {
        let mut writer = ProgramWriter::new();
        assert_eq!(
            writer.write_uint(U256::from(256u32), 1).err(),
            Some(EngineError::Overflow)
        );
        assert!(writer.is_empty());
    }
}
