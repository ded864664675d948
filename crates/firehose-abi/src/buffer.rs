//! Byte cursor and writer for the Antelope binary format.
//!
//! `SerialBuffer` reads primitives from a borrowed slice and advances its
//! position by each primitive's encoded width. A read that needs more bytes
//! than remain fails with `BufferUnderrun` and leaves the cursor untouched.
//! `SerialWriter` is the mirror image used by the reference encoder.

use crate::name::{name_to_string, string_to_name, NameError};
use firehose_core::error::DecodeError;

/// Read cursor over a binary buffer.
#[derive(Debug, Clone)]
pub struct SerialBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SerialBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Bytes consumed between `start` and the current position.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start.min(self.pos)..self.pos]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::BufferUnderrun {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    pub fn read_i128(&mut self) -> Result<i128, DecodeError> {
        Ok(i128::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// LEB128-encoded unsigned 32-bit integer (at most 5 bytes).
    pub fn read_varuint32(&mut self) -> Result<u32, DecodeError> {
        let start = self.pos;
        let mut value: u64 = 0;
        for i in 0..5 {
            let byte = match self.read_u8() {
                Ok(b) => b,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            };
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| DecodeError::InvalidValue {
                    offset: start,
                    reason: "varuint32 overflows 32 bits".into(),
                });
            }
        }
        Err(DecodeError::InvalidValue {
            offset: start,
            reason: "varuint32 longer than 5 bytes".into(),
        })
    }

    /// Zig-zag encoded signed 32-bit integer.
    pub fn read_varint32(&mut self) -> Result<i32, DecodeError> {
        let v = self.read_varuint32()?;
        Ok(((v >> 1) as i32) ^ -((v & 1) as i32))
    }

    /// 8-byte little-endian packed name.
    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        Ok(name_to_string(self.read_u64()?))
    }

    /// 8-byte **big-endian** unsigned key, rendered in decimal.
    pub fn read_primary_key(&mut self) -> Result<String, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array()?).to_string())
    }

    /// varuint32 length prefix followed by that many bytes.
    pub fn read_blob(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let len = self.read_varuint32()? as usize;
        self.read_bytes(len).map_err(|e| {
            self.pos = start;
            e
        })
    }

    /// Length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let bytes = self.read_blob()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::InvalidValue {
            offset: start,
            reason: format!("invalid UTF-8 string: {e}"),
        })
    }
}

/// Append-only writer producing the Antelope binary format.
#[derive(Debug, Clone, Default)]
pub struct SerialWriter {
    buf: Vec<u8>,
}

impl SerialWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn push_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn push_u16(&mut self, v: u16) {
        self.push_bytes(&v.to_le_bytes());
    }

    pub fn push_u32(&mut self, v: u32) {
        self.push_bytes(&v.to_le_bytes());
    }

    pub fn push_u64(&mut self, v: u64) {
        self.push_bytes(&v.to_le_bytes());
    }

    pub fn push_u128(&mut self, v: u128) {
        self.push_bytes(&v.to_le_bytes());
    }

    pub fn push_varuint32(&mut self, mut v: u32) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn push_varint32(&mut self, v: i32) {
        self.push_varuint32(((v << 1) ^ (v >> 31)) as u32);
    }

    pub fn push_name(&mut self, name: &str) -> Result<(), NameError> {
        self.push_u64(string_to_name(name)?);
        Ok(())
    }

    pub fn push_primary_key(&mut self, key: u64) {
        self.push_bytes(&key.to_be_bytes());
    }

    /// Length-prefixed bytes. Blobs longer than `u32::MAX` are not representable.
    pub fn push_blob(&mut self, bytes: &[u8]) {
        self.push_varuint32(bytes.len() as u32);
        self.push_bytes(bytes);
    }

    pub fn push_string(&mut self, s: &str) {
        self.push_blob(s.as_bytes());
    }
}
