//! Fixed little-endian field decoding.
//!
//! Every on-disk structure of an FSFILE container stores its integers
//! little-endian, independent of the host.  All structure readers go through
//! [`read_u16`] / [`read_u32`] so the byte order lives in exactly one place,
//! and a short buffer surfaces as a [`CodecError`] instead of a panic.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("field at offset {offset} needs {needed} bytes, buffer holds {len}")]
    OutOfBounds { offset: usize, needed: usize, len: usize },
}

fn field(buf: &[u8], offset: usize, needed: usize) -> Result<&[u8], CodecError> {
    offset
        .checked_add(needed)
        .and_then(|end| buf.get(offset..end))
        .ok_or(CodecError::OutOfBounds { offset, needed, len: buf.len() })
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16, CodecError> {
    field(buf, offset, 2).map(LittleEndian::read_u16)
}

/// Read a little-endian `u32` at `offset`.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, CodecError> {
    field(buf, offset, 4).map(LittleEndian::read_u32)
}

/// Borrow `len` raw bytes at `offset`.
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], CodecError> {
    field(buf, offset, len)
}
