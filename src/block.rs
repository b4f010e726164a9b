//! On-disk block layouts.
//!
//! ```text
//! Block      : thisBlock u32 | prevBlock u32 | nextBlock u32 | bytesUsed u16 | data [512]      = 526 B
//! UsageBlock : thisBlock u32 | prevBlock u32 | nextBlock u32 | bytesUsed u16
//!              | filePath [260] | created u32 | modified u32 | flags u32
//!              | startBlock u32 | sizeBlocks u32 | sizeBytes u32                              = 298 B
//! ```
//!
//! Every block of the container occupies a full 526-byte slot; a usage block
//! only interprets the first 298 bytes of its slot.  All integers are
//! little-endian.

use thiserror::Error;

use crate::codec::{read_bytes, read_u16, read_u32, CodecError};
use crate::header::HEADER_SIZE;

pub const BLOCK_SIZE:        usize = 526;
pub const CHAIN_HEADER_SIZE: usize = 14;
pub const PAYLOAD_SIZE:      usize = 512;
pub const USAGE_BLOCK_SIZE:  usize = 298;
pub const FILE_PATH_SIZE:    usize = 260;

/// First two bytes of a gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("truncated block: {0}")]
    Truncated(#[from] CodecError),
    #[error("block {block} claims {bytes_used} used bytes (capacity {PAYLOAD_SIZE})")]
    BytesUsedOverflow { block: u32, bytes_used: u16 },
}

/// Byte position of block `block` inside the container.
pub fn block_offset(block: u32) -> u64 {
    HEADER_SIZE as u64 + BLOCK_SIZE as u64 * u64::from(block)
}

/// The 14-byte link header shared by data and usage blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHeader {
    pub this_block: u32,
    pub prev_block: u32,
    pub next_block: u32,
    pub bytes_used: u16,
}

impl ChainHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            this_block: read_u32(buf, 0)?,
            prev_block: read_u32(buf, 4)?,
            next_block: read_u32(buf, 8)?,
            bytes_used: read_u16(buf, 12)?,
        })
    }
}

/// A data block: link header plus up to 512 payload bytes.
#[derive(Debug, Clone)]
pub struct Block {
    pub chain: ChainHeader,
    pub data:  [u8; PAYLOAD_SIZE],
}

impl Block {
    pub fn parse(buf: &[u8]) -> Result<Self, BlockError> {
        let chain = ChainHeader::parse(buf)?;
        if usize::from(chain.bytes_used) > PAYLOAD_SIZE {
            return Err(BlockError::BytesUsedOverflow {
                block:      chain.this_block,
                bytes_used: chain.bytes_used,
            });
        }
        let mut data = [0u8; PAYLOAD_SIZE];
        data.copy_from_slice(read_bytes(buf, CHAIN_HEADER_SIZE, PAYLOAD_SIZE)?);
        Ok(Self { chain, data })
    }

    /// The meaningful part of the payload (`bytesUsed` bytes).
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.chain.bytes_used)]
    }

    /// True when the raw payload opens with the gzip signature.
    pub fn starts_with_gzip_magic(&self) -> bool {
        self.data[..2] == GZIP_MAGIC
    }
}

/// An index entry describing one archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageBlock {
    pub chain:       ChainHeader,
    pub file_path:   [u8; FILE_PATH_SIZE],
    pub created:     u32,
    pub modified:    u32,
    pub flags:       u32,
    pub start_block: u32,
    pub size_blocks: u32,
    pub size_bytes:  u32,
}

impl UsageBlock {
    pub fn parse(buf: &[u8]) -> Result<Self, CodecError> {
        let chain = ChainHeader::parse(buf)?;
        let mut file_path = [0u8; FILE_PATH_SIZE];
        file_path.copy_from_slice(read_bytes(buf, CHAIN_HEADER_SIZE, FILE_PATH_SIZE)?);
        Ok(Self {
            chain,
            file_path,
            created:     read_u32(buf, 274)?,
            modified:    read_u32(buf, 278)?,
            flags:       read_u32(buf, 282)?,
            start_block: read_u32(buf, 286)?,
            size_blocks: read_u32(buf, 290)?,
            size_bytes:  read_u32(buf, 294)?,
        })
    }

    /// Stored path bytes up to the first NUL (the whole field if unterminated).
    pub fn path_bytes(&self) -> &[u8] {
        let end = self.file_path.iter().position(|&b| b == 0).unwrap_or(FILE_PATH_SIZE);
        &self.file_path[..end]
    }
}
