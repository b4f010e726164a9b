//! Block-level access to an FSFILE container.
//!
//! [`FsfReader`] validates the header once, then serves numbered blocks by
//! seeking to `12 + 526 × n`.  Physical position carries no meaning: chains
//! are followed strictly through each block's `nextBlock` pointer.
//!
//! # Reader (index path)
//! See [`crate::index::build_index`], which walks the usage-block chain
//! through this reader.
//!
//! # Reader (file path)
//! [`FsfReader::extract_file`] follows one file's data chain for
//! `sizeBlocks` steps and concatenates `bytesUsed` bytes of every block.
//! Only the very first block of a chain is probed for the gzip signature.
//! A chain that leads back to a block it already produced is rejected, so a
//! file can never yield more payload than the container holds.

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

use crate::block::{block_offset, Block, BlockError, UsageBlock, BLOCK_SIZE, PAYLOAD_SIZE};
use crate::header::{Header, HeaderError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid block: {0}")]
    Block(#[from] BlockError),
    #[error("broken chain: requested block {expected}, found block {found}")]
    BrokenChain { expected: u32, found: u32 },
    #[error("chain ends at block {block} with {remaining} block(s) still expected")]
    ChainEnded { block: u32, remaining: u32 },
    #[error("data chain revisits block {block}")]
    Cycle { block: u32 },
}

/// Reconstructed content of one archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub data:       Vec<u8>,
    /// First data block opened with `1F 8B`.
    pub compressed: bool,
}

pub struct FsfReader<R: Read + Seek> {
    reader:     R,
    pub header: Header,
    verbose:    bool,
}

impl<R: Read + Seek> FsfReader<R> {
    pub fn new(reader: R) -> Result<Self, HeaderError> {
        Self::with_verbose(reader, false)
    }

    /// Open a container.  Fails hard on a bad magic tag; nothing past the
    /// header is read here.
    pub fn with_verbose(mut reader: R, verbose: bool) -> Result<Self, HeaderError> {
        reader.seek(SeekFrom::Start(0))?;
        let header = Header::read(&mut reader)?;
        if verbose {
            log::debug!("first index block: {}", header.list_start_block);
        }
        Ok(Self { reader, header, verbose })
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Read the raw 526-byte slot of block `block`.
    pub fn read_block_raw(&mut self, block: u32) -> io::Result<[u8; BLOCK_SIZE]> {
        self.reader.seek(SeekFrom::Start(block_offset(block)))?;
        let mut buf = [0u8; BLOCK_SIZE];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_block(&mut self, block: u32) -> Result<Block, StoreError> {
        let raw = self.read_block_raw(block)?;
        Ok(Block::parse(&raw)?)
    }

    /// Rebuild the content of `entry` by walking its data chain.
    pub fn extract_file(&mut self, entry: &UsageBlock) -> Result<ExtractedFile, StoreError> {
        let capacity = (entry.size_bytes as usize).min((entry.size_blocks as usize).saturating_mul(PAYLOAD_SIZE));
        let mut data = Vec::with_capacity(capacity);
        let mut compressed = false;
        let mut next = entry.start_block;
        let mut seen = HashSet::new();

        for i in 0..entry.size_blocks {
            if !seen.insert(next) {
                return Err(StoreError::Cycle { block: next });
            }
            let block = self.read_block(next)?;
            if block.chain.this_block != next {
                return Err(StoreError::BrokenChain { expected: next, found: block.chain.this_block });
            }
            if i == 0 {
                compressed = block.starts_with_gzip_magic();
            }
            if self.verbose {
                log::debug!(
                    "data block {} prev={} next={} used={} head={}",
                    block.chain.this_block,
                    block.chain.prev_block,
                    block.chain.next_block,
                    block.chain.bytes_used,
                    hex::encode(&block.payload()[..block.payload().len().min(8)]),
                );
            }
            data.extend_from_slice(block.payload());

            let remaining = entry.size_blocks - i - 1;
            if remaining > 0 && block.chain.next_block == 0 {
                return Err(StoreError::ChainEnded { block: next, remaining });
            }
            next = block.chain.next_block;
        }

        if data.len() != entry.size_bytes as usize {
            log::warn!(
                "chain at block {} yielded {} bytes, index records {} ({} blocks of up to {PAYLOAD_SIZE})",
                entry.start_block,
                data.len(),
                entry.size_bytes,
                entry.size_blocks,
            );
        }
        Ok(ExtractedFile { data, compressed })
    }
}
