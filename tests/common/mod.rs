//! Hand-built FSFILE containers for tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use fsfreader::block::{BLOCK_SIZE, CHAIN_HEADER_SIZE, FILE_PATH_SIZE, PAYLOAD_SIZE};
use fsfreader::MAGIC;

pub const BASE_TIME: u32 = 1_600_000_000;

pub fn created_at(index_block: u32) -> u32 {
    BASE_TIME + index_block
}

pub fn modified_at(index_block: u32) -> u32 {
    BASE_TIME + index_block + 100
}

pub struct ContainerBuilder {
    list_start: u32,
    blocks:     BTreeMap<u32, Vec<u8>>,
}

fn chain_header(buf: &mut [u8], this: u32, prev: u32, next: u32, used: u16) {
    buf[0..4].copy_from_slice(&this.to_le_bytes());
    buf[4..8].copy_from_slice(&prev.to_le_bytes());
    buf[8..12].copy_from_slice(&next.to_le_bytes());
    buf[12..14].copy_from_slice(&used.to_le_bytes());
}

impl ContainerBuilder {
    pub fn new(list_start: u32) -> Self {
        Self { list_start, blocks: BTreeMap::new() }
    }

    /// Data block whose unused payload tail is filled with `0xEE`.
    pub fn data_block(&mut self, n: u32, prev: u32, next: u32, payload: &[u8]) -> &mut Self {
        assert!(payload.len() <= PAYLOAD_SIZE);
        let mut buf = vec![0xEEu8; BLOCK_SIZE];
        chain_header(&mut buf, n, prev, next, payload.len() as u16);
        buf[CHAIN_HEADER_SIZE..CHAIN_HEADER_SIZE + payload.len()].copy_from_slice(payload);
        self.blocks.insert(n, buf);
        self
    }

    pub fn usage_block(
        &mut self,
        n:           u32,
        next:        u32,
        path:        &[u8],
        start_block: u32,
        size_blocks: u32,
        size_bytes:  u32,
    ) -> &mut Self {
        assert!(path.len() < FILE_PATH_SIZE);
        let mut buf = vec![0u8; BLOCK_SIZE];
        chain_header(&mut buf, n, 0, next, 0);
        buf[14..14 + path.len()].copy_from_slice(path);
        buf[274..278].copy_from_slice(&created_at(n).to_le_bytes());
        buf[278..282].copy_from_slice(&modified_at(n).to_le_bytes());
        buf[286..290].copy_from_slice(&start_block.to_le_bytes());
        buf[290..294].copy_from_slice(&size_blocks.to_le_bytes());
        buf[294..298].copy_from_slice(&size_bytes.to_le_bytes());
        self.blocks.insert(n, buf);
        self
    }

    /// Spread `content` over the data blocks listed in `chain` (in chain
    /// order) and describe it with a usage block at `index_block`.
    pub fn file(
        &mut self,
        index_block: u32,
        next_index:  u32,
        path:        &[u8],
        chain:       &[u32],
        content:     &[u8],
    ) -> &mut Self {
        let chunks: Vec<&[u8]> = if content.is_empty() {
            vec![&[][..]]
        } else {
            content.chunks(PAYLOAD_SIZE).collect()
        };
        assert_eq!(chunks.len(), chain.len(), "chain length must match content");
        for (i, chunk) in chunks.iter().enumerate() {
            let prev = if i == 0 { 0 } else { chain[i - 1] };
            let next = chain.get(i + 1).copied().unwrap_or(0);
            self.data_block(chain[i], prev, next, chunk);
        }
        self.usage_block(index_block, next_index, path, chain[0], chain.len() as u32, content.len() as u32)
    }

    /// Overwrite the self-number field of block `n`.
    pub fn set_self_number(&mut self, n: u32, fake: u32) -> &mut Self {
        let buf = self.blocks.get_mut(&n).expect("block exists");
        buf[0..4].copy_from_slice(&fake.to_le_bytes());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&self.list_start.to_le_bytes());
        let last = self.blocks.keys().next_back().copied().unwrap_or(0);
        for n in 0..=last {
            match self.blocks.get(&n) {
                Some(buf) => out.extend_from_slice(buf),
                None      => out.extend_from_slice(&[0u8; BLOCK_SIZE]),
            }
        }
        out
    }
}
