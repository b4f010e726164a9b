use std::collections::HashSet;
use std::io::{Read, Seek};

use chrono::DateTime;

use crate::block::{BlockError, ChainHeader, UsageBlock};
use crate::io_stream::{FsfReader, StoreError};

/// Why the index walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEnd {
    /// A zero `nextBlock` pointer was reached.
    Complete,
    /// The block at `requested` reported itself as `found`.
    BrokenLink { requested: u32, found: u32 },
    /// The chain led back to an already visited block.
    Cycle { block: u32 },
}

impl IndexEnd {
    pub fn is_truncated(&self) -> bool {
        !matches!(self, IndexEnd::Complete)
    }
}

/// Usage blocks in the order the index chain yielded them.
#[derive(Debug, Clone)]
pub struct FileIndex {
    pub entries: Vec<UsageBlock>,
    pub end:     IndexEnd,
}

impl FileIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk the index chain starting at the header's `list_start_block`.
///
/// A block whose self-number differs from the number it was read at ends the
/// walk without failing; whatever was collected so far is returned and
/// [`FileIndex::end`] records the truncation.  Read errors are fatal.
pub fn build_index<R: Read + Seek>(reader: &mut FsfReader<R>) -> Result<FileIndex, StoreError> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut next = reader.header.list_start_block;
    let mut end = IndexEnd::Complete;

    while next > 0 {
        if !seen.insert(next) {
            log::warn!("index chain revisits block {next}; stopping");
            end = IndexEnd::Cycle { block: next };
            break;
        }

        let raw = reader.read_block_raw(next)?;
        let chain = ChainHeader::parse(&raw).map_err(BlockError::from)?;
        if chain.this_block != next {
            log::warn!(
                "no valid index block at {next} (block reports {}); keeping {} entr{}",
                chain.this_block,
                entries.len(),
                if entries.len() == 1 { "y" } else { "ies" },
            );
            end = IndexEnd::BrokenLink { requested: next, found: chain.this_block };
            break;
        }

        let usage = UsageBlock::parse(&raw).map_err(BlockError::from)?;
        if reader.verbose() {
            log_usage_block(&usage);
        }
        entries.push(usage);
        next = chain.next_block;
    }

    Ok(FileIndex { entries, end })
}

/// Render a stored `time_t` the way the listing shows it.
pub fn format_timestamp(ts: u32) -> String {
    DateTime::from_timestamp(i64::from(ts), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn log_usage_block(ub: &UsageBlock) {
    log::debug!(
        "index block {} prev={} next={} path={:?}",
        ub.chain.this_block,
        ub.chain.prev_block,
        ub.chain.next_block,
        String::from_utf8_lossy(ub.path_bytes()),
    );
    log::debug!(
        "  created={} modified={} flags={:#x} start={} blocks={} bytes={}",
        format_timestamp(ub.created),
        format_timestamp(ub.modified),
        ub.flags,
        ub.start_block,
        ub.size_blocks,
        ub.size_bytes,
    );
}
