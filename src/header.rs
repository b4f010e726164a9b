use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};
use thiserror::Error;

/// File identification tag at offset 0 of every container.
pub const MAGIC: &[u8; 8] = b"\0FSFILE\0";
/// Header length; block 0 starts right after it.
pub const HEADER_SIZE: usize = 12;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("not an FSFILE container (magic {})", hex::encode(.0))]
    InvalidMagic([u8; 8]),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The 12-byte container header: magic tag plus the head of the index chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub list_start_block: u32,
}

impl Header {
    pub fn read<R: Read>(mut reader: R) -> Result<Self, HeaderError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }
        let list_start_block = reader.read_u32::<LittleEndian>()?;
        Ok(Self { magic, list_start_block })
    }
}
