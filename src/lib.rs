pub mod codec;
pub mod header;
pub mod block;
pub mod io_stream;
pub mod index;
pub mod expand;
pub mod recode;
pub mod manifest;
pub mod crypto;
pub mod archive;

pub use header::{Header, HEADER_SIZE, MAGIC};
pub use block::{block_offset, Block, ChainHeader, UsageBlock, BLOCK_SIZE};
pub use index::{build_index, FileIndex, IndexEnd};
pub use io_stream::{ExtractedFile, FsfReader};
pub use archive::{ExtractOptions, ExtractReport, Extractor};
pub use crypto::Scramble;
