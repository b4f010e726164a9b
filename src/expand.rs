//! In-place gzip expansion of extracted files.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("gzip stream in {path} is invalid: {source}")]
    Gzip { path: String, source: io::Error },
}

/// Replaces a file with its decompressed content.
pub trait Decompressor {
    fn decompress(&self, path: &Path) -> Result<(), ExpandError>;
}

/// Gzip decompressor.  The file is only rewritten once the whole stream
/// decoded, so a failure leaves it byte-for-byte as extracted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipExpander;

impl Decompressor for GzipExpander {
    fn decompress(&self, path: &Path) -> Result<(), ExpandError> {
        let packed = fs::read(path)?;
        let mut unpacked = Vec::with_capacity(packed.len().saturating_mul(4));
        MultiGzDecoder::new(&packed[..])
            .read_to_end(&mut unpacked)
            .map_err(|source| ExpandError::Gzip { path: path.display().to_string(), source })?;
        fs::write(path, unpacked)?;
        Ok(())
    }
}
