//! High-level extraction API, the primary embedding surface.
//!
//! ```no_run
//! use fsfreader::archive::{ExtractOptions, Extractor};
//!
//! let opts = ExtractOptions {
//!     output_dir: "panel".into(),
//!     reorganize: true,
//!     verbose:    false,
//! };
//! let report = Extractor::new(opts).extract_path("panel.tp4".as_ref())?;
//! println!("{} files written", report.written.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::block::UsageBlock;
use crate::expand::{Decompressor, GzipExpander};
use crate::header::{Header, HeaderError};
use crate::index::{build_index, FileIndex, IndexEnd};
use crate::io_stream::{FsfReader, StoreError};
use crate::manifest::{Category, Manifest, ManifestEntry, MANIFEST_FILE_NAME};
use crate::recode::cp1250_to_utf8;

// ── ExtractOptions ────────────────────────────────────────────────────────────

/// Configuration for [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Output root; created when missing.
    pub output_dir: PathBuf,
    /// Sort files into `images/`, `sounds/`, `fonts/` and write `manifest.xma`.
    pub reorganize: bool,
    /// Log every block walked at debug level.
    pub verbose:    bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            reorganize: false,
            verbose:    false,
        }
    }
}

// ── Errors / report ───────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("could not open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Header(#[from] HeaderError),
    #[error("reading index: {0}")]
    Index(#[from] StoreError),
    #[error("reading {name}: {source}")]
    Entry { name: String, source: StoreError },
    #[error("index entry {index} has no usable file name")]
    EmptyEntryName { index: usize },
    #[error("could not create directory {}: {source}", path.display())]
    CreateDirectory { path: PathBuf, source: io::Error },
    #[error("error opening target file {}: {source}", path.display())]
    CreateOutput { path: PathBuf, source: io::Error },
    #[error("error writing {}: {source}", path.display())]
    WriteOutput { path: PathBuf, source: io::Error },
    #[error("error writing manifest {}: {source}", path.display())]
    Manifest { path: PathBuf, source: io::Error },
}

/// Summary of one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractReport {
    /// Final location of every extracted file, in index order.
    pub written:             Vec<PathBuf>,
    pub index_end:           IndexEnd,
    /// Files that looked gzip-compressed but stayed as extracted.
    pub decompress_failures: usize,
    pub manifest:            Option<PathBuf>,
}

// ── Extractor ─────────────────────────────────────────────────────────────────

pub struct Extractor<D: Decompressor = GzipExpander> {
    opts:         ExtractOptions,
    decompressor: D,
}

impl Extractor<GzipExpander> {
    pub fn new(opts: ExtractOptions) -> Self {
        Self::with_decompressor(opts, GzipExpander)
    }
}

impl<D: Decompressor> Extractor<D> {
    pub fn with_decompressor(opts: ExtractOptions, decompressor: D) -> Self {
        Self { opts, decompressor }
    }

    pub fn extract_path(&self, input: &Path) -> Result<ExtractReport, ExtractError> {
        let file = File::open(input)
            .map_err(|source| ExtractError::Open { path: input.to_path_buf(), source })?;
        self.extract(BufReader::new(file))
    }

    /// Build the whole index, then write every entry below the output root.
    ///
    /// The first file that cannot be created or written aborts the pass.
    /// A failed gzip expansion only counts towards
    /// [`ExtractReport::decompress_failures`].
    pub fn extract<R: Read + Seek>(&self, reader: R) -> Result<ExtractReport, ExtractError> {
        let mut fsf = FsfReader::with_verbose(reader, self.opts.verbose)?;
        let index = build_index(&mut fsf)?;
        log::info!("index holds {} file(s)", index.len());

        ensure_directory(&self.opts.output_dir)?;
        let mut manifest = self.opts.reorganize.then(Manifest::new);
        let mut written = Vec::with_capacity(index.len());
        let mut decompress_failures = 0;

        for (i, entry) in index.entries.iter().enumerate() {
            let target = self.target_for(i, entry)?;
            if let Some(parent) = target.path.parent() {
                ensure_directory(parent)?;
            }

            log::info!("Writing file {}", target.path.display());
            let mut out = File::create(&target.path)
                .map_err(|source| ExtractError::CreateOutput { path: target.path.clone(), source })?;
            let extracted = fsf.extract_file(entry).map_err(|source| ExtractError::Entry {
                name: target.path.display().to_string(),
                source,
            })?;
            out.write_all(&extracted.data)
                .and_then(|_| out.flush())
                .map_err(|source| ExtractError::WriteOutput { path: target.path.clone(), source })?;
            drop(out);

            if extracted.compressed {
                log::info!("Decompressing file {}", target.path.display());
                if let Err(e) = self.decompressor.decompress(&target.path) {
                    log::warn!("file {} was not decompressed: {e}", target.path.display());
                    decompress_failures += 1;
                }
            }

            if let (Some(m), Some(name)) = (manifest.as_mut(), target.manifest_name) {
                let size = fs::metadata(&target.path)
                    .map_err(|source| ExtractError::WriteOutput { path: target.path.clone(), source })?
                    .len();
                m.push(ManifestEntry { name, size, created: entry.created, modified: entry.modified });
            }
            written.push(target.path);
        }

        let manifest = match manifest {
            Some(mut m) => {
                let path = m.write_sorted(&self.opts.output_dir).map_err(|source| {
                    ExtractError::Manifest { path: self.opts.output_dir.join(MANIFEST_FILE_NAME), source }
                })?;
                log::info!("wrote {} manifest entries to {}", m.len(), path.display());
                Some(path)
            }
            None => None,
        };

        Ok(ExtractReport { written, index_end: index.end, decompress_failures, manifest })
    }

    fn target_for(&self, index: usize, entry: &UsageBlock) -> Result<Target, ExtractError> {
        let parts = path_components(entry.path_bytes());
        if parts.is_empty() {
            return Err(ExtractError::EmptyEntryName { index });
        }

        let mut path = self.opts.output_dir.clone();
        if self.opts.reorganize {
            let recoded: Vec<Vec<u8>> = parts.iter().map(|p| cp1250_to_utf8(p)).collect();
            let name = recoded.join(&b'/');
            if let Some(sub) = Category::classify(&name).subdir() {
                path.push(sub);
            }
            path.extend(recoded.iter().map(|p| raw_component(p)));
            Ok(Target { path, manifest_name: Some(name) })
        } else {
            path.extend(parts.iter().map(|p| raw_component(p)));
            Ok(Target { path, manifest_name: None })
        }
    }
}

struct Target {
    path:          PathBuf,
    manifest_name: Option<Vec<u8>>,
}

/// Read only the header and index of a container.
pub fn read_index(input: &Path) -> Result<(Header, FileIndex), ExtractError> {
    let file = File::open(input)
        .map_err(|source| ExtractError::Open { path: input.to_path_buf(), source })?;
    let mut fsf = FsfReader::new(BufReader::new(file))?;
    let index = build_index(&mut fsf)?;
    Ok((fsf.header, index))
}

fn ensure_directory(path: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(path)
        .map_err(|source| ExtractError::CreateDirectory { path: path.to_path_buf(), source })
}

/// Split a stored path on `/` and `\`, dropping anything that would climb
/// out of the output root.
fn path_components(raw: &[u8]) -> Vec<&[u8]> {
    raw.split(|&b| b == b'/' || b == b'\\')
        .filter(|c| !matches!(*c, b"" | b"." | b".."))
        .collect()
}

#[cfg(unix)]
fn raw_component(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn raw_component(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
