//! Output classification and the `manifest.xma` listing written in
//! reorganize mode.
//!
//! Classification only picks the directory a file is written to.  The
//! manifest collects one [`ManifestEntry`] per extracted file, is sorted once
//! at the end of the run and serialized as
//!
//! ```text
//! size|created|modified|filename\r\n
//! ...
//! size|created|modified|filename\r
//! ```

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the output root.
pub const MANIFEST_FILE_NAME: &str = "manifest.xma";

/// Target bucket for an extracted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Images,
    Sounds,
    Fonts,
    /// Stays in the output root.
    Root,
}

impl Category {
    pub fn classify(name: &[u8]) -> Self {
        match extension(name).as_deref() {
            Some("png" | "jpg" | "gif" | "tiff") => Category::Images,
            Some("wav" | "mp3") => Category::Sounds,
            Some("ttf") => Category::Fonts,
            _ => Category::Root,
        }
    }

    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Category::Images => Some("images"),
            Category::Sounds => Some("sounds"),
            Category::Fonts  => Some("fonts"),
            Category::Root   => None,
        }
    }
}

/// Lower-cased text after the last `.` of the final path component.
fn extension(name: &[u8]) -> Option<String> {
    let file = name.rsplit(|&b| b == b'/' || b == b'\\').next().unwrap_or(name);
    let dot = file.iter().rposition(|&b| b == b'.')?;
    Some(String::from_utf8_lossy(&file[dot + 1..]).to_ascii_lowercase())
}

fn sort_weight(name: &[u8]) -> u8 {
    match extension(name).as_deref() {
        Some("xma") => 1,
        Some("xml") => 2,
        Some("ttf") => 3,
        Some("png" | "jpg" | "gif") => 4,
        _ => 5,
    }
}

/// Manifest ordering: by extension weight, then plain byte-wise name order.
pub fn compare_names(a: &[u8], b: &[u8]) -> Ordering {
    sort_weight(a).cmp(&sort_weight(b)).then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Recoded name relative to the output root.
    pub name:     Vec<u8>,
    pub size:     u64,
    pub created:  u32,
    pub modified: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| compare_names(&a.name, &b.name));
    }

    /// Lines joined by CR-LF; the last one ends in a bare CR.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(format!("{}|{}|{}|", e.size, e.created, e.modified).as_bytes());
            out.extend_from_slice(&e.name);
            out.push(b'\r');
        }
        out
    }

    /// Sort and write `manifest.xma` into `dir`.
    pub fn write_sorted(&mut self, dir: &Path) -> io::Result<PathBuf> {
        self.sort();
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}
