//! DCF source reading: transparent gzip detection and directory walks for
//! per-package `DESCRIPTION` files.
//!
//! Grounded on the same `fs-err`-wrapped-I/O-with-context discipline used
//! throughout this crate's filesystem code, and on `flate2` for the gzip
//! layer — both glue, not core, per the scope this crate draws around the
//! tokenizer/parser/repository.

use std::io::Read as _;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::consts::DESCRIPTION_FILENAME;
use crate::error::{IoError, IoErrorKind};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Reads a single DCF source file (`PACKAGES`, `PACKAGES.gz`, or a
/// `DESCRIPTION` file) fully into memory, transparently decompressing it if
/// its first two bytes are the gzip magic number.
pub fn read_dcf_source(path: impl AsRef<Path>) -> Result<Vec<u8>, IoError> {
    let raw = fs_err::read(path.as_ref()).map_err(|e| IoError::from(std::io::Error::from(e)))?;
    decompress_if_gzipped(raw)
}

/// Applies the same magic-byte gzip check as [`read_dcf_source`] to bytes
/// already in memory (e.g. a buffer returned by a [`crate::orchestration::RepositoryFetcher`]).
pub fn decompress_if_gzipped(bytes: Vec<u8>) -> Result<Vec<u8>, IoError> {
    if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        let mut out = Vec::new();
        GzDecoder::new(&bytes[..])
            .read_to_end(&mut out)
            .map_err(IoError::from)?;
        Ok(out)
    } else {
        Ok(bytes)
    }
}

/// Walks `root` for per-package `DESCRIPTION` files (one directory per
/// package, as a source tree checked out from a repository would look),
/// returning `(origin_label, bytes)` pairs ready for [`crate::Repository::read`].
/// The origin label is the package directory's path, so callers can trace a
/// row back to where it came from.
pub fn read_dcf_dir(root: impl AsRef<Path>) -> Result<Vec<(String, Vec<u8>)>, IoError> {
    let root = root.as_ref();
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1).max_depth(2) {
        let entry = entry.map_err(IoError::from)?;
        if entry.file_name() != DESCRIPTION_FILENAME {
            continue;
        }
        let bytes = read_dcf_source(entry.path())?;
        let origin = entry
            .path()
            .parent()
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        log::debug!("read {} bytes from {}", bytes.len(), entry.path().display());
        out.push((origin, bytes));
    }
    Ok(out)
}

impl From<IoErrorKind> for IoError {
    fn from(source: IoErrorKind) -> Self {
        Self { source }
    }
}
