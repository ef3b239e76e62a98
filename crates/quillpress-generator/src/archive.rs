//! Packing a finished build into one gzip-compressed tarball.
//!
//! ```text
//! written files → tar → gzip → build-YYYY-MM-DD.tar.gz
//! ```

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use flate2::{Compression, write::GzEncoder};
use tracing::{debug, info};

use crate::build::{GenerateError, Result};

/// Name of the archive for a build finished at `now`.
pub fn archive_name(now: DateTime<Local>) -> String {
    now.format("build-%Y-%m-%d.tar.gz").to_string()
}

/// Metadata about a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub files: usize,
    /// Compressed size in bytes.
    pub size: u64,
}

/// Pack `files`, given relative to `output_dir`, into a `.tar.gz` at `dest`.
///
/// Entries keep their relative paths. An empty file list is an error and
/// leaves `dest` untouched.
pub fn write_archive(output_dir: &Path, files: &[PathBuf], dest: &Path) -> Result<ArchiveInfo> {
    if files.is_empty() {
        return Err(GenerateError::NothingToArchive);
    }

    pack(output_dir, files, dest).map_err(|source| GenerateError::Archive {
        path: dest.to_path_buf(),
        source,
    })?;

    let size = fs::metadata(dest)
        .map_err(|source| GenerateError::Archive {
            path: dest.to_path_buf(),
            source,
        })?
        .len();
    info!(
        archive = %dest.display(),
        files = files.len(),
        size_kb = size / 1024,
        "archive created"
    );

    Ok(ArchiveInfo {
        path: dest.to_path_buf(),
        files: files.len(),
        size,
    })
}

fn pack(output_dir: &Path, files: &[PathBuf], dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let encoder = GzEncoder::new(BufWriter::new(File::create(dest)?), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for relative in files {
        let data = fs::read(output_dir.join(relative))?;

        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, relative, data.as_slice())?;
        debug!(path = %relative.display(), size = data.len(), "added to archive");
    }

    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()
}
