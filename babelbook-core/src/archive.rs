//! EPUB container packing and unpacking
//!
//! An EPUB is a zip archive with one format-specific constraint: the
//! `mimetype` entry must be the first entry and must be stored without
//! compression so readers can sniff it at a fixed offset. Unpacking goes
//! into a temporary directory that is removed when the returned guard is
//! dropped.

use crate::error::ArchiveError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Result type for archive operations
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// An unpacked EPUB tree; the backing directory is deleted on drop
#[derive(Debug)]
pub struct UnpackedEpub {
    dir: TempDir,
}

impl UnpackedEpub {
    /// Root of the extracted tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Extract every entry of the archive into a fresh temporary directory.
///
/// Entry paths are checked against traversal: any entry whose resolved
/// path would land outside the extraction root fails the whole unpack.
/// Byte streams are copied verbatim.
pub fn unpack(archive_path: &Path) -> ArchiveResult<UnpackedEpub> {
    if !archive_path.is_file() {
        return Err(ArchiveError::NotFound(
            archive_path.display().to_string(),
        ));
    }

    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| ArchiveError::Malformed(e.to_string()))?;

    let dir = tempfile::Builder::new().prefix("babelbook-").tempdir()?;
    tracing::debug!(
        archive = %archive_path.display(),
        entries = archive.len(),
        dest = %dir.path().display(),
        "unpacking archive"
    );

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => return Err(ArchiveError::UnsafePath(entry.name().to_string())),
        };

        let out_path = dir.path().join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(UnpackedEpub { dir })
}

/// Pack a directory tree back into an EPUB at `output_path`.
///
/// A root-level `mimetype` file, when present, becomes the first entry and
/// is stored uncompressed. Everything else is deflated afterward in sorted
/// order, with forward-slash entry names regardless of host separator.
pub fn pack(root: &Path, output_path: &Path) -> ArchiveResult<()> {
    let out = File::create(output_path)?;
    let mut zip = ZipWriter::new(out);

    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mimetype_path = root.join("mimetype");
    if mimetype_path.is_file() {
        let bytes = fs::read(&mimetype_path)?;
        zip.start_file("mimetype", stored)?;
        zip.write_all(&bytes)?;
    }

    let mut entries = Vec::new();
    collect_files(root, Path::new(""), &mut entries)?;
    entries.sort();

    for relative in &entries {
        let name = entry_name(relative);
        if name == "mimetype" {
            continue;
        }
        let bytes = fs::read(root.join(relative))?;
        zip.start_file(name, deflated)?;
        zip.write_all(&bytes)?;
    }

    zip.finish()?;
    tracing::debug!(
        output = %output_path.display(),
        entries = entries.len(),
        "packed archive"
    );
    Ok(())
}

/// Recursively collect file paths relative to `root`
fn collect_files(root: &Path, relative: &Path, out: &mut Vec<PathBuf>) -> ArchiveResult<()> {
    for entry in fs::read_dir(root.join(relative))? {
        let entry = entry?;
        let child = relative.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            collect_files(root, &child, out)?;
        } else {
            out.push(child);
        }
    }
    Ok(())
}

/// Zip entry name for a relative path, always forward-slash separated
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
