//! Zip container access

use crate::content::EntryInfo;
use lobup_errors::{Error, PackageError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Name of the manifest entry, matched case-insensitively on the final component
pub const MANIFEST_NAME: &str = "detection.xml";

fn unreadable(path: &Path, e: impl ToString) -> Error {
    PackageError::ArchiveUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    }
    .into()
}

/// Open a package archive for reading
pub(crate) fn open(path: &Path) -> Result<ZipArchive<File>, Error> {
    let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
    ZipArchive::new(file).map_err(|e| unreadable(path, e))
}

/// List every entry with its uncompressed size
pub(crate) fn list_entries(
    archive: &mut ZipArchive<File>,
    path: &Path,
) -> Result<Vec<EntryInfo>, Error> {
    (0..archive.len())
        .map(|index| {
            let entry = archive.by_index(index).map_err(|e| unreadable(path, e))?;
            Ok(EntryInfo {
                index,
                name: entry.name().to_string(),
                size: entry.size(),
                is_dir: entry.is_dir(),
            })
        })
        .collect()
}

/// Find the manifest entry
pub(crate) fn find_manifest(entries: &[EntryInfo]) -> Option<&EntryInfo> {
    entries.iter().find(|e| {
        !e.is_dir
            && e.name
                .rsplit(['/', '\\'])
                .next()
                .is_some_and(|n| n.eq_ignore_ascii_case(MANIFEST_NAME))
    })
}

/// Read an entry fully into a string
pub(crate) fn read_to_string(
    archive: &mut ZipArchive<File>,
    index: usize,
    path: &Path,
) -> Result<String, Error> {
    let mut entry = archive.by_index(index).map_err(|e| unreadable(path, e))?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| unreadable(path, e))?;
    Ok(text)
}

/// Copy one entry into `dest_dir`, flattened to its final path component
///
/// Returns the written path and the number of bytes written.
pub(crate) fn extract_entry(
    archive: &mut ZipArchive<File>,
    index: usize,
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<(PathBuf, u64), Error> {
    let mut entry = archive
        .by_index(index)
        .map_err(|e| unreadable(archive_path, e))?;
    let file_name = entry
        .enclosed_name()
        .and_then(|p| p.file_name().map(std::ffi::OsStr::to_os_string))
        .ok_or_else(|| unreadable(archive_path, format!("unsafe entry name {}", entry.name())))?;

    let out_path = dest_dir.join(file_name);
    let mut out = File::create(&out_path).map_err(|e| Error::io_with_path(&e, &out_path))?;
    let written =
        std::io::copy(&mut entry, &mut out).map_err(|e| Error::io_with_path(&e, &out_path))?;
    Ok((out_path, written))
}
