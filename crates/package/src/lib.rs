#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package archive reading for lobup
//!
//! Opens a prepared package archive, parses its embedded detection.xml
//! manifest, finds the encrypted payload entry, and extracts both into a
//! fresh scratch directory that the caller owns.

mod archive;
pub mod content;
pub mod manifest;
mod scratch;

pub use archive::MANIFEST_NAME;
pub use content::{ContentMatch, EntryInfo};
pub use manifest::ManifestDocument;
pub use scratch::ScratchDir;

use lobup_errors::{Error, PackageError};
use lobup_types::PackageManifest;
use std::path::{Path, PathBuf};

/// Everything the pipeline needs from a package archive
#[derive(Debug)]
pub struct ExtractedPackage {
    pub manifest: PackageManifest,
    /// Extracted encrypted payload inside `scratch`
    pub content_path: PathBuf,
    /// Measured size of the extracted payload
    pub encrypted_size: u64,
    /// Where the payload entry was found
    pub content_match: ContentMatch,
    pub scratch: ScratchDir,
}

/// Extract manifest and payload from `archive_path` into a new directory under `scratch_root`
///
/// On failure the scratch directory is removed before returning.
///
/// # Errors
///
/// Returns `ManifestNotFound`, `EncryptionInfoMissing`, `ContentFileNotFound`
/// or `InvalidManifest` for malformed packages, `ArchiveUnreadable` if the
/// file is not a zip container, and I/O errors from extraction.
pub async fn extract(archive_path: &Path, scratch_root: &Path) -> Result<ExtractedPackage, Error> {
    let scratch = ScratchDir::create(scratch_root).await?;
    let dest = scratch.path().to_path_buf();
    let source = archive_path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || extract_blocking(&source, &dest))
        .await
        .map_err(|e| Error::internal(format!("extraction task failed: {e}")));

    match result {
        Ok(Ok(extracted)) => {
            tracing::info!(
                file_name = %extracted.manifest.file_name,
                encrypted_size = extracted.encrypted_size,
                content_match = %extracted.content_match,
                "extracted package metadata"
            );
            Ok(ExtractedPackage {
                manifest: extracted.manifest,
                content_path: extracted.content_path,
                encrypted_size: extracted.encrypted_size,
                content_match: extracted.content_match,
                scratch,
            })
        }
        Ok(Err(e)) | Err(e) => {
            if let Err(cleanup) = scratch.remove().await {
                tracing::warn!(error = %cleanup, "failed to remove scratch directory");
            }
            Err(e)
        }
    }
}

struct Extracted {
    manifest: PackageManifest,
    content_path: PathBuf,
    encrypted_size: u64,
    content_match: ContentMatch,
}

fn extract_blocking(archive_path: &Path, dest: &Path) -> Result<Extracted, Error> {
    let mut zip = archive::open(archive_path)?;
    let entries = archive::list_entries(&mut zip, archive_path)?;

    let manifest_entry =
        archive::find_manifest(&entries).ok_or_else(|| PackageError::ManifestNotFound {
            path: archive_path.display().to_string(),
        })?;
    let manifest_index = manifest_entry.index;

    let xml = archive::read_to_string(&mut zip, manifest_index, archive_path)?;
    let document = ManifestDocument::parse(&xml)?;

    let (content_entry, content_match) =
        content::locate(&entries, manifest_index, document.file_name()).ok_or_else(|| {
            PackageError::ContentFileNotFound {
                entries: entries.iter().map(|e| e.name.clone()).collect(),
            }
        })?;
    tracing::debug!(entry = %content_entry.name, heuristic = %content_match, "located payload");
    let content_index = content_entry.index;

    archive::extract_entry(&mut zip, manifest_index, archive_path, dest)?;
    let (content_path, encrypted_size) =
        archive::extract_entry(&mut zip, content_index, archive_path, dest)?;

    let fallback_name = content_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let manifest = document.into_manifest(&fallback_name, encrypted_size)?;

    Ok(Extracted {
        manifest,
        content_path,
        encrypted_size,
        content_match,
    })
}
