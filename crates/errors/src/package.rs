//! Package archive and manifest error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("cannot read package archive {path}: {message}")]
    ArchiveUnreadable { path: String, message: String },

    #[error("detection.xml not found in {path}")]
    ManifestNotFound { path: String },

    #[error("manifest has no EncryptionInfo element: {message}")]
    EncryptionInfoMissing { message: String },

    #[error("encrypted content not found in archive; entries: {}", .entries.join(", "))]
    ContentFileNotFound { entries: Vec<String> },

    #[error("invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    #[error("scratch directory error at {path}: {message}")]
    ScratchDir { path: String, message: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotFound { .. }
            | Self::EncryptionInfoMissing { .. }
            | Self::ContentFileNotFound { .. } => {
                Some("Re-create the package with the content prep tool and retry.")
            }
            Self::InvalidManifest { .. } => {
                Some("The package manifest is missing its encryption key; re-create the package.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ArchiveUnreadable { .. } => "package.archive_unreadable",
            Self::ManifestNotFound { .. } => "package.manifest_not_found",
            Self::EncryptionInfoMissing { .. } => "package.encryption_info_missing",
            Self::ContentFileNotFound { .. } => "package.content_not_found",
            Self::InvalidManifest { .. } => "package.invalid_manifest",
            Self::ScratchDir { .. } => "package.scratch_dir",
        };
        Some(code)
    }
}
