#![allow(clippy::module_name_repetitions)]

//! Package manifest types
//!
//! The manifest describes the encrypted payload inside a package archive:
//! its logical file name, the plaintext size, and the key material the
//! service needs to decrypt it after upload.

use lobup_errors::{Error, PackageError};
use serde::{Deserialize, Serialize};

/// Digest algorithm assumed when the manifest does not name one
pub const DEFAULT_DIGEST_ALGORITHM: &str = "SHA256";

/// Encryption profile assumed when the manifest does not name one
pub const DEFAULT_PROFILE_IDENTIFIER: &str = "ProfileVersion1";

/// Parsed package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Logical name the service will display for the uploaded file
    pub file_name: String,
    /// Plaintext payload size in bytes
    pub unencrypted_size: u64,
    pub encryption_key: String,
    pub mac_key: String,
    pub initialization_vector: String,
    pub mac: String,
    pub file_digest: String,
    pub file_digest_algorithm: String,
    pub profile_identifier: String,
    /// Display name recorded by the packaging tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Installer entry point inside the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msi_info: Option<MsiInfo>,
}

/// MSI metadata recorded when the packaged installer is an MSI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsiInfo {
    pub product_code: Option<String>,
    pub product_version: Option<String>,
    pub publisher: Option<String>,
    pub upgrade_code: Option<String>,
}

impl PackageManifest {
    /// Validate invariants that must hold before any network I/O
    ///
    /// # Errors
    ///
    /// Returns `PackageError::InvalidManifest` if the encryption key is empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.encryption_key.trim().is_empty() {
            return Err(PackageError::InvalidManifest {
                reason: "encryption key is empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Encryption parameters in the shape the registry's commit call expects
    #[must_use]
    pub fn encryption_info(&self) -> FileEncryptionInfo {
        FileEncryptionInfo {
            encryption_key: self.encryption_key.clone(),
            mac_key: self.mac_key.clone(),
            initialization_vector: self.initialization_vector.clone(),
            mac: self.mac.clone(),
            profile_identifier: self.profile_identifier.clone(),
            file_digest: self.file_digest.clone(),
            file_digest_algorithm: self.file_digest_algorithm.clone(),
        }
    }
}

/// Encryption parameters submitted when committing an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEncryptionInfo {
    pub encryption_key: String,
    pub mac_key: String,
    pub initialization_vector: String,
    pub mac: String,
    pub profile_identifier: String,
    pub file_digest: String,
    pub file_digest_algorithm: String,
}
