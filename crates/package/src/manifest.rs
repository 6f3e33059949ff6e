//! detection.xml parsing
//!
//! The document is an `ApplicationInfo` root with payload metadata as direct
//! children and key material under `EncryptionInfo`. Element names are
//! matched case-insensitively.

use lobup_errors::{Error, PackageError};
use lobup_types::manifest::{DEFAULT_DIGEST_ALGORITHM, DEFAULT_PROFILE_IDENTIFIER};
use lobup_types::{MsiInfo, PackageManifest};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

const ROOT: &str = "applicationinfo";
const ENCRYPTION_INFO: &str = "applicationinfo/encryptioninfo";

/// Manifest fields as read from the document, before sizes are resolved
#[derive(Debug, Clone, Default)]
pub struct ManifestDocument {
    fields: HashMap<String, String>,
    tool_version: Option<String>,
}

impl ManifestDocument {
    /// Parse a detection.xml document
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` if the XML is malformed or the root is not
    /// `ApplicationInfo`, and `EncryptionInfoMissing` if the root has no
    /// `EncryptionInfo` child.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut doc = Self::default();
        let mut path: Vec<String> = Vec::new();
        let mut saw_root = false;
        let mut saw_encryption = false;

        loop {
            let event = reader.read_event().map_err(|e| PackageError::InvalidManifest {
                reason: format!("malformed XML at byte {}: {e}", reader.error_position()),
            })?;
            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let name =
                        String::from_utf8_lossy(start.local_name().as_ref()).to_ascii_lowercase();
                    if path.is_empty() {
                        if saw_root || name != ROOT {
                            return Err(PackageError::InvalidManifest {
                                reason: format!("unexpected root element <{name}>"),
                            }
                            .into());
                        }
                        saw_root = true;
                        doc.tool_version = start
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref().eq_ignore_ascii_case(b"ToolVersion"))
                            .and_then(|a| a.unescape_value().ok())
                            .map(|v| v.trim().to_string())
                            .filter(|v| !v.is_empty());
                    }
                    path.push(name);
                    let joined = path.join("/");
                    if joined == ENCRYPTION_INFO {
                        saw_encryption = true;
                    }
                    if matches!(event, Event::Empty(_)) {
                        doc.fields.entry(joined).or_default();
                        path.pop();
                    }
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| PackageError::InvalidManifest {
                        reason: e.to_string(),
                    })?;
                    doc.fields.insert(path.join("/"), value.trim().to_string());
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data).trim().to_string();
                    doc.fields.insert(path.join("/"), value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(PackageError::InvalidManifest {
                reason: "document has no ApplicationInfo root".to_string(),
            }
            .into());
        }
        if !saw_encryption {
            return Err(PackageError::EncryptionInfoMissing {
                message: "ApplicationInfo has no EncryptionInfo child".to_string(),
            }
            .into());
        }
        Ok(doc)
    }

    fn app(&self, name: &str) -> Option<&str> {
        self.get(&format!("{ROOT}/{name}"))
    }

    fn encryption(&self, name: &str) -> Option<&str> {
        self.get(&format!("{ENCRYPTION_INFO}/{name}"))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Declared logical file name
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.app("filename")
    }

    /// Declared plaintext size, if present and numeric
    #[must_use]
    pub fn unencrypted_size(&self) -> Option<u64> {
        self.app("unencryptedcontentsize")
            .and_then(|v| v.parse().ok())
    }

    /// Build the manifest, resolving anything the document left open
    ///
    /// `fallback_name` is used when the document declares no file name and
    /// `measured_size` when the declared plaintext size is absent or not a number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` if the encryption key is empty.
    pub fn into_manifest(
        self,
        fallback_name: &str,
        measured_size: u64,
    ) -> Result<PackageManifest, Error> {
        let unencrypted_size = match self.unencrypted_size() {
            Some(size) => size,
            None => {
                tracing::warn!(
                    declared = self.app("unencryptedcontentsize").unwrap_or(""),
                    measured_size,
                    "UnencryptedContentSize missing or unparsable, using measured size"
                );
                measured_size
            }
        };
        let owned = |v: Option<&str>| v.map(str::to_string);
        let text = |v: Option<&str>| v.unwrap_or_default().to_string();

        let msi_info = MsiInfo {
            product_code: owned(self.get("applicationinfo/msiinfo/msiproductcode")),
            product_version: owned(self.get("applicationinfo/msiinfo/msiproductversion")),
            publisher: owned(self.get("applicationinfo/msiinfo/msipublisher")),
            upgrade_code: owned(self.get("applicationinfo/msiinfo/msiupgradecode")),
        };

        let manifest = PackageManifest {
            file_name: self.file_name().unwrap_or(fallback_name).to_string(),
            unencrypted_size,
            encryption_key: text(self.encryption("encryptionkey")),
            mac_key: text(self.encryption("mackey")),
            initialization_vector: text(self.encryption("initializationvector")),
            mac: text(self.encryption("mac")),
            file_digest: text(self.encryption("filedigest")),
            file_digest_algorithm: self
                .encryption("filedigestalgorithm")
                .unwrap_or(DEFAULT_DIGEST_ALGORITHM)
                .to_string(),
            profile_identifier: self
                .encryption("profileidentifier")
                .unwrap_or(DEFAULT_PROFILE_IDENTIFIER)
                .to_string(),
            name: owned(self.app("name")),
            setup_file: owned(self.app("setupfile")),
            tool_version: self.tool_version,
            msi_info: (msi_info != MsiInfo::default()).then_some(msi_info),
        };
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" ToolVersion="1.8.4.0">
  <Name>Tool</Name>
  <UnencryptedContentSize>1536</UnencryptedContentSize>
  <FileName>IntunePackage.intunewin</FileName>
  <SetupFile>setup.msi</SetupFile>
  <EncryptionInfo>
    <EncryptionKey>a2V5</EncryptionKey>
    <MacKey>bWFj</MacKey>
    <InitializationVector>aXY=</InitializationVector>
    <Mac>dmFs</Mac>
    <ProfileIdentifier>ProfileVersion1</ProfileIdentifier>
    <FileDigest>ZGln</FileDigest>
    <FileDigestAlgorithm>SHA256</FileDigestAlgorithm>
  </EncryptionInfo>
  <MsiInfo>
    <MsiProductCode>{ABC}</MsiProductCode>
    <MsiProductVersion>1.2.3</MsiProductVersion>
  </MsiInfo>
</ApplicationInfo>"#;

    #[test]
    fn test_parse_full_document() {
        let manifest = ManifestDocument::parse(FULL)
            .unwrap()
            .into_manifest("fallback.bin", 99)
            .unwrap();
        assert_eq!(manifest.file_name, "IntunePackage.intunewin");
        assert_eq!(manifest.unencrypted_size, 1536);
        assert_eq!(manifest.encryption_key, "a2V5");
        assert_eq!(manifest.initialization_vector, "aXY=");
        assert_eq!(manifest.tool_version.as_deref(), Some("1.8.4.0"));
        assert_eq!(manifest.setup_file.as_deref(), Some("setup.msi"));
        let msi = manifest.msi_info.unwrap();
        assert_eq!(msi.product_code.as_deref(), Some("{ABC}"));
        assert_eq!(msi.publisher, None);
    }

    #[test]
    fn test_case_insensitive_and_defaults() {
        let xml = "<applicationinfo><encryptioninfo><encryptionkey>k</encryptionkey></encryptioninfo></applicationinfo>";
        let manifest = ManifestDocument::parse(xml)
            .unwrap()
            .into_manifest("content.dat", 42)
            .unwrap();
        assert_eq!(manifest.file_name, "content.dat");
        assert_eq!(manifest.unencrypted_size, 42);
        assert_eq!(manifest.file_digest_algorithm, DEFAULT_DIGEST_ALGORITHM);
        assert_eq!(manifest.profile_identifier, DEFAULT_PROFILE_IDENTIFIER);
        assert!(manifest.msi_info.is_none());
    }

    #[test]
    fn test_unparsable_size_falls_back_to_measured() {
        let xml = FULL.replace("<UnencryptedContentSize>1536", "<UnencryptedContentSize>n/a");
        let manifest = ManifestDocument::parse(&xml)
            .unwrap()
            .into_manifest("x", 2048)
            .unwrap();
        assert_eq!(manifest.unencrypted_size, 2048);
    }

    #[test]
    fn test_wrong_root() {
        let err = ManifestDocument::parse("<Package><EncryptionInfo/></Package>").unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_missing_encryption_info() {
        let err = ManifestDocument::parse("<ApplicationInfo><FileName>a</FileName></ApplicationInfo>")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::EncryptionInfoMissing { .. })
        ));
    }

    #[test]
    fn test_nested_encryption_info_does_not_count() {
        let xml = "<ApplicationInfo><Other><EncryptionInfo/></Other></ApplicationInfo>";
        assert!(matches!(
            ManifestDocument::parse(xml).unwrap_err(),
            Error::Package(PackageError::EncryptionInfoMissing { .. })
        ));
    }

    #[test]
    fn test_empty_key_is_invalid() {
        let xml = FULL.replace("<EncryptionKey>a2V5</EncryptionKey>", "<EncryptionKey></EncryptionKey>");
        let err = ManifestDocument::parse(&xml)
            .unwrap()
            .into_manifest("x", 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::InvalidManifest { .. })
        ));
    }
}
