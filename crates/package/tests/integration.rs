//! Integration tests for package crate

#[cfg(test)]
mod tests {
    use lobup_errors::{Error, PackageError};
    use lobup_package::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const DETECTION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationInfo ToolVersion="1.8.4.0">
  <Name>Tool</Name>
  <UnencryptedContentSize>SIZE</UnencryptedContentSize>
  <FileName>IntunePackage.intunewin</FileName>
  <SetupFile>setup.exe</SetupFile>
  <EncryptionInfo>
    <EncryptionKey>KEY</EncryptionKey>
    <MacKey>bWFj</MacKey>
    <InitializationVector>aXY=</InitializationVector>
    <Mac>dmFs</Mac>
    <ProfileIdentifier>ProfileVersion1</ProfileIdentifier>
    <FileDigest>ZGln</FileDigest>
    <FileDigestAlgorithm>SHA256</FileDigestAlgorithm>
  </EncryptionInfo>
</ApplicationInfo>"#;

    fn detection(size: &str, key: &str) -> String {
        DETECTION.replace("SIZE", size).replace("KEY", key)
    }

    fn write_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("package.intunewin");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn scratch_entries(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[tokio::test]
    async fn test_extract_standard_layout() {
        let temp = tempdir().unwrap();
        let scratch_root = temp.path().join("scratch");
        std::fs::create_dir(&scratch_root).unwrap();
        let payload = vec![7u8; 10_000];
        let xml = detection("9000", "a2V5");
        let archive = write_zip(
            temp.path(),
            &[
                ("IntuneWinPackage/Metadata/Detection.xml", xml.as_bytes()),
                ("IntuneWinPackage/Contents/IntunePackage.intunewin", &payload),
            ],
        );

        let extracted = extract(&archive, &scratch_root).await.unwrap();

        assert_eq!(extracted.manifest.file_name, "IntunePackage.intunewin");
        assert_eq!(extracted.manifest.unencrypted_size, 9000);
        assert_eq!(extracted.manifest.encryption_key, "a2V5");
        assert_eq!(extracted.encrypted_size, 10_000);
        assert_eq!(extracted.content_match, ContentMatch::WellKnownName);
        assert!(extracted.content_path.starts_with(extracted.scratch.path()));
        assert_eq!(std::fs::read(&extracted.content_path).unwrap(), payload);
        assert!(extracted.scratch.path().join("Detection.xml").exists());

        extracted.scratch.remove().await.unwrap();
        assert_eq!(scratch_entries(&scratch_root), 0);
    }

    #[tokio::test]
    async fn test_unparsable_size_uses_measured_size() {
        let temp = tempdir().unwrap();
        let xml = detection("unknown", "a2V5");
        let archive = write_zip(
            temp.path(),
            &[("detection.xml", xml.as_bytes()), ("content.dat", &[1u8; 321])],
        );

        let extracted = extract(&archive, temp.path()).await.unwrap();
        assert_eq!(extracted.manifest.unencrypted_size, 321);
        assert_eq!(extracted.content_match, ContentMatch::DatFile);
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let temp = tempdir().unwrap();
        let scratch_root = temp.path().join("scratch");
        std::fs::create_dir(&scratch_root).unwrap();
        let archive = write_zip(temp.path(), &[("IntunePackage.intunewin", &[0u8; 10])]);

        let err = extract(&archive, &scratch_root).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::ManifestNotFound { .. })
        ));
        assert_eq!(scratch_entries(&scratch_root), 0);
    }

    #[tokio::test]
    async fn test_missing_content_lists_entries() {
        let temp = tempdir().unwrap();
        let xml = detection("10", "a2V5");
        let archive = write_zip(
            temp.path(),
            &[("detection.xml", xml.as_bytes()), ("readme.xml", b"<a/>")],
        );

        let err = extract(&archive, temp.path()).await.unwrap_err();
        match err {
            Error::Package(PackageError::ContentFileNotFound { entries }) => {
                assert_eq!(entries, vec!["detection.xml", "readme.xml"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let temp = tempdir().unwrap();
        let xml = detection("10", "");
        let archive = write_zip(
            temp.path(),
            &[("detection.xml", xml.as_bytes()), ("IntunePackage.intunewin", &[0u8; 10])],
        );

        let err = extract(&archive, temp.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::InvalidManifest { .. })
        ));
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.intunewin");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = extract(&path, temp.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Package(PackageError::ArchiveUnreadable { .. })
        ));
    }
}
