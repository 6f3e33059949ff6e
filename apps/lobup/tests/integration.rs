//! Integration tests for the lobup CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const DETECTION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationInfo ToolVersion="1.8.4.0">
  <Name>Contoso Agent</Name>
  <UnencryptedContentSize>2048</UnencryptedContentSize>
  <FileName>IntunePackage.intunewin</FileName>
  <SetupFile>setup.exe</SetupFile>
  <EncryptionInfo>
    <EncryptionKey>c2VjcmV0LWtleQ==</EncryptionKey>
    <MacKey>bWFj</MacKey>
    <InitializationVector>aXY=</InitializationVector>
    <Mac>dmFs</Mac>
    <ProfileIdentifier>ProfileVersion1</ProfileIdentifier>
    <FileDigest>ZGln</FileDigest>
    <FileDigestAlgorithm>SHA256</FileDigestAlgorithm>
  </EncryptionInfo>
</ApplicationInfo>"#;

fn write_package(dir: &Path) -> PathBuf {
    let path = dir.join("agent.intunewin");
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("IntuneWinPackage/Metadata/Detection.xml", options)
        .unwrap();
    zip.write_all(DETECTION.as_bytes()).unwrap();
    zip.start_file("IntuneWinPackage/Contents/IntunePackage.intunewin", options)
        .unwrap();
    zip.write_all(&[9u8; 4096]).unwrap();
    zip.finish().unwrap();
    path
}

fn write_config(dir: &Path, scratch: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!("[paths]\nscratch_root = {:?}\n", scratch.display().to_string()),
    )
    .unwrap();
    path
}

fn lobup() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lobup"));
    command
        .env_remove("LOBUP_TOKEN")
        .env_remove("LOBUP_REGISTRY_URL")
        .env_remove("LOBUP_CHUNK_SIZE")
        .env_remove("LOBUP_RENEWAL_FAILURE")
        .env_remove("LOBUP_SCRATCH_DIR");
    command
}

#[test]
fn test_cli_version() {
    let output = lobup()
        .arg("--version")
        .output()
        .expect("Failed to execute lobup");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lobup"));
}

#[test]
fn test_cli_help() {
    let output = lobup()
        .arg("--help")
        .output()
        .expect("Failed to execute lobup");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("upload"));
    assert!(stdout.contains("inspect"));
}

#[test]
fn test_cli_invalid_command() {
    let output = lobup()
        .arg("invalid-command")
        .output()
        .expect("Failed to execute lobup");

    assert!(!output.status.success());
}

#[test]
fn test_inspect_json_omits_key_material() {
    let temp = tempfile::tempdir().unwrap();
    let scratch = temp.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let archive = write_package(temp.path());
    let config = write_config(temp.path(), &scratch);

    let output = lobup()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg(&archive)
        .output()
        .expect("Failed to execute lobup");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["file_name"], "IntunePackage.intunewin");
    assert_eq!(value["unencrypted_size"], 2048);
    assert_eq!(value["encrypted_size"], 4096);
    assert!(!stdout.contains("c2VjcmV0LWtleQ=="));
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn test_upload_without_token_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let scratch = temp.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let archive = write_package(temp.path());
    let config = write_config(temp.path(), &scratch);
    let app = temp.path().join("app.toml");
    std::fs::write(&app, "display_name = \"x\"").unwrap();

    let output = lobup()
        .arg("--config")
        .arg(&config)
        .arg("upload")
        .arg(&archive)
        .arg("--app")
        .arg(&app)
        .output()
        .expect("Failed to execute lobup");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("token"));
}
