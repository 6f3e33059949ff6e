//! Registry wire format
//!
//! Request bodies are built from domain types here so the rest of the crate
//! never handles raw JSON.

use lobup_types::{
    AppAttributes, DetectionRule, FileDetectionType, FileEncryptionInfo, InstallContext,
    PackageManifest, RegistryDetectionType, RestartBehavior, ReturnCodeType,
};
use serde::{Deserialize, Serialize};

pub(crate) const WIN32_LOB_APP: &str = "#microsoft.graph.win32LobApp";
pub(crate) const CONTENT_FILE: &str = "#microsoft.graph.mobileAppContentFile";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Win32LobAppBody<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    display_name: &'a str,
    description: &'a str,
    publisher: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_version: Option<&'a str>,
    file_name: &'a str,
    setup_file_path: &'a str,
    install_command_line: &'a str,
    uninstall_command_line: &'a str,
    applicable_architectures: String,
    minimum_supported_windows_release: &'a str,
    install_experience: InstallExperience,
    return_codes: Vec<ReturnCodeBody>,
    detection_rules: Vec<DetectionRuleBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    large_icon: Option<IconBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    developer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    information_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    privacy_information_url: Option<&'a str>,
}

impl<'a> Win32LobAppBody<'a> {
    pub(crate) fn new(attrs: &'a AppAttributes, manifest: &'a PackageManifest) -> Self {
        let setup_file_path = attrs
            .setup_file_path
            .as_deref()
            .or(manifest.setup_file.as_deref())
            .unwrap_or(&manifest.file_name);

        let architectures = if attrs.architectures.is_empty() {
            "x64,x86".to_string()
        } else {
            attrs
                .architectures
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };

        Self {
            odata_type: WIN32_LOB_APP,
            display_name: &attrs.display_name,
            description: &attrs.description,
            publisher: &attrs.publisher,
            display_version: attrs.display_version.as_deref().or_else(|| {
                manifest
                    .msi_info
                    .as_ref()
                    .and_then(|msi| msi.product_version.as_deref())
            }),
            file_name: &manifest.file_name,
            setup_file_path,
            install_command_line: &attrs.install_command,
            uninstall_command_line: &attrs.uninstall_command,
            applicable_architectures: architectures,
            minimum_supported_windows_release: &attrs.minimum_os,
            install_experience: InstallExperience {
                run_as_account: match attrs.install_context {
                    InstallContext::System => "system",
                    InstallContext::User => "user",
                },
                device_restart_behavior: match attrs.restart_behavior {
                    RestartBehavior::BasedOnReturnCode => "basedOnReturnCode",
                    RestartBehavior::Allow => "allow",
                    RestartBehavior::Suppress => "suppress",
                    RestartBehavior::Force => "force",
                },
                max_run_time_in_minutes: attrs.max_run_time_minutes,
            },
            return_codes: attrs
                .return_codes
                .iter()
                .map(|rc| ReturnCodeBody {
                    return_code: rc.code,
                    kind: match rc.kind {
                        ReturnCodeType::Success => "success",
                        ReturnCodeType::SoftReboot => "softReboot",
                        ReturnCodeType::HardReboot => "hardReboot",
                        ReturnCodeType::Retry => "retry",
                        ReturnCodeType::Failed => "failed",
                    },
                })
                .collect(),
            detection_rules: attrs.detection_rules.iter().map(DetectionRuleBody::from).collect(),
            large_icon: attrs.icon.as_ref().map(|icon| IconBody {
                kind: &icon.mime_type,
                value: &icon.base64,
            }),
            notes: attrs.notes.as_deref(),
            owner: attrs.owner.as_deref(),
            developer: attrs.developer.as_deref(),
            information_url: attrs.information_url.as_deref(),
            privacy_information_url: attrs.privacy_url.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallExperience {
    run_as_account: &'static str,
    device_restart_behavior: &'static str,
    max_run_time_in_minutes: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReturnCodeBody {
    return_code: i64,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct IconBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "@odata.type")]
enum DetectionRuleBody<'a> {
    #[serde(rename = "#microsoft.graph.win32LobAppProductCodeDetection")]
    #[serde(rename_all = "camelCase")]
    ProductCode {
        product_code: &'a str,
        product_version_operator: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_version: Option<&'a str>,
    },
    #[serde(rename = "#microsoft.graph.win32LobAppFileSystemDetection")]
    #[serde(rename_all = "camelCase")]
    FileSystem {
        path: &'a str,
        file_or_folder_name: &'a str,
        #[serde(rename = "check32BitOn64System")]
        check_32bit_on_64bit: bool,
        detection_type: &'static str,
    },
    #[serde(rename = "#microsoft.graph.win32LobAppRegistryDetection")]
    #[serde(rename_all = "camelCase")]
    Registry {
        key_path: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        value_name: Option<&'a str>,
        #[serde(rename = "check32BitOn64System")]
        check_32bit_on_64bit: bool,
        detection_type: &'static str,
    },
    #[serde(rename = "#microsoft.graph.win32LobAppPowerShellScriptDetection")]
    #[serde(rename_all = "camelCase")]
    PowerShellScript {
        script_content: &'a str,
        enforce_signature_check: bool,
        #[serde(rename = "runAs32Bit")]
        run_as_32bit: bool,
    },
}

impl<'a> From<&'a DetectionRule> for DetectionRuleBody<'a> {
    fn from(rule: &'a DetectionRule) -> Self {
        match rule {
            DetectionRule::MsiProductCode {
                product_code,
                product_version,
            } => Self::ProductCode {
                product_code,
                product_version_operator: if product_version.is_some() {
                    "equal"
                } else {
                    "notConfigured"
                },
                product_version: product_version.as_deref(),
            },
            DetectionRule::File {
                path,
                file_or_folder_name,
                detection,
                check_32bit_on_64bit,
            } => Self::FileSystem {
                path,
                file_or_folder_name,
                check_32bit_on_64bit: *check_32bit_on_64bit,
                detection_type: match detection {
                    FileDetectionType::Exists => "exists",
                    FileDetectionType::DoesNotExist => "doesNotExist",
                },
            },
            DetectionRule::Registry {
                key_path,
                value_name,
                detection,
                check_32bit_on_64bit,
            } => Self::Registry {
                key_path,
                value_name: value_name.as_deref(),
                check_32bit_on_64bit: *check_32bit_on_64bit,
                detection_type: match detection {
                    RegistryDetectionType::Exists => "exists",
                    RegistryDetectionType::DoesNotExist => "doesNotExist",
                },
            },
            DetectionRule::Script {
                script_content,
                enforce_signature_check,
                run_as_32bit,
            } => Self::PowerShellScript {
                script_content,
                enforce_signature_check: *enforce_signature_check,
                run_as_32bit: *run_as_32bit,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContentFileBody<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: &'a str,
    size: u64,
    size_encrypted: u64,
    manifest: Option<()>,
    is_dependency: bool,
}

impl<'a> ContentFileBody<'a> {
    pub(crate) fn new(manifest: &'a PackageManifest, encrypted_size: u64) -> Self {
        Self {
            odata_type: CONTENT_FILE,
            name: &manifest.file_name,
            size: manifest.unencrypted_size,
            size_encrypted: encrypted_size,
            manifest: None,
            is_dependency: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitFileBody<'a> {
    pub(crate) file_encryption_info: &'a FileEncryptionInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitAppBody<'a> {
    #[serde(rename = "@odata.type")]
    pub(crate) odata_type: &'static str,
    pub(crate) committed_content_version: &'a str,
}

/// Any creation response; only the identifier matters
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResponse {
    pub(crate) id: Option<String>,
}

/// Current state of a content file entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntryStatus {
    /// Raw processing state string, e.g. `azureStorageUriRequestSuccess`
    #[serde(default)]
    pub upload_state: Option<String>,
    /// Pre-authorized storage URI, present once negotiation succeeds
    #[serde(default)]
    pub azure_storage_uri: Option<String>,
    #[serde(default)]
    pub azure_storage_uri_expiration_date_time: Option<String>,
}

impl FileEntryStatus {
    /// Storage URI, treating an empty string as absent
    #[must_use]
    pub fn storage_uri(&self) -> Option<&str> {
        self.azure_storage_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobup_types::{Architecture, ReturnCode};
    use serde_json::json;

    fn manifest() -> PackageManifest {
        PackageManifest {
            file_name: "IntunePackage.intunewin".into(),
            unencrypted_size: 1024,
            encryption_key: "k".into(),
            mac_key: "m".into(),
            initialization_vector: "iv".into(),
            mac: "mac".into(),
            file_digest: "d".into(),
            file_digest_algorithm: "SHA256".into(),
            profile_identifier: "ProfileVersion1".into(),
            name: None,
            setup_file: Some("setup.exe".into()),
            tool_version: None,
            msi_info: None,
        }
    }

    fn attrs() -> AppAttributes {
        AppAttributes {
            display_name: "Tool".into(),
            description: "A tool".into(),
            publisher: "Acme".into(),
            display_version: None,
            install_command: "setup.exe /S".into(),
            uninstall_command: "uninstall.exe /S".into(),
            setup_file_path: None,
            architectures: vec![Architecture::X64, Architecture::Arm64],
            minimum_os: "1607".into(),
            install_context: InstallContext::User,
            restart_behavior: RestartBehavior::Suppress,
            max_run_time_minutes: 30,
            return_codes: vec![ReturnCode::new(3010, ReturnCodeType::SoftReboot)],
            detection_rules: vec![
                DetectionRule::File {
                    path: "C:\\Program Files\\Tool".into(),
                    file_or_folder_name: "tool.exe".into(),
                    detection: FileDetectionType::Exists,
                    check_32bit_on_64bit: false,
                },
                DetectionRule::MsiProductCode {
                    product_code: "{ABC}".into(),
                    product_version: None,
                },
            ],
            icon: None,
            notes: None,
            owner: None,
            developer: None,
            information_url: None,
            privacy_url: None,
        }
    }

    #[test]
    fn test_app_body_wire_shape() {
        let attrs = attrs();
        let manifest = manifest();
        let body = serde_json::to_value(Win32LobAppBody::new(&attrs, &manifest)).unwrap();

        assert_eq!(body["@odata.type"], WIN32_LOB_APP);
        assert_eq!(body["fileName"], "IntunePackage.intunewin");
        assert_eq!(body["setupFilePath"], "setup.exe");
        assert_eq!(body["applicableArchitectures"], "x64,arm64");
        assert_eq!(
            body["installExperience"],
            json!({"runAsAccount": "user", "deviceRestartBehavior": "suppress", "maxRunTimeInMinutes": 30})
        );
        assert_eq!(body["returnCodes"], json!([{"returnCode": 3010, "type": "softReboot"}]));
        assert_eq!(
            body["detectionRules"][0]["@odata.type"],
            "#microsoft.graph.win32LobAppFileSystemDetection"
        );
        assert_eq!(body["detectionRules"][0]["check32BitOn64System"], false);
        assert_eq!(body["detectionRules"][1]["productVersionOperator"], "notConfigured");
        assert!(body.get("largeIcon").is_none());
    }

    #[test]
    fn test_display_version_falls_back_to_msi_product_version() {
        let attrs = attrs();
        let mut manifest = manifest();
        manifest.msi_info = Some(lobup_types::MsiInfo {
            product_version: Some("2.4.1".into()),
            ..Default::default()
        });
        let body = serde_json::to_value(Win32LobAppBody::new(&attrs, &manifest)).unwrap();
        assert_eq!(body["displayVersion"], "2.4.1");
    }

    #[test]
    fn test_content_file_body() {
        let manifest = manifest();
        let body = serde_json::to_value(ContentFileBody::new(&manifest, 2048)).unwrap();
        assert_eq!(
            body,
            json!({
                "@odata.type": CONTENT_FILE,
                "name": "IntunePackage.intunewin",
                "size": 1024,
                "sizeEncrypted": 2048,
                "manifest": null,
                "isDependency": false
            })
        );
    }

    #[test]
    fn test_empty_storage_uri_is_absent() {
        let status: FileEntryStatus =
            serde_json::from_value(json!({"uploadState": "azureStorageUriRequestSuccess", "azureStorageUri": ""}))
                .unwrap();
        assert_eq!(status.storage_uri(), None);
    }
}
