//! Application attributes supplied by the caller
//!
//! These describe the logical application object created in the registry.
//! They deserialize from a TOML or JSON descriptor using snake_case keys;
//! conversion to the registry wire format lives in the network crate.

use serde::{Deserialize, Serialize};

/// Attributes of the application object to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAttributes {
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub publisher: String,
    #[serde(default)]
    pub display_version: Option<String>,
    pub install_command: String,
    pub uninstall_command: String,
    /// Installer entry point inside the package; defaults to the manifest's setup file
    #[serde(default)]
    pub setup_file_path: Option<String>,
    #[serde(default)]
    pub architectures: Vec<Architecture>,
    #[serde(default = "default_minimum_os")]
    pub minimum_os: String,
    #[serde(default)]
    pub install_context: InstallContext,
    #[serde(default)]
    pub restart_behavior: RestartBehavior,
    #[serde(default = "default_max_run_time")]
    pub max_run_time_minutes: u32,
    #[serde(default = "ReturnCode::defaults")]
    pub return_codes: Vec<ReturnCode>,
    pub detection_rules: Vec<DetectionRule>,
    #[serde(default)]
    pub icon: Option<LargeIcon>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub information_url: Option<String>,
    #[serde(default)]
    pub privacy_url: Option<String>,
}

fn default_minimum_os() -> String {
    "1607".to_string()
}

fn default_max_run_time() -> u32 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    Arm64,
}

impl Architecture {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Account the installer runs as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallContext {
    #[default]
    System,
    User,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartBehavior {
    #[default]
    BasedOnReturnCode,
    Allow,
    Suppress,
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCodeType {
    Success,
    SoftReboot,
    HardReboot,
    Retry,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCode {
    pub code: i64,
    #[serde(rename = "type")]
    pub kind: ReturnCodeType,
}

impl ReturnCode {
    /// Standard Windows installer exit codes
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(0, ReturnCodeType::Success),
            Self::new(1707, ReturnCodeType::Success),
            Self::new(3010, ReturnCodeType::SoftReboot),
            Self::new(1641, ReturnCodeType::HardReboot),
            Self::new(1618, ReturnCodeType::Retry),
        ]
    }

    #[must_use]
    pub fn new(code: i64, kind: ReturnCodeType) -> Self {
        Self { code, kind }
    }
}

/// Rule the device agent evaluates to decide whether the app is installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionRule {
    MsiProductCode {
        product_code: String,
        #[serde(default)]
        product_version: Option<String>,
    },
    File {
        path: String,
        file_or_folder_name: String,
        detection: FileDetectionType,
        #[serde(default)]
        check_32bit_on_64bit: bool,
    },
    Registry {
        key_path: String,
        #[serde(default)]
        value_name: Option<String>,
        detection: RegistryDetectionType,
        #[serde(default)]
        check_32bit_on_64bit: bool,
    },
    Script {
        /// Base64-encoded PowerShell script
        script_content: String,
        #[serde(default)]
        enforce_signature_check: bool,
        #[serde(default)]
        run_as_32bit: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileDetectionType {
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryDetectionType {
    Exists,
    DoesNotExist,
}

/// Application icon, already base64-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeIcon {
    #[serde(default = "default_icon_type")]
    pub mime_type: String,
    pub base64: String,
}

fn default_icon_type() -> String {
    "image/png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_toml() {
        let attrs: AppAttributes = toml::from_str(
            r#"
display_name = "7-Zip"
publisher = "Igor Pavlov"
install_command = "msiexec /i 7z.msi /qn"
uninstall_command = "msiexec /x {23170F69-40C1-2702-2409-000001000000} /qn"
architectures = ["x64"]

[[detection_rules]]
kind = "msi_product_code"
product_code = "{23170F69-40C1-2702-2409-000001000000}"
"#,
        )
        .unwrap();

        assert_eq!(attrs.display_name, "7-Zip");
        assert_eq!(attrs.architectures, vec![Architecture::X64]);
        assert_eq!(attrs.install_context, InstallContext::System);
        assert_eq!(attrs.return_codes, ReturnCode::defaults());
        assert_eq!(attrs.minimum_os, "1607");
        assert!(matches!(
            attrs.detection_rules[0],
            DetectionRule::MsiProductCode { .. }
        ));
    }
}
