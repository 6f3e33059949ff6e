//! Integration tests for types

#[cfg(test)]
mod tests {
    use lobup_types::*;

    #[test]
    fn test_architecture_serialization() {
        let arch = Architecture::Arm64;
        let json = serde_json::to_string(&arch).unwrap();
        assert_eq!(json, r#""arm64""#);

        let deserialized: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, arch);
    }

    #[test]
    fn test_ids_are_transparent() {
        let id = AppId::new("8f2d7c1a");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""8f2d7c1a""#);
        let target = UploadTarget::new(id, "1".into(), "f-1".into());
        assert_eq!(target.to_string(), "8f2d7c1a/1/f-1");
    }

    #[test]
    fn test_stage_outcomes_round_trip_through_wire_strings() {
        for stage in [
            UploadStage::AzureStorageUriRequest,
            UploadStage::AzureStorageUriRenewal,
            UploadStage::CommitFile,
        ] {
            for outcome in [
                StageOutcome::Pending,
                StageOutcome::Success,
                StageOutcome::Failed,
                StageOutcome::TimedOut,
            ] {
                // The service sends lower camel case
                let mut wire = format!("{}{}", stage.as_str(), outcome.as_str());
                wire[..1].make_ascii_lowercase();
                assert_eq!(stage.classify(&wire), Some(outcome), "{wire}");
            }
        }
    }

    #[test]
    fn test_detection_rule_tagging() {
        let rule = DetectionRule::File {
            path: "C:\\Program Files\\Tool".into(),
            file_or_folder_name: "tool.exe".into(),
            detection: FileDetectionType::Exists,
            check_32bit_on_64bit: false,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"], "file");
        assert_eq!(json["detection"], "exists");
    }
}
