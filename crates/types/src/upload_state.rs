//! Server-reported upload states
//!
//! The registry reports progress through a single `uploadState` string built
//! from a stage prefix and an outcome suffix, e.g. `commitFileSuccess`.
//! Matching is case-insensitive; strings that do not match any known
//! stage/outcome pair are left to the caller to treat as unknown.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named server-side processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStage {
    AzureStorageUriRequest,
    AzureStorageUriRenewal,
    CommitFile,
}

impl UploadStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzureStorageUriRequest => "AzureStorageUriRequest",
            Self::AzureStorageUriRenewal => "AzureStorageUriRenewal",
            Self::CommitFile => "CommitFile",
        }
    }

    /// Interpret an observed `uploadState` string for this stage.
    ///
    /// Returns `None` when the string is not `{stage}{outcome}` for a known
    /// outcome, including states that belong to a different stage.
    #[must_use]
    pub fn classify(self, observed: &str) -> Option<StageOutcome> {
        let observed = observed.trim();
        let prefix = self.as_str();
        if observed.len() <= prefix.len() || !observed.is_char_boundary(prefix.len()) {
            return None;
        }
        let (head, tail) = observed.split_at(prefix.len());
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        StageOutcome::parse(tail)
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome suffix of an upload state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageOutcome {
    Pending,
    Success,
    Failed,
    TimedOut,
}

impl StageOutcome {
    fn parse(suffix: &str) -> Option<Self> {
        [Self::Pending, Self::Success, Self::Failed, Self::TimedOut]
            .into_iter()
            .find(|outcome| suffix.eq_ignore_ascii_case(outcome.as_str()))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::TimedOut => "TimedOut",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let stage = UploadStage::AzureStorageUriRequest;
        assert_eq!(
            stage.classify("azureStorageUriRequestSuccess"),
            Some(StageOutcome::Success)
        );
        assert_eq!(
            stage.classify("AZURESTORAGEURIREQUESTPENDING"),
            Some(StageOutcome::Pending)
        );
        assert_eq!(
            UploadStage::CommitFile.classify("commitFileTimedOut"),
            Some(StageOutcome::TimedOut)
        );
    }

    #[test]
    fn test_classify_rejects_other_stages_and_garbage() {
        let stage = UploadStage::CommitFile;
        assert_eq!(stage.classify("azureStorageUriRequestSuccess"), None);
        assert_eq!(stage.classify("commitFile"), None);
        assert_eq!(stage.classify("commitFileQueued"), None);
        assert_eq!(stage.classify(""), None);
        assert_eq!(stage.classify("é"), None);
    }

    #[test]
    fn test_renewal_is_distinct_from_request() {
        assert_eq!(
            UploadStage::AzureStorageUriRequest.classify("azureStorageUriRenewalSuccess"),
            None
        );
        assert_eq!(
            UploadStage::AzureStorageUriRenewal.classify("azureStorageUriRenewalFailed"),
            Some(StageOutcome::Failed)
        );
    }
}
