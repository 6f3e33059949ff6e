//! Pipeline stages and their progress checkpoints

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential steps of one upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ExtractMetadata,
    CreateApplication,
    CreateContentVersion,
    CreateFileEntry,
    NegotiateStorage,
    UploadChunks,
    CommitFile,
    AwaitCommit,
    CommitApplication,
    Cleanup,
}

impl PipelineStage {
    /// All stages in execution order
    pub const ALL: [PipelineStage; 10] = [
        Self::ExtractMetadata,
        Self::CreateApplication,
        Self::CreateContentVersion,
        Self::CreateFileEntry,
        Self::NegotiateStorage,
        Self::UploadChunks,
        Self::CommitFile,
        Self::AwaitCommit,
        Self::CommitApplication,
        Self::Cleanup,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractMetadata => "extract metadata",
            Self::CreateApplication => "create application",
            Self::CreateContentVersion => "create content version",
            Self::CreateFileEntry => "create file entry",
            Self::NegotiateStorage => "negotiate storage",
            Self::UploadChunks => "upload chunks",
            Self::CommitFile => "commit file",
            Self::AwaitCommit => "await commit",
            Self::CommitApplication => "commit application",
            Self::Cleanup => "cleanup",
        }
    }

    /// Percentage reported when the stage starts
    #[must_use]
    pub fn start_percent(self) -> u8 {
        match self {
            Self::ExtractMetadata => 0,
            Self::CreateApplication => 5,
            Self::CreateContentVersion => 10,
            Self::CreateFileEntry => 15,
            Self::NegotiateStorage => 20,
            Self::UploadChunks => 25,
            Self::CommitFile => 85,
            Self::AwaitCommit => 90,
            Self::CommitApplication => 95,
            Self::Cleanup => 99,
        }
    }

    /// Percentage reported when the stage completes
    #[must_use]
    pub fn end_percent(self) -> u8 {
        match self {
            Self::Cleanup => 100,
            stage => Self::ALL
                .iter()
                .skip_while(|s| **s != stage)
                .nth(1)
                .map_or(100, |next| next.start_percent()),
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
