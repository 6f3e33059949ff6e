#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the lobup upload pipeline
//!
//! This crate provides the data model shared by the archive extractor, the
//! registry/storage clients, and the pipeline orchestrator.

pub mod app;
pub mod ids;
pub mod manifest;
pub mod session;
pub mod stage;
pub mod upload_state;

// Re-export commonly used types
pub use app::{
    AppAttributes, Architecture, DetectionRule, FileDetectionType, InstallContext, LargeIcon,
    RegistryDetectionType, RestartBehavior, ReturnCode, ReturnCodeType,
};
pub use ids::{AppId, ContentVersionId, FileId, UploadTarget};
pub use manifest::{FileEncryptionInfo, MsiInfo, PackageManifest};
pub use session::StorageSession;
pub use stage::PipelineStage;
pub use upload_state::{StageOutcome, UploadStage};
