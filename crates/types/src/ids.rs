//! Opaque server-assigned identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

opaque_id!(
    /// Identifier of the logical application object
    AppId
);
opaque_id!(
    /// Identifier of a content version, scoped under one application
    ContentVersionId
);
opaque_id!(
    /// Identifier of a file entry, scoped under one content version
    FileId
);

/// Fully-qualified address of one file entry in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub app_id: AppId,
    pub content_version_id: ContentVersionId,
    pub file_id: FileId,
}

impl UploadTarget {
    #[must_use]
    pub fn new(app_id: AppId, content_version_id: ContentVersionId, file_id: FileId) -> Self {
        Self {
            app_id,
            content_version_id,
            file_id,
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.app_id, self.content_version_id, self.file_id
        )
    }
}
