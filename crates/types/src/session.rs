//! Time-boxed object storage session

use std::time::{Duration, Instant};

/// A signed, time-boxed URL granting write access to one blob.
///
/// Sessions are never mutated; renewal produces a new value that replaces the
/// old one for every later chunk.
#[derive(Debug, Clone)]
pub struct StorageSession {
    sas_uri: String,
    issued_at: Instant,
}

impl StorageSession {
    #[must_use]
    pub fn new(sas_uri: impl Into<String>) -> Self {
        Self {
            sas_uri: sas_uri.into(),
            issued_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn sas_uri(&self) -> &str {
        &self.sas_uri
    }

    /// Time since this session's URI was handed out
    #[must_use]
    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }
}
