//! Transfer reports
//!
//! Counters accumulated while walking a tree, returned to the caller and
//! printed by the CLI (human or JSON).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one upload invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    /// Remote folders created
    pub folders_created: u64,
    /// Existing remote folders reused (reuse mode only)
    pub folders_reused: u64,
    /// Remote items created
    pub items_created: u64,
    /// Existing remote items reused (reuse mode only)
    pub items_reused: u64,
    /// Bitstreams whose bytes were sent to the server
    pub bitstreams_uploaded: u64,
    /// Bitstreams the server linked to identical existing content
    pub bitstreams_linked: u64,
    /// Total bytes sent
    pub bytes_uploaded: u64,
    /// Upload callback invocations, summed over all callbacks
    pub callbacks_invoked: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadReport {
    /// Starts an empty report timestamped now
    pub fn start() -> Self {
        Self {
            folders_created: 0,
            folders_reused: 0,
            items_created: 0,
            items_reused: 0,
            bitstreams_uploaded: 0,
            bitstreams_linked: 0,
            bytes_uploaded: 0,
            callbacks_invoked: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Stamps the completion time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Adds the counters of `other` into `self`, keeping the earlier start time
    pub fn merge(&mut self, other: &UploadReport) {
        self.folders_created += other.folders_created;
        self.folders_reused += other.folders_reused;
        self.items_created += other.items_created;
        self.items_reused += other.items_reused;
        self.bitstreams_uploaded += other.bitstreams_uploaded;
        self.bitstreams_linked += other.bitstreams_linked;
        self.bytes_uploaded += other.bytes_uploaded;
        self.callbacks_invoked += other.callbacks_invoked;
        self.started_at = self.started_at.min(other.started_at);
    }

    /// Items touched, created or reused
    pub fn items(&self) -> u64 {
        self.items_created + self.items_reused
    }

    /// Bitstreams added to items, uploaded or linked
    pub fn bitstreams(&self) -> u64 {
        self.bitstreams_uploaded + self.bitstreams_linked
    }
}

/// Summary of one download invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Local directories created
    pub folders_created: u64,
    /// Files written
    pub files_written: u64,
    /// Total bytes written
    pub bytes_written: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadReport {
    pub fn start() -> Self {
        Self {
            folders_created: 0,
            files_written: 0,
            bytes_written: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
