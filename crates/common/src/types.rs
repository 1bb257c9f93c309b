// Core domain types shared across all cadence crates.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One unpublished commit as gathered from a repository.
///
/// Immutable once the ledger is built; everything downstream of gathering
/// only reads these fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    /// Full commit hash.
    pub id: String,
    /// Size proxy: lines changed by the commit, possibly jittered.
    pub weight: u64,
    /// Repository directory the commit came from.
    pub origin_dir: String,
    /// Subject line, for display only.
    pub message: String,
    /// Position in the merged ledger. Never changes after gathering.
    pub sequence_index: usize,
}

impl Commit {
    /// Abbreviated hash for log lines and human output.
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(7);
        &self.id[..end]
    }

    /// Last path component of the origin directory.
    pub fn friendly_dir(&self) -> &str {
        self.origin_dir.rsplit('/').next().unwrap_or(&self.origin_dir)
    }
}

/// A commit together with its assigned synthetic timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub commit: Commit,
    /// Wall-clock instant the commit should appear to have been authored.
    pub assigned_at: NaiveDateTime,
}

/// All entries for one repository directory, ordered by sequence index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectorySchedule {
    pub directory: String,
    pub entries: Vec<ScheduleEntry>,
}

/// Terminal output of a spread run: per-directory timestamp assignments,
/// ready to hand to the history rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub directories: Vec<DirectorySchedule>,
}

impl Schedule {
    /// Total number of scheduled commits across all directories.
    pub fn len(&self) -> usize {
        self.directories.iter().map(|d| d.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.iter().all(|d| d.entries.is_empty())
    }

    /// Iterate over every entry regardless of directory.
    pub fn entries(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.directories.iter().flat_map(|d| d.entries.iter())
    }
}
