// Schedule emitter: group finalized entries by origin directory.

use std::collections::BTreeMap;

use cadence_common::types::{DirectorySchedule, Schedule, ScheduleEntry};

/// Group entries by the directory their commit came from, each directory's
/// entries ordered by sequence index, ready for the history rewrite.
pub fn group_by_directory(entries: Vec<ScheduleEntry>) -> Schedule {
    let mut by_dir: BTreeMap<String, Vec<ScheduleEntry>> = BTreeMap::new();
    for entry in entries {
        by_dir.entry(entry.commit.origin_dir.clone()).or_default().push(entry);
    }

    let directories = by_dir
        .into_iter()
        .map(|(directory, mut entries)| {
            entries.sort_by_key(|e| e.commit.sequence_index);
            DirectorySchedule { directory, entries }
        })
        .collect();

    Schedule { directories }
}
