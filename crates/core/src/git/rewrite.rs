// History rewrite: apply a computed schedule with `git filter-branch`.

use std::path::Path;

use tracing::info;

use cadence_common::types::{Schedule, ScheduleEntry};

use super::worker::{CommandExecutor, GitWorker, GitWorkerError};

/// Timestamp format understood by `GIT_AUTHOR_DATE`/`GIT_COMMITTER_DATE`,
/// interpreted in the local timezone.
const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ALIGN_COMMITTER_DATE_FILTER: &str = "GIT_COMMITTER_DATE=$GIT_AUTHOR_DATE";

/// Rewrite each directory's unpublished range so author and committer
/// dates match the schedule.
pub fn apply_schedule<E>(
    schedule: &Schedule,
    sign: bool,
    executor: &E,
) -> Result<(), GitWorkerError>
where
    E: CommandExecutor + Clone,
{
    for dir_schedule in &schedule.directories {
        if dir_schedule.entries.is_empty() {
            continue;
        }
        info!(
            directory = %dir_schedule.directory,
            commits = dir_schedule.entries.len(),
            "rewriting commit dates"
        );
        let worker = GitWorker::with_executor(&dir_schedule.directory, executor.clone());
        let script = env_filter_script(&dir_schedule.entries);
        worker.filter_branch(&script, dir_schedule.entries.len(), sign)?;
        info!(directory = %dir_schedule.directory, "spread out commits");
    }
    Ok(())
}

/// Set committer date to author date over the last `count` commits.
pub fn align_committer_dates<E>(
    dir: &Path,
    count: usize,
    executor: &E,
) -> Result<(), GitWorkerError>
where
    E: CommandExecutor + Clone,
{
    info!(count, "aligning committer dates with author dates");
    let worker = GitWorker::with_executor(dir, executor.clone());
    worker.filter_branch(ALIGN_COMMITTER_DATE_FILTER, count, false)?;
    Ok(())
}

/// One `if` block per commit, exporting both dates when the rewrite walks
/// over that commit.
fn env_filter_script(entries: &[ScheduleEntry]) -> String {
    let mut script = String::new();
    for entry in entries {
        let stamp = entry.assigned_at.format(GIT_DATE_FORMAT);
        script.push_str(&format!(
            "\nif [ $GIT_COMMIT = {} ]\nthen\n    export GIT_AUTHOR_DATE=\"{stamp}\"\n    export GIT_COMMITTER_DATE=\"{stamp}\"\nfi",
            entry.commit.id
        ));
    }
    script
}
