// Ledger gathering: turn unpushed commits across one or more repositories
// into the ordered, weighted input the spread engine consumes.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{info, warn};

use cadence_common::types::Commit;

use super::is_repo;
use super::worker::{CommandExecutor, GitWorker, GitWorkerError};

/// How to weigh commits while gathering.
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Randomly perturb line counts so weights do not mirror the diffs
    /// exactly.
    pub weight_jitter: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self { weight_jitter: true }
    }
}

struct PendingCommit {
    sha: String,
    weight: u64,
    dir: String,
    message: String,
    authored_at: NaiveDateTime,
}

/// Gather unpushed commits from every repository directory into one
/// ledger, merged oldest-first, with sequence indexes assigned after the
/// merge.
///
/// With a `cutoff`, commits authored after that instant are listed;
/// without one, the upstream-relative unpushed range is used. Directories
/// that are not git repositories are skipped with a warning.
pub fn gather<E, R>(
    dirs: &[PathBuf],
    cutoff: Option<NaiveDateTime>,
    options: &LedgerOptions,
    executor: &E,
    rng: &mut R,
) -> Result<Vec<Commit>, GitWorkerError>
where
    E: CommandExecutor + Clone,
    R: Rng,
{
    let mut pending: Vec<PendingCommit> = Vec::new();

    for dir in dirs {
        if !is_repo(dir) {
            warn!(directory = %dir.display(), "not a git repository, skipping");
            continue;
        }
        let worker = GitWorker::with_executor(dir, executor.clone());
        let log = match cutoff {
            Some(cutoff) => worker.commits_after(cutoff)?,
            None => worker.unpushed_commits()?,
        };
        info!(directory = %dir.display(), count = log.len(), "found unpushed commits");

        for entry in log {
            let lines = worker.lines_changed(&entry.sha)?;
            let weight = if options.weight_jitter { jitter_weight(lines, rng) } else { lines };
            pending.push(PendingCommit {
                sha: entry.sha,
                weight,
                dir: dir.display().to_string(),
                message: entry.message,
                authored_at: entry.authored_at,
            });
        }
    }

    pending.sort_by_key(|c| c.authored_at);

    Ok(pending
        .into_iter()
        .enumerate()
        .map(|(sequence_index, p)| Commit {
            id: p.sha,
            weight: p.weight,
            origin_dir: p.dir,
            message: p.message,
            sequence_index,
        })
        .collect())
}

/// Perturb a line count so the weight only loosely tracks the diff size.
///
/// The result never drops below a tenth of the base (rounded up), shrinks
/// one time in five, and otherwise grows by a uniform factor of 0.1–3.4.
fn jitter_weight<R: Rng>(base: u64, rng: &mut R) -> u64 {
    let min = (base as f64 * 0.1).ceil() as u64;
    let sign = if rng.gen_range(0..5) == 0 { -1.0 } else { 1.0 };
    let change = sign * rng.gen_range(0.1..3.4);
    let adjusted = (base as f64 + base as f64 * change).ceil().max(0.0) as u64;
    min.max(adjusted)
}
