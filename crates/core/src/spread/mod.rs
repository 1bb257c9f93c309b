// Commit timeline redistribution.
//
// Takes the gathered ledger of unpublished commits and computes a synthetic
// timestamp for each one so that, once history is rewritten, the work
// appears spread continuously across the requested window instead of
// landing in one burst. Short windows get a single proportional pass;
// longer windows are partitioned into simulated workdays.

pub mod allocate;
pub mod emit;
pub mod error;
pub mod partition;

pub use error::SpreadError;

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use tracing::info;

use cadence_common::span::format_span;
use cadence_common::types::{Commit, Schedule};

/// Tuning knobs for a spread run.
#[derive(Debug, Clone)]
pub struct SpreadOptions {
    /// Allow an overflowing day to grow past the evening cutoff instead of
    /// immediately pushing work into the next day.
    pub extended_windows: bool,
}

impl Default for SpreadOptions {
    fn default() -> Self {
        Self { extended_windows: true }
    }
}

/// Derive the global schedule window from a look-back span.
///
/// `start_at` is clipped forward so the rewritten timeline never reaches
/// behind the last published commit. Returns the window and whether
/// clipping happened.
pub fn schedule_window(
    now: NaiveDateTime,
    span: Duration,
    last_published: Option<NaiveDateTime>,
) -> (NaiveDateTime, NaiveDateTime, bool) {
    let requested = now - span;
    match last_published {
        Some(last) if requested < last => (last, now, true),
        _ => (requested, now, false),
    }
}

/// Compute a timestamp for every commit in the ledger.
///
/// The ledger must already be in the order the commits should appear in
/// history; that order is never changed, only the timestamps are chosen.
/// An empty ledger yields an empty schedule. Day-length and morning-offset
/// draws come from `rng`, so a seeded generator reproduces a schedule
/// exactly.
pub fn spread_commits<R: Rng>(
    commits: &[Commit],
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    options: &SpreadOptions,
    rng: &mut R,
) -> Result<Schedule, SpreadError> {
    if commits.is_empty() {
        return Ok(Schedule::default());
    }

    let span_days = (end_at.date() - start_at.date()).num_days();
    info!(
        commits = commits.len(),
        span = %format_span(end_at - start_at),
        start = %start_at.format("%m/%d/%Y %H:%M:%S"),
        end = %end_at.format("%m/%d/%Y %H:%M:%S"),
        "spreading commits"
    );

    let entries = if span_days < 2 {
        allocate::single_window(commits, start_at, end_at)
    } else {
        let bins = partition::by_day(commits, span_days as usize);
        allocate::multi_day(bins, start_at, end_at, options, rng)?
    };

    Ok(emit::group_by_directory(entries))
}
