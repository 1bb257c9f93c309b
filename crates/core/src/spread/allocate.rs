// Day window allocation and rebalancing.
//
// Each day bin gets a randomized wall-clock window; commits inside a bin
// are placed by a cursor that advances proportionally to each commit's
// weight. A commit that would land past the end of its window triggers the
// rebalancer: grow the day backward an hour, or hand the commit to the
// next day, then re-run the day from its first commit. The retry loop is
// explicit and bounded.

use std::collections::VecDeque;

use chrono::{Duration, NaiveDateTime, Timelike};
use rand::Rng;
use tracing::{debug, warn};

use cadence_common::types::{Commit, ScheduleEntry};

use super::error::SpreadError;
use super::SpreadOptions;

/// A normal day never ends after this local hour.
const EVENING_CUTOFF_HOUR: u32 = 19;

/// Growth walks a day's start back one hour at a time and can reach at
/// most midnight, so this many growth retries always suffice. Deferrals
/// are additionally bounded by the bin size; the combined budget is a
/// backstop against a non-converging loop.
const MAX_GROWTH_RETRIES: usize = 24;

/// Proportional cursor allocation over one window spanning the whole
/// schedule, for spans shorter than two calendar days.
///
/// The first commit lands exactly on `start_at` and consumes none of the
/// spread, so with two or more commits the assigned span always ends
/// slightly short of `end_at`. Callers rely on the first timestamp
/// matching the window start; keep that property.
pub fn single_window(
    commits: &[Commit],
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
) -> Vec<ScheduleEntry> {
    let spread = (end_at - start_at).num_seconds() as f64;
    let total: u64 = commits.iter().map(|c| c.weight).sum();

    let mut cursor = start_at;
    let mut entries = Vec::with_capacity(commits.len());
    for (position, commit) in commits.iter().enumerate() {
        if position > 0 && total > 0 {
            let offset = commit.weight as f64 / total as f64 * spread;
            cursor += Duration::milliseconds((offset * 1000.0) as i64);
        }
        entries.push(ScheduleEntry { commit: commit.clone(), assigned_at: cursor });
    }
    entries
}

/// What one allocation attempt over a single day decided.
enum DayAttempt {
    /// Every commit fit; the day is finished.
    Scheduled(Vec<ScheduleEntry>),
    /// The day must start an hour earlier and be re-run.
    Grow { commit: String },
    /// The commit at this position must move to the next day and the day
    /// re-run without it.
    Defer { position: usize, commit: String },
}

/// Allocate timestamps for every bin, one simulated workday per bin.
pub fn multi_day<R: Rng>(
    mut bins: Vec<VecDeque<Commit>>,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    options: &SpreadOptions,
    rng: &mut R,
) -> Result<Vec<ScheduleEntry>, SpreadError> {
    let day_count = bins.len();
    let mut entries = Vec::new();
    let mut day_start = start_at;
    let mut long_day = false;

    for day in 0..day_count {
        let is_last = day == day_count - 1;
        let mut retries = MAX_GROWTH_RETRIES + bins[day].len();

        loop {
            // Growth may not cross the day's midnight, nor reach before
            // the global window start.
            let growth_floor = midnight(day_start).max(start_at);
            let attempt = allocate_day(
                &bins[day],
                day,
                is_last,
                day_start,
                end_at,
                long_day,
                options.extended_windows,
                growth_floor,
                rng,
            )?;

            match attempt {
                DayAttempt::Scheduled(day_entries) => {
                    entries.extend(day_entries);
                    break;
                }
                DayAttempt::Grow { commit } => {
                    if retries == 0 {
                        return Err(SpreadError::RetryBudgetExceeded { day, commit });
                    }
                    day_start -= Duration::hours(1);
                    long_day = true;
                    debug!(day, %day_start, "growing day window");
                }
                DayAttempt::Defer { position, commit } => {
                    if retries == 0 {
                        return Err(SpreadError::RetryBudgetExceeded { day, commit });
                    }
                    warn!(day, commit = %commit, "moving commit to the next day");
                    defer_commit(&mut bins, day, position);
                }
            }
            retries -= 1;
        }

        day_start = next_morning(day_start, end_at, rng);
        long_day = false;
    }

    Ok(entries)
}

/// One allocation attempt for a single day bin.
#[allow(clippy::too_many_arguments)]
fn allocate_day<R: Rng>(
    bin: &VecDeque<Commit>,
    day: usize,
    is_last: bool,
    day_start: NaiveDateTime,
    end_at: NaiveDateTime,
    long_day: bool,
    allow_growth: bool,
    growth_floor: NaiveDateTime,
    rng: &mut R,
) -> Result<DayAttempt, SpreadError> {
    let mut day_end = day_start + Duration::hours(rng.gen_range(5..=9));
    if long_day {
        day_end += Duration::hours(rng.gen_range(0..=3));
    }
    while day_end.hour() > EVENING_CUTOFF_HOUR && !long_day {
        day_end -= Duration::hours(1);
    }
    while day_end.date() > day_start.date() {
        day_end -= Duration::hours(1);
    }
    day_end = day_end.min(end_at);
    if day_end <= day_start {
        return Err(SpreadError::EmptyDayWindow { day });
    }
    debug!(
        day,
        start = %day_start.format("%m/%d/%Y %I:%M %p"),
        end = %day_end.format("%m/%d/%Y %I:%M %p"),
        "day window"
    );

    let spread = (day_end - day_start).num_seconds() as f64;
    let total: u64 = bin.iter().map(|c| c.weight).sum();
    let mut cursor = day_start;
    let mut scheduled = Vec::with_capacity(bin.len());

    for (position, commit) in bin.iter().enumerate() {
        if total > 0 {
            let offset = (commit.weight as f64 / total as f64 * spread).round() as i64;
            cursor += Duration::seconds(offset);
        }
        if cursor > day_end {
            warn!(
                commit = %commit.short_id(),
                day,
                at = %cursor.format("%m/%d/%Y %I:%M %p"),
                "commit does not fit in its day window"
            );
            if is_last {
                // Out of days: pin the stragglers to the end of the window.
                cursor = day_end;
            } else if allow_growth && day_start - Duration::hours(1) >= growth_floor {
                return Ok(DayAttempt::Grow { commit: commit.id.clone() });
            } else {
                return Ok(DayAttempt::Defer { position, commit: commit.id.clone() });
            }
        }
        scheduled.push(ScheduleEntry { commit: commit.clone(), assigned_at: cursor });
    }

    Ok(DayAttempt::Scheduled(scheduled))
}

/// Move the commit at `position` in `bins[day]` into the next day's bin,
/// keeping that bin ordered by sequence index.
fn defer_commit(bins: &mut [VecDeque<Commit>], day: usize, position: usize) {
    let Some(commit) = bins[day].remove(position) else {
        return;
    };
    let next = &mut bins[day + 1];
    let insert_at = next
        .iter()
        .position(|c| c.sequence_index > commit.sequence_index)
        .unwrap_or(next.len());
    next.insert(insert_at, commit);
}

/// The start of the next simulated workday: the following midnight plus a
/// randomized morning offset, never past the end of the schedule.
fn next_morning<R: Rng>(
    day_start: NaiveDateTime,
    end_at: NaiveDateTime,
    rng: &mut R,
) -> NaiveDateTime {
    let morning = midnight(day_start)
        + Duration::days(1)
        + Duration::hours(rng.gen_range(8..=11))
        + Duration::minutes(rng.gen_range(1..=55))
        + Duration::seconds(rng.gen_range(1..=55));
    morning.min(end_at)
}

fn midnight(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_hms_opt(0, 0, 0).expect("midnight is always a valid time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn commit(index: usize, weight: u64) -> Commit {
        Commit {
            id: format!("{index:040x}"),
            weight,
            origin_dir: "repo".to_string(),
            message: format!("change {index}"),
            sequence_index: index,
        }
    }

    fn commits(weights: &[u64]) -> Vec<Commit> {
        weights.iter().enumerate().map(|(i, &w)| commit(i, w)).collect()
    }

    // ── single_window ─────────────────────────────────────────────────

    #[test]
    fn single_window_places_commits_proportionally() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = start + Duration::seconds(3600);
        let entries = single_window(&commits(&[10, 20, 30]), start, end);

        assert_eq!(entries[0].assigned_at, start);
        assert_eq!(entries[1].assigned_at, start + Duration::seconds(1200));
        assert_eq!(entries[2].assigned_at, start + Duration::seconds(3000));
    }

    #[test]
    fn single_window_first_commit_consumes_no_spread() {
        // With two or more commits the assigned span stays strictly short
        // of the window end. Long-standing behavior; not a bug.
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = start + Duration::seconds(600);
        let entries = single_window(&commits(&[50, 50]), start, end);
        assert_eq!(entries[0].assigned_at, start);
        assert_eq!(entries[1].assigned_at, start + Duration::seconds(300));
        assert!(entries.last().unwrap().assigned_at < end);
    }

    #[test]
    fn single_window_lone_commit_lands_on_start() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let entries = single_window(&commits(&[500]), start, start + Duration::hours(3));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].assigned_at, start);
    }

    #[test]
    fn single_window_zero_total_weight_stacks_on_start() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let entries = single_window(&commits(&[0, 0, 0]), start, start + Duration::hours(1));
        assert!(entries.iter().all(|e| e.assigned_at == start));
    }

    #[test]
    fn single_window_is_monotonic() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let entries = single_window(&commits(&[7, 3, 11, 2, 9]), start, start + Duration::hours(8));
        for pair in entries.windows(2) {
            assert!(pair[0].assigned_at <= pair[1].assigned_at);
        }
    }

    // ── multi_day ─────────────────────────────────────────────────────

    fn bins_of(groups: &[&[u64]]) -> Vec<VecDeque<Commit>> {
        let mut index = 0;
        groups
            .iter()
            .map(|weights| {
                weights
                    .iter()
                    .map(|&w| {
                        let c = commit(index, w);
                        index += 1;
                        c
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn multi_day_keeps_entries_inside_the_global_window() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 8, 18, 0, 0);
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bins = bins_of(&[&[10, 20], &[5, 5, 5], &[30], &[1, 2, 3]]);
            let entries =
                multi_day(bins, start, end, &SpreadOptions::default(), &mut rng).unwrap();
            assert_eq!(entries.len(), 9, "seed {seed}");
            for entry in &entries {
                assert!(entry.assigned_at >= start, "seed {seed}: {entry:?}");
                assert!(entry.assigned_at <= end, "seed {seed}: {entry:?}");
            }
        }
    }

    #[test]
    fn multi_day_is_monotonic_in_allocation_order() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 10, 18, 0, 0);
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bins = bins_of(&[&[100, 1, 40], &[7, 7, 7, 7], &[250]]);
            let entries =
                multi_day(bins, start, end, &SpreadOptions::default(), &mut rng).unwrap();
            for pair in entries.windows(2) {
                assert!(
                    pair[0].assigned_at <= pair[1].assigned_at,
                    "seed {seed}: {pair:?}"
                );
            }
        }
    }

    #[test]
    fn multi_day_loses_and_duplicates_nothing() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 9, 18, 0, 0);
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bins = bins_of(&[&[3, 1, 4, 1], &[5, 9, 2], &[6, 5, 3]]);
            let entries =
                multi_day(bins, start, end, &SpreadOptions::default(), &mut rng).unwrap();
            let mut indexes: Vec<usize> =
                entries.iter().map(|e| e.commit.sequence_index).collect();
            indexes.sort_unstable();
            assert_eq!(indexes, (0..10).collect::<Vec<_>>(), "seed {seed}");
        }
    }

    #[test]
    fn multi_day_with_seeded_rng_is_reproducible() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 8, 18, 0, 0);
        let run = || {
            let mut rng = StdRng::seed_from_u64(42);
            let bins = bins_of(&[&[10, 20], &[5, 5, 5]]);
            multi_day(bins, start, end, &SpreadOptions::default(), &mut rng).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn collapsed_first_day_fails_with_empty_window() {
        // A day starting at 23:30 leaves no room before the calendar-day
        // clamp pulls the window end back onto its start, whatever the
        // drawn day length.
        let start = at(2024, 5, 1, 23, 30, 0);
        let end = at(2024, 5, 3, 12, 0, 0);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bins = bins_of(&[&[10, 20], &[5, 5]]);
            let error = multi_day(bins, start, end, &SpreadOptions::default(), &mut rng)
                .unwrap_err();
            assert_eq!(error, SpreadError::EmptyDayWindow { day: 0 }, "seed {seed}");
        }
    }

    #[test]
    fn day_start_clamped_to_schedule_end_fails_rather_than_inverts() {
        // The third day starts after the schedule already ended, so its
        // window clamps to nothing.
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 3, 6, 0, 0);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bins = bins_of(&[&[10], &[10], &[10]]);
            let error = multi_day(bins, start, end, &SpreadOptions::default(), &mut rng)
                .unwrap_err();
            assert!(
                matches!(error, SpreadError::EmptyDayWindow { .. }),
                "seed {seed}: {error:?}"
            );
        }
    }

    // ── rebalancing mechanics ─────────────────────────────────────────

    #[test]
    fn defer_moves_commit_to_front_of_next_bin() {
        let mut bins = bins_of(&[&[1, 2, 3], &[4, 5]]);
        defer_commit(&mut bins, 0, 2);
        let next: Vec<usize> = bins[1].iter().map(|c| c.sequence_index).collect();
        assert_eq!(bins[0].len(), 2);
        assert_eq!(next, vec![2, 3, 4]);
    }

    #[test]
    fn repeated_defers_keep_the_next_bin_in_sequence_order() {
        let mut bins = bins_of(&[&[1, 2, 3, 4], &[5, 6]]);
        // Defer the commit at position 2 (sequence 2), then the one now at
        // position 2 (sequence 3), then the one at position 1 (sequence 1).
        defer_commit(&mut bins, 0, 2);
        defer_commit(&mut bins, 0, 2);
        defer_commit(&mut bins, 0, 1);
        let next: Vec<usize> = bins[1].iter().map(|c| c.sequence_index).collect();
        assert_eq!(next, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn next_morning_lands_in_the_expected_range() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 6, 1, 0, 0, 0);
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let morning = next_morning(start, end, &mut rng);
            assert_eq!(morning.date(), at(2024, 5, 2, 0, 0, 0).date());
            let offset = morning - at(2024, 5, 2, 0, 0, 0);
            assert!(offset >= Duration::hours(8) + Duration::minutes(1) + Duration::seconds(1));
            assert!(offset <= Duration::hours(11) + Duration::minutes(55) + Duration::seconds(55));
        }
    }

    #[test]
    fn next_morning_never_passes_the_schedule_end() {
        let start = at(2024, 5, 1, 9, 0, 0);
        let end = at(2024, 5, 2, 6, 0, 0);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(next_morning(start, end, &mut rng), end);
    }

    #[test]
    fn midnight_truncates_to_start_of_day() {
        assert_eq!(midnight(at(2024, 5, 1, 17, 45, 12)), at(2024, 5, 1, 0, 0, 0));
    }
}
