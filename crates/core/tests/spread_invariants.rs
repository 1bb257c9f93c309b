// End-to-end invariants of the spread engine across many seeds.

use cadence_core::spread::{spread_commits, SpreadError, SpreadOptions};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cadence_common::types::Commit;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
}

fn ledger(weights: &[u64]) -> Vec<Commit> {
    weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| Commit {
            id: format!("{index:040x}"),
            weight,
            origin_dir: if index % 3 == 0 { "api".to_string() } else { "web".to_string() },
            message: format!("change {index}"),
            sequence_index: index,
        })
        .collect()
}

#[test]
fn single_day_assignment_is_exact() {
    let start = at(2024, 5, 1, 9, 0, 0);
    let end = start + Duration::seconds(3600);
    let commits: Vec<Commit> = ledger(&[10, 20, 30])
        .into_iter()
        .map(|mut c| {
            c.origin_dir = "repo".to_string();
            c
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(0);
    let schedule =
        spread_commits(&commits, start, end, &SpreadOptions::default(), &mut rng).unwrap();

    let times: Vec<NaiveDateTime> =
        schedule.directories[0].entries.iter().map(|e| e.assigned_at).collect();
    assert_eq!(
        times,
        vec![start, start + Duration::seconds(1200), start + Duration::seconds(3000)]
    );
}

#[test]
fn every_entry_stays_inside_the_requested_window() {
    let start = at(2024, 4, 1, 9, 30, 0);
    let end = at(2024, 4, 15, 17, 45, 0);
    let commits = ledger(&[120, 4, 38, 200, 17, 56, 9, 300, 41, 77, 5, 63]);

    for seed in 0..64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule =
            spread_commits(&commits, start, end, &SpreadOptions::default(), &mut rng).unwrap();
        assert_eq!(schedule.len(), commits.len(), "seed {seed}");
        for entry in schedule.entries() {
            assert!(entry.assigned_at >= start, "seed {seed}: {entry:?}");
            assert!(entry.assigned_at <= end, "seed {seed}: {entry:?}");
        }
    }
}

#[test]
fn per_directory_output_preserves_commit_order() {
    let start = at(2024, 4, 1, 9, 30, 0);
    let end = at(2024, 4, 12, 17, 45, 0);
    let commits = ledger(&[15, 90, 3, 44, 160, 2, 71, 28, 10]);

    for seed in 0..64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule =
            spread_commits(&commits, start, end, &SpreadOptions::default(), &mut rng).unwrap();
        for dir_schedule in &schedule.directories {
            let indexes: Vec<usize> =
                dir_schedule.entries.iter().map(|e| e.commit.sequence_index).collect();
            let mut sorted = indexes.clone();
            sorted.sort_unstable();
            assert_eq!(indexes, sorted, "seed {seed}, dir {}", dir_schedule.directory);
        }
        // Nothing lost or duplicated across directories.
        let mut all: Vec<usize> =
            schedule.entries().map(|e| e.commit.sequence_index).collect();
        all.sort_unstable();
        assert_eq!(all, (0..commits.len()).collect::<Vec<_>>(), "seed {seed}");
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let start = at(2024, 4, 1, 9, 30, 0);
    let end = at(2024, 4, 10, 17, 45, 0);
    let commits = ledger(&[50, 50, 50, 50, 50, 50]);

    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        spread_commits(&commits, start, end, &SpreadOptions::default(), &mut rng).unwrap()
    };
    assert_eq!(run(9), run(9));
    // Different seeds almost always differ somewhere; just make sure both
    // satisfy the shape, not that they match.
    assert_eq!(run(9).len(), run(10).len());
}

#[test]
fn hostile_windows_terminate_instead_of_looping() {
    // Squeeze many heavy commits into barely-two calendar days ending
    // early in the morning; whatever the draws, the run must finish with
    // either a best-effort schedule or a typed error.
    let start = at(2024, 5, 1, 18, 0, 0);
    let end = at(2024, 5, 3, 8, 0, 1);
    let commits = ledger(&[997, 1009, 1013, 1019, 1021, 1031, 1033, 1039]);

    for seed in 0..128 {
        let mut rng = StdRng::seed_from_u64(seed);
        match spread_commits(&commits, start, end, &SpreadOptions::default(), &mut rng) {
            Ok(schedule) => {
                assert_eq!(schedule.len(), commits.len(), "seed {seed}");
                for entry in schedule.entries() {
                    assert!(entry.assigned_at <= end, "seed {seed}: {entry:?}");
                }
            }
            Err(
                SpreadError::EmptyDayWindow { .. } | SpreadError::RetryBudgetExceeded { .. },
            ) => {}
        }
    }
}

#[test]
fn disabling_extended_windows_still_produces_valid_schedules() {
    let start = at(2024, 4, 1, 9, 30, 0);
    let end = at(2024, 4, 10, 17, 45, 0);
    let commits = ledger(&[300, 7, 150, 42, 88, 19, 230]);
    let options = SpreadOptions { extended_windows: false };

    for seed in 0..32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = spread_commits(&commits, start, end, &options, &mut rng).unwrap();
        assert_eq!(schedule.len(), commits.len(), "seed {seed}");
        for entry in schedule.entries() {
            assert!(entry.assigned_at >= start && entry.assigned_at <= end, "seed {seed}");
        }
    }
}
