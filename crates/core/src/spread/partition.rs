// Day partitioner: split the ledger into one bin per simulated workday.

use std::collections::VecDeque;

use cadence_common::types::Commit;

/// Split the ledger into at most `total_days` bins of roughly equal
/// weight, preserving order.
///
/// Commits accumulate into the current bin until adding the next one would
/// exceed the per-day weight budget; the bin then closes and a new one
/// opens, except that the final bin absorbs any remainder. A deterministic
/// function of weights and order.
pub fn by_day(commits: &[Commit], total_days: usize) -> Vec<VecDeque<Commit>> {
    let total_weight: u64 = commits.iter().map(|c| c.weight).sum();
    let budget = total_weight / total_days.max(1) as u64;

    let mut bins: Vec<VecDeque<Commit>> = Vec::new();
    let mut current: VecDeque<Commit> = VecDeque::new();
    let mut accumulated = 0u64;

    for commit in commits {
        if accumulated + commit.weight > budget
            && !current.is_empty()
            && bins.len() + 1 < total_days
        {
            bins.push(std::mem::take(&mut current));
            accumulated = 0;
        }
        current.push_back(commit.clone());
        accumulated += commit.weight;
    }
    if !current.is_empty() {
        bins.push(current);
    }
    bins
}
