// Fatal conditions that abort a spread run before any schedule is emitted.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpreadError {
    /// A day's window collapsed to zero or negative duration after
    /// clamping against the evening cutoff, the calendar day boundary,
    /// and the end of the schedule.
    #[error("day {day} has no usable window after clamping")]
    EmptyDayWindow { day: usize },

    /// Rebalancing a day kept overflowing without converging.
    #[error("gave up rebalancing day {day} at commit {commit}")]
    RetryBudgetExceeded { day: usize, commit: String },
}
