// Consistent exit codes for the cadence CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = git command failed
//   11 = schedule could not be computed

use cadence_common::span::SpanParseError;
use cadence_core::git::worker::GitWorkerError;
use cadence_core::spread::SpreadError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Git = 10,
    Schedule = 11,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<SpanParseError>().is_some() {
                return Self::Usage;
            }
            if cause.downcast_ref::<SpreadError>().is_some() {
                return Self::Schedule;
            }
            if cause.downcast_ref::<GitWorkerError>().is_some() {
                return Self::Git;
            }
        }
        Self::Error
    }
}
