// `cadence fix-dates` — align committer dates with author dates.

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use cadence_core::git::is_repo;
use cadence_core::git::rewrite;
use cadence_core::git::worker::ProcessCommandExecutor;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct FixDatesArgs {
    /// How many commits back from HEAD to fix.
    count: usize,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
pub struct FixDatesReport {
    pub directory: String,
    pub count: usize,
}

pub fn run(args: FixDatesArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);

    if args.count == 0 {
        anyhow::bail!("count must be at least 1");
    }

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    if !is_repo(&cwd) {
        anyhow::bail!("{} is not a git repository", cwd.display());
    }

    rewrite::align_committer_dates(&cwd, args.count, &ProcessCommandExecutor)
        .context("rewriting committer dates failed")?;

    let report = FixDatesReport { directory: cwd.display().to_string(), count: args.count };
    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &FixDatesReport) -> String {
    format!("Aligned committer dates for the last {} commit(s)", report.count)
}
