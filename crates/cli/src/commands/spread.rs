// `cadence spread` — gather unpushed commits, compute a timeline, rewrite.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDateTime};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use cadence_common::span::{format_span, parse_span};
use cadence_common::types::Schedule;
use cadence_core::config::Config;
use cadence_core::git::is_repo;
use cadence_core::git::ledger::{self, LedgerOptions};
use cadence_core::git::rewrite;
use cadence_core::git::worker::{GitWorker, ProcessCommandExecutor};
use cadence_core::spread::{schedule_window, spread_commits, SpreadOptions};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SpreadArgs {
    /// How far back the timeline should start, e.g. "2w" or "10d".
    span: String,

    /// Extra look-back applied when gathering commits, e.g. "1d".
    #[arg(long)]
    offset: Option<String>,

    /// Compute and print the schedule without rewriting history.
    #[arg(long)]
    dry_run: bool,

    /// Seed the schedule's random draws for a reproducible plan.
    #[arg(long)]
    seed: Option<u64>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    /// Repository directories to spread (defaults to the current directory).
    dirs: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SpreadReport {
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub commits: usize,
    pub applied: bool,
    pub schedule: Schedule,
}

pub fn run(args: SpreadArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = Config::load();

    let span = parse_span(&args.span).context("invalid span")?;
    let offset = match &args.offset {
        Some(raw) => parse_span(raw).context("invalid offset")?,
        None => Duration::zero(),
    };

    let executor = ProcessCommandExecutor;
    let now = Local::now().naive_local();
    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let dirs = resolve_dirs(args.dirs, &cwd);

    let last_published =
        if is_repo(&cwd) { GitWorker::new(&cwd).last_pushed_at().ok() } else { None };
    let (start_at, end_at, clipped) = schedule_window(now, span, last_published);
    if clipped {
        output::print_warning(
            format,
            "WINDOW_CLIPPED",
            &format!("start moved forward to the last published commit at {start_at}"),
        );
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let ledger_options = LedgerOptions { weight_jitter: config.spread.weight_jitter };
    let ledger =
        ledger::gather(&dirs, Some(start_at - offset), &ledger_options, &executor, &mut rng)
            .context("gathering commits failed")?;

    if ledger.is_empty() {
        let report = SpreadReport {
            start_at,
            end_at,
            commits: 0,
            applied: false,
            schedule: Schedule::default(),
        };
        output::print_output(format, &report, |_| "No unpushed commits to spread".to_string())?;
        return Ok(());
    }

    let options = SpreadOptions { extended_windows: config.spread.extended_windows };
    let schedule = spread_commits(&ledger, start_at, end_at, &options, &mut rng)
        .context("computing the schedule failed")?;

    let applied = !args.dry_run;
    if applied {
        rewrite::apply_schedule(&schedule, config.git.sign_rewritten_commits, &executor)
            .context("rewriting history failed")?;
    }

    let report = SpreadReport { start_at, end_at, commits: schedule.len(), applied, schedule };
    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn resolve_dirs(dirs: Vec<PathBuf>, cwd: &std::path::Path) -> Vec<PathBuf> {
    if dirs.is_empty() {
        vec![cwd.to_path_buf()]
    } else {
        dirs
    }
}

fn format_human(report: &SpreadReport) -> String {
    let mut out = format!(
        "Spreading {} commit(s) across {} starting at {} and ending at {}",
        report.commits,
        format_span(report.end_at - report.start_at),
        report.start_at.format("%m/%d/%Y %H:%M:%S"),
        report.end_at.format("%m/%d/%Y %H:%M:%S"),
    );
    for dir_schedule in &report.schedule.directories {
        for entry in &dir_schedule.entries {
            out.push_str(&format!(
                "\n  {} ({}) from {} at {}",
                entry.commit.short_id(),
                entry.commit.message,
                entry.commit.friendly_dir(),
                entry.assigned_at.format("%m/%d/%Y %I:%M:%S %p"),
            ));
        }
    }
    if report.applied {
        out.push_str(&format!(
            "\nRewrote {} commit(s) in {} directorie(s)",
            report.commits,
            report.schedule.directories.len(),
        ));
    } else {
        out.push_str("\nDry run: history not rewritten");
    }
    out
}
