// `cadence unpushed` — list unpushed commits and their weights.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use cadence_core::git::is_repo;
use cadence_core::git::worker::{GitWorker, ProcessCommandExecutor};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct UnpushedArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,

    /// Repository directories to inspect (defaults to the current directory).
    dirs: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct UnpushedReport {
    pub directories: Vec<DirectoryUnpushed>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DirectoryUnpushed {
    pub directory: String,
    pub branch: String,
    pub commits: Vec<UnpushedCommit>,
}

#[derive(Debug, Serialize)]
pub struct UnpushedCommit {
    pub id: String,
    pub weight: u64,
    pub message: String,
}

pub fn run(args: UnpushedArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let executor = ProcessCommandExecutor;

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let dirs = if args.dirs.is_empty() { vec![cwd] } else { args.dirs };

    let mut directories = Vec::new();
    for dir in &dirs {
        if !is_repo(dir) {
            output::print_warning(
                format,
                "NOT_A_REPOSITORY",
                &format!("{} is not a git repository, skipping", dir.display()),
            );
            continue;
        }
        let worker = GitWorker::with_executor(dir, executor);
        let branch = worker.current_branch().context("resolving the current branch failed")?;
        let log = worker.unpushed_commits().context("listing unpushed commits failed")?;

        let mut commits = Vec::with_capacity(log.len());
        for entry in log {
            let weight =
                worker.lines_changed(&entry.sha).context("counting changed lines failed")?;
            commits.push(UnpushedCommit { id: entry.sha, weight, message: entry.message });
        }
        directories.push(DirectoryUnpushed {
            directory: dir.display().to_string(),
            branch,
            commits,
        });
    }

    let total = directories.iter().map(|d| d.commits.len()).sum();
    let report = UnpushedReport { directories, total };
    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &UnpushedReport) -> String {
    if report.total == 0 {
        return "No unpushed commits".to_string();
    }
    let mut out = String::new();
    for dir in &report.directories {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "{} ({}): {} unpushed commit(s)",
            dir.directory,
            dir.branch,
            dir.commits.len()
        ));
        for commit in &dir.commits {
            let end = commit.id.len().min(7);
            out.push_str(&format!(
                "\n  {}  {:>5} lines  {}",
                &commit.id[..end],
                commit.weight,
                commit.message
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> UnpushedReport {
        UnpushedReport {
            directories: vec![DirectoryUnpushed {
                directory: "/home/dev/api".to_string(),
                branch: "main".to_string(),
                commits: vec![
                    UnpushedCommit {
                        id: "0123456789abcdef0123456789abcdef01234567".to_string(),
                        weight: 120,
                        message: "fix parser".to_string(),
                    },
                    UnpushedCommit {
                        id: "89abcdef0123456789abcdef0123456789abcdef".to_string(),
                        weight: 8,
                        message: "add tests".to_string(),
                    },
                ],
            }],
            total: 2,
        }
    }

    #[test]
    fn human_format_lists_commits_per_directory() {
        let text = format_human(&sample_report());
        assert!(text.contains("/home/dev/api (main): 2 unpushed commit(s)"));
        assert!(text.contains("0123456    120 lines  fix parser"));
        assert!(text.contains("89abcde      8 lines  add tests"));
    }

    #[test]
    fn human_format_reports_nothing_to_do() {
        let report = UnpushedReport { directories: Vec::new(), total: 0 };
        assert_eq!(format_human(&report), "No unpushed commits");
    }

    #[test]
    fn json_report_round_trips() {
        let report = sample_report();
        let mut buf = Vec::new();
        crate::output::write_output(&mut buf, OutputFormat::Json, &report, format_human).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["directories"][0]["branch"], "main");
        assert_eq!(parsed["directories"][0]["commits"][1]["weight"], 8);
    }
}
