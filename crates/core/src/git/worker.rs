use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Local, NaiveDateTime, TimeZone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitWorkerError {
    SpawnFailed { command: String, message: String },
    CommandFailed { command: String, code: Option<i32>, stderr: String },
    UnexpectedOutput { command: String, detail: String },
}

impl Display for GitWorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitWorkerError::SpawnFailed { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitWorkerError::CommandFailed { command, code, stderr } => {
                write!(f, "`{command}` failed with code {:?}: {}", code, stderr.trim())
            }
            GitWorkerError::UnexpectedOutput { command, detail } => {
                write!(f, "could not parse output of `{command}`: {detail}")
            }
        }
    }
}

impl Error for GitWorkerError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(key, value)| (key, value)))
            .current_dir(cwd)
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One commit from `git log`, in the shape the ledger needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub sha: String,
    /// Author date as a local wall-clock time.
    pub authored_at: NaiveDateTime,
    pub message: String,
}

const LOG_FORMAT: &str = "--format=%H%x09%ct%x09%s";

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor }
    }

    pub fn current_branch(&self) -> Result<String, GitWorkerError> {
        let output = self.run(vec!["branch".to_string(), "--show-current".to_string()])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Commits on the current branch that the upstream does not have,
    /// oldest first.
    pub fn unpushed_commits(&self) -> Result<Vec<LogEntry>, GitWorkerError> {
        self.log_entries(vec![
            "log".to_string(),
            "@{upstream}..HEAD".to_string(),
            "--reverse".to_string(),
            LOG_FORMAT.to_string(),
        ])
    }

    /// Commits authored after the given local instant, oldest first.
    pub fn commits_after(&self, cutoff: NaiveDateTime) -> Result<Vec<LogEntry>, GitWorkerError> {
        self.log_entries(vec![
            "log".to_string(),
            format!("--since={}", cutoff.format("%Y-%m-%d %H:%M:%S")),
            "--reverse".to_string(),
            LOG_FORMAT.to_string(),
        ])
    }

    /// Author date of the upstream tip, i.e. the newest published commit.
    pub fn last_pushed_at(&self) -> Result<NaiveDateTime, GitWorkerError> {
        let command = vec![
            "log".to_string(),
            "-1".to_string(),
            "--format=%ct".to_string(),
            "@{upstream}".to_string(),
        ];
        let output = self.run(command.clone())?;
        parse_epoch(output.stdout.trim(), &format!("git {}", command.join(" ")))
    }

    /// Total lines touched by a commit: insertions plus deletions, with
    /// binary files counting zero.
    pub fn lines_changed(&self, sha: &str) -> Result<u64, GitWorkerError> {
        let output = self.run(vec![
            "show".to_string(),
            sha.to_string(),
            "--numstat".to_string(),
            "--format=".to_string(),
        ])?;
        let mut total = 0u64;
        for line in output.stdout.lines() {
            let mut fields = line.split('\t');
            let added = fields.next().unwrap_or("");
            let removed = fields.next().unwrap_or("");
            total += added.parse::<u64>().unwrap_or(0);
            total += removed.parse::<u64>().unwrap_or(0);
        }
        Ok(total)
    }

    /// Rewrite the last `depth` commits with the given env filter,
    /// optionally re-signing each rewritten commit.
    pub fn filter_branch(
        &self,
        env_filter: &str,
        depth: usize,
        sign: bool,
    ) -> Result<GitCommandOutput, GitWorkerError> {
        let mut args = vec![
            "filter-branch".to_string(),
            "-f".to_string(),
            "--env-filter".to_string(),
            env_filter.to_string(),
        ];
        if sign {
            args.push("--commit-filter".to_string());
            args.push("git commit-tree -S \"$@\";".to_string());
        }
        args.push(format!("HEAD~{depth}..HEAD"));
        self.run_with_envs(
            args,
            vec![("FILTER_BRANCH_SQUELCH_WARNING".to_string(), "1".to_string())],
        )
    }

    fn log_entries(&self, args: Vec<String>) -> Result<Vec<LogEntry>, GitWorkerError> {
        let command = format!("git {}", args.join(" "));
        let output = self.run(args)?;
        output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_log_line(line, &command))
            .collect()
    }

    fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitWorkerError> {
        self.run_with_envs(args, Vec::new())
    }

    fn run_with_envs(
        &self,
        args: Vec<String>,
        envs: Vec<(String, String)>,
    ) -> Result<GitCommandOutput, GitWorkerError> {
        let command = format!("git {}", args.join(" "));
        let result =
            self.executor.execute("git", &args, &envs, &self.repo_path).map_err(|error| {
                GitWorkerError::SpawnFailed { command: command.clone(), message: error.to_string() }
            })?;

        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitWorkerError::CommandFailed { command, code: result.code, stderr })
    }
}

fn parse_log_line(line: &str, command: &str) -> Result<LogEntry, GitWorkerError> {
    let mut fields = line.splitn(3, '\t');
    let sha = fields.next().unwrap_or("").to_string();
    let epoch = fields.next().ok_or_else(|| GitWorkerError::UnexpectedOutput {
        command: command.to_string(),
        detail: format!("missing author date in `{line}`"),
    })?;
    let message = fields.next().unwrap_or("").to_string();
    Ok(LogEntry { sha, authored_at: parse_epoch(epoch, command)?, message })
}

fn parse_epoch(raw: &str, command: &str) -> Result<NaiveDateTime, GitWorkerError> {
    let seconds: i64 = raw.parse().map_err(|_| GitWorkerError::UnexpectedOutput {
        command: command.to_string(),
        detail: format!("`{raw}` is not an epoch timestamp"),
    })?;
    Local
        .timestamp_opt(seconds, 0)
        .single()
        .map(|at| at.naive_local())
        .ok_or_else(|| GitWorkerError::UnexpectedOutput {
            command: command.to_string(),
            detail: format!("`{raw}` is out of range"),
        })
}
