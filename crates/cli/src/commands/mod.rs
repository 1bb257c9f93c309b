// CLI subcommand dispatch.

use clap::Subcommand;

pub mod fix_dates;
pub mod spread;
pub mod unpushed;

#[derive(Subcommand)]
pub enum Command {
    /// Spread unpushed commits across a time window and rewrite their dates
    Spread(spread::SpreadArgs),
    /// List unpushed commits and their weights per repository
    Unpushed(unpushed::UnpushedArgs),
    /// Set committer date to author date for the last n commits
    FixDates(fix_dates::FixDatesArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Spread(args) => spread::run(args),
        Command::Unpushed(args) => unpushed::run(args),
        Command::FixDates(args) => fix_dates::run(args),
    }
}
