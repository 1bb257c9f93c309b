// Git collaborators: command worker, ledger gathering, history rewrite.

pub mod ledger;
pub mod rewrite;
pub mod worker;

use std::path::Path;

/// Whether `dir` looks like the root of a git work tree.
pub fn is_repo(dir: &Path) -> bool {
    dir.join(".git").exists()
}
