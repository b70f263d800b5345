//! Git working-tree and HEAD checks.
//!
//! The downstream build applies and reverts patches in the working tree.
//! These checks make sure it starts from a clean tree and leaves HEAD where
//! it found it.

use std::path::Path;

use armci_common::error::{ArmCiError, Result};

use crate::command::{CommandLine, CommandRunner};

fn git(repo: &Path) -> CommandLine {
    CommandLine::new("git").arg("-C").arg(repo)
}

/// Returns `git status --porcelain` output for `repo`.
///
/// # Errors
///
/// Returns an error if git cannot be run or exits unsuccessfully.
pub fn working_tree_status<R>(runner: &R, repo: &Path) -> Result<String>
where
    R: CommandRunner + ?Sized,
{
    let cmd = git(repo).args(["status", "--porcelain"]);
    Ok(runner.run(&cmd)?.check(&cmd)?.stdout)
}

/// Fails if `repo` has uncommitted changes.
///
/// # Errors
///
/// Returns [`ArmCiError::DirtyWorkingTree`] when the status is not empty.
pub fn ensure_clean<R>(runner: &R, repo: &Path) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let status = working_tree_status(runner, repo)?;
    if status.trim().is_empty() {
        Ok(())
    } else {
        Err(ArmCiError::DirtyWorkingTree {
            status: status.trim_end().to_owned(),
        })
    }
}

/// Returns the commit id HEAD points at.
///
/// # Errors
///
/// Returns an error if git cannot be run or HEAD does not resolve.
pub fn head_commit<R>(runner: &R, repo: &Path) -> Result<String>
where
    R: CommandRunner + ?Sized,
{
    let cmd = git(repo).args(["rev-parse", "--verify", "HEAD"]);
    Ok(runner.run(&cmd)?.check(&cmd)?.stdout.trim().to_owned())
}

/// HEAD commit captured once before the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHeadSnapshot {
    commit: String,
}

impl GitHeadSnapshot {
    /// Captures the current HEAD of `repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if HEAD cannot be resolved.
    pub fn capture<R>(runner: &R, repo: &Path) -> Result<Self>
    where
        R: CommandRunner + ?Sized,
    {
        let commit = head_commit(runner, repo)?;
        tracing::debug!(%commit, "captured git HEAD");
        Ok(Self { commit })
    }

    /// Returns the captured commit id.
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Compares the snapshot against the current HEAD. Consumes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArmCiError::Integrity`] naming both commits when HEAD moved,
    /// or an error if HEAD cannot be resolved.
    pub fn verify<R>(self, runner: &R, repo: &Path) -> Result<()>
    where
        R: CommandRunner + ?Sized,
    {
        let current = head_commit(runner, repo)?;
        if current == self.commit {
            tracing::info!(commit = %current, "git HEAD unchanged");
            Ok(())
        } else {
            Err(ArmCiError::Integrity {
                initial: self.commit,
                current,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn clean_tree_passes() {
        let runner = ScriptedRunner::new();
        assert!(ensure_clean(&runner, Path::new("/src")).is_ok());
    }

    #[test]
    fn dirty_tree_is_rejected() {
        let runner = ScriptedRunner::new();
        runner.set_porcelain(" M src/pal/src/init.cpp\n");
        let err = ensure_clean(&runner, Path::new("/src")).unwrap_err();
        assert!(matches!(err, ArmCiError::DirtyWorkingTree { ref status } if status.contains("init.cpp")));
    }

    #[test]
    fn git_runs_against_repo() {
        let runner = ScriptedRunner::new();
        let _ = head_commit(&runner, Path::new("/src")).unwrap();
        assert_eq!(runner.log()[0].to_string(), "git -C /src rev-parse --verify HEAD");
    }

    #[test]
    fn snapshot_matches_unchanged_head() {
        let runner = ScriptedRunner::new();
        runner.set_heads(["4f1c2e9"]);
        let snapshot = GitHeadSnapshot::capture(&runner, Path::new("/src")).unwrap();
        assert_eq!(snapshot.commit(), "4f1c2e9");
        assert!(snapshot.verify(&runner, Path::new("/src")).is_ok());
    }

    #[test]
    fn snapshot_detects_moved_head() {
        let runner = ScriptedRunner::new();
        runner.set_heads(["4f1c2e9", "a7b3d01"]);
        let snapshot = GitHeadSnapshot::capture(&runner, Path::new("/src")).unwrap();

        let err = snapshot.verify(&runner, Path::new("/src")).unwrap_err();
        assert!(matches!(
            err,
            ArmCiError::Integrity { ref initial, ref current } if initial == "4f1c2e9" && current == "a7b3d01"
        ));
    }
}
