//! Idempotent mount and unmount of a single target.
//!
//! Mount state is never cached. Each operation asks the OS through
//! `mountpoint -q` right before acting, because other processes may change
//! the mount table at any time.

use std::path::{Path, PathBuf};

use armci_common::error::{ArmCiError, Result};

use crate::command::{CommandLine, CommandRunner};

/// One mount operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    /// Extra `mount` options, whitespace separated (e.g. `-t proc`).
    pub options: &'static str,
    /// Device, image or directory to mount.
    pub source: PathBuf,
    /// Mount point.
    pub target: PathBuf,
}

impl MountSpec {
    /// Builds the privileged `mount` invocation for this spec.
    #[must_use]
    pub fn command(&self) -> CommandLine {
        CommandLine::new("mount")
            .args(self.options.split_whitespace())
            .arg(&self.source)
            .arg(&self.target)
            .elevated()
    }
}

/// Result of [`ensure_mount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The target was mounted by this call.
    Mounted,
    /// The target was already a mount point; nothing was done.
    AlreadyMounted,
}

/// Result of [`ensure_unmount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmountOutcome {
    /// The target was unmounted by this call.
    Unmounted,
    /// The target was not a mount point; nothing was done.
    NotMounted,
    /// Unmounting was attempted and failed. Logged, never fatal.
    Failed(String),
}

/// Queries the live mount table for `target`.
///
/// # Errors
///
/// Returns an error if `mountpoint` cannot be started.
pub fn is_mounted<R>(runner: &R, target: &Path) -> Result<bool>
where
    R: CommandRunner + ?Sized,
{
    let out = runner.run(&CommandLine::new("mountpoint").args(["-q", "--"]).arg(target))?;
    Ok(out.success())
}

/// Mounts `spec` unless its target is already a mount point.
///
/// # Errors
///
/// Returns [`ArmCiError::Mount`] if the mount state cannot be queried or the
/// mount command fails. There is no retry.
pub fn ensure_mount<R>(runner: &R, spec: &MountSpec) -> Result<MountOutcome>
where
    R: CommandRunner + ?Sized,
{
    let mount_err = |reason: String| ArmCiError::Mount {
        target: spec.target.clone(),
        reason,
    };

    if is_mounted(runner, &spec.target).map_err(|e| mount_err(e.to_string()))? {
        tracing::info!(path = %spec.target.display(), "already mounted");
        return Ok(MountOutcome::AlreadyMounted);
    }

    let cmd = spec.command();
    tracing::info!(cmd = %cmd, "mounting");
    let out = runner.run(&cmd).map_err(|e| mount_err(e.to_string()))?;
    if !out.success() {
        return Err(mount_err(format!(
            "exit status {}: {}",
            out.code,
            out.stderr.trim()
        )));
    }
    Ok(MountOutcome::Mounted)
}

/// Unmounts `target` if it is currently a mount point.
///
/// Open handles under the target are listed first as a diagnostic only;
/// they never block the unmount. Failures are logged and returned, never
/// raised, so cleanup cannot mask the outcome of the build.
pub fn ensure_unmount<R>(runner: &R, target: &Path) -> UnmountOutcome
where
    R: CommandRunner + ?Sized,
{
    report_open_files(runner, target);

    match is_mounted(runner, target) {
        Ok(false) => {
            tracing::debug!(path = %target.display(), "not mounted");
            return UnmountOutcome::NotMounted;
        }
        Ok(true) => {}
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "cannot query mount state");
            return UnmountOutcome::Failed(e.to_string());
        }
    }

    let cmd = CommandLine::new("umount").arg(target).elevated();
    tracing::info!(cmd = %cmd, "unmounting");
    match runner.run(&cmd) {
        Ok(out) if out.success() => UnmountOutcome::Unmounted,
        Ok(out) => {
            let reason = format!("exit status {}: {}", out.code, out.stderr.trim());
            tracing::warn!(path = %target.display(), %reason, "unmount failed");
            UnmountOutcome::Failed(reason)
        }
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "unmount failed");
            UnmountOutcome::Failed(e.to_string())
        }
    }
}

/// Logs processes holding files open under `target`. Best effort.
fn report_open_files<R>(runner: &R, target: &Path)
where
    R: CommandRunner + ?Sized,
{
    if !target.is_dir() {
        return;
    }
    let cmd = CommandLine::new("lsof").args(["+f", "--"]).arg(target).elevated();
    match runner.run(&cmd) {
        Ok(out) if !out.stdout.trim().is_empty() => {
            tracing::warn!(
                path = %target.display(),
                open_files = %out.stdout.trim(),
                "open files found before unmount"
            );
        }
        Ok(_) => tracing::debug!(path = %target.display(), "no open files"),
        Err(e) => tracing::debug!(path = %target.display(), error = %e, "open file check skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    fn proc_spec(root: &Path) -> MountSpec {
        MountSpec {
            options: "-t proc",
            source: PathBuf::from("/proc"),
            target: root.join("proc"),
        }
    }

    #[test]
    fn command_splits_options() {
        let spec = proc_spec(Path::new("/mnt/emul"));
        assert_eq!(spec.command().to_string(), "sudo mount -t proc /proc /mnt/emul/proc");
    }

    #[test]
    fn command_without_options() {
        let spec = MountSpec {
            options: "",
            source: PathBuf::from("/emul/platform/rootfs-t30.ext4"),
            target: PathBuf::from("/mnt/emul"),
        };
        assert_eq!(
            spec.command().to_string(),
            "sudo mount /emul/platform/rootfs-t30.ext4 /mnt/emul"
        );
    }

    #[test]
    fn ensure_mount_twice_mounts_once() {
        let runner = ScriptedRunner::new();
        let spec = proc_spec(Path::new("/mnt/emul"));

        assert_eq!(ensure_mount(&runner, &spec).unwrap(), MountOutcome::Mounted);
        assert_eq!(ensure_mount(&runner, &spec).unwrap(), MountOutcome::AlreadyMounted);
        assert_eq!(runner.mount_targets(), vec![PathBuf::from("/mnt/emul/proc")]);
    }

    #[test]
    fn ensure_mount_failure_is_fatal() {
        let runner = ScriptedRunner::new();
        let spec = proc_spec(Path::new("/mnt/emul"));
        runner.fail_mount(&spec.target);

        let err = ensure_mount(&runner, &spec).unwrap_err();
        assert!(matches!(err, ArmCiError::Mount { ref target, .. } if target == &spec.target));
        assert!(!runner.is_mounted(&spec.target));
    }

    #[test]
    fn ensure_unmount_twice_unmounts_once() {
        let runner = ScriptedRunner::new();
        let target = Path::new("/mnt/emul/sys");
        runner.premount(target);

        assert_eq!(ensure_unmount(&runner, target), UnmountOutcome::Unmounted);
        assert_eq!(ensure_unmount(&runner, target), UnmountOutcome::NotMounted);
        assert_eq!(runner.unmount_targets(), vec![target.to_path_buf()]);
    }

    #[test]
    fn ensure_unmount_failure_is_reported_not_raised() {
        let runner = ScriptedRunner::new();
        let target = Path::new("/mnt/emul/dev");
        runner.premount(target);
        runner.fail_unmount(target);

        assert!(matches!(ensure_unmount(&runner, target), UnmountOutcome::Failed(_)));
        assert!(runner.is_mounted(target));
    }

    #[test]
    fn open_files_never_block_unmount() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.premount(dir.path());
        runner.set_open_files("bash 4242 root cwd DIR /mnt/emul");

        assert_eq!(ensure_unmount(&runner, dir.path()), UnmountOutcome::Unmounted);
        assert_eq!(runner.count_program("lsof"), 1);
    }

    #[test]
    fn missing_lsof_does_not_block_unmount() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.premount(dir.path());
        runner.hide_tool("lsof");

        assert_eq!(ensure_unmount(&runner, dir.path()), UnmountOutcome::Unmounted);
        assert!(!runner.is_mounted(dir.path()));
    }
}
