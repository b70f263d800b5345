//! Containerized cross-build.
//!
//! The working tree is bind-mounted into a prebuilt toolchain image and the
//! repository's build script runs inside it. The container runs as root, so
//! the output directory is handed back to the invoking user afterwards.

use std::ffi::OsString;

use armci_common::config::BuildSettings;
use armci_common::constants::{
    BUILD_SCRIPT, CONTAINER_WORKDIR, OUTPUT_DIR, TRUSTY_ARM_IMAGE, TRUSTY_ARM_ROOTFS_DIR,
};
use armci_common::error::{ArmCiError, Result};
use armci_common::types::{Architecture, LinuxCodeName};
use armci_core::command::{CommandLine, CommandRunner};

/// Toolchain image and environment for one architecture/distribution pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerTarget {
    /// Image reference passed to `docker run`.
    pub image: &'static str,
    /// Runtime OS prefix of the target runtime identifier.
    pub runtime_os: &'static str,
    /// Environment passed into the container.
    pub env: Vec<(&'static str, &'static str)>,
}

impl DockerTarget {
    /// Selects the toolchain for `arch` on `code_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmCiError::InvalidCombination`] when no image exists for
    /// the pair.
    pub fn select(arch: Architecture, code_name: LinuxCodeName) -> Result<Self> {
        match (arch, code_name) {
            (Architecture::Arm, LinuxCodeName::Trusty) => Ok(Self {
                image: TRUSTY_ARM_IMAGE,
                runtime_os: "ubuntu.14.04",
                env: vec![("ROOTFS_DIR", TRUSTY_ARM_ROOTFS_DIR)],
            }),
            _ => Err(ArmCiError::InvalidCombination {
                message: format!("{code_name} is not a supported linux name for {arch}"),
            }),
        }
    }

    /// Returns the target runtime identifier, e.g. `ubuntu.14.04-arm`.
    #[must_use]
    pub fn runtime_id(&self, arch: Architecture) -> String {
        format!("{}-{arch}", self.runtime_os)
    }
}

/// Returns the build script invocation run inside the container.
#[must_use]
pub fn build_script_args(settings: &BuildSettings, target: &DockerTarget) -> Vec<String> {
    let mut args = vec![
        BUILD_SCRIPT.to_owned(),
        "--skip-prereqs".to_owned(),
        "--configuration".to_owned(),
        settings.configuration.to_string(),
    ];
    if settings.verbose {
        args.push("--verbose".to_owned());
    }
    args.push("--env-vars".to_owned());
    args.push(format!(
        "DISABLE_CROSSGEN=1,TARGETPLATFORM={arch},TARGETRID={rid},CROSS=1",
        arch = settings.arch,
        rid = target.runtime_id(settings.arch),
    ));
    args
}

/// Returns the full `docker run` command for the build.
#[must_use]
pub fn docker_command(settings: &BuildSettings, target: &DockerTarget) -> CommandLine {
    let mut volume = OsString::from(settings.working_dir.as_os_str());
    volume.push(":");
    volume.push(CONTAINER_WORKDIR);

    let mut cmd = CommandLine::new("docker").arg("run");
    for (key, value) in &target.env {
        cmd = cmd.arg("-e").arg(format!("{key}={value}"));
    }
    cmd.args(["--privileged", "-i", "--rm", "-v"])
        .arg(volume)
        .args(["-w", CONTAINER_WORKDIR, target.image])
        .args(build_script_args(settings, target))
        .elevated()
        .inherit_output()
}

/// Runs the containerized build and then restores ownership of the output.
///
/// # Errors
///
/// Returns an error if no toolchain exists for the settings, docker cannot
/// be started, or the build exits unsuccessfully.
pub fn run_build<R>(runner: &R, settings: &BuildSettings) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let target = DockerTarget::select(settings.arch, settings.code_name)?;
    let cmd = docker_command(settings, &target);
    tracing::info!(
        arch = %settings.arch,
        code_name = %settings.code_name,
        image = target.image,
        "starting cross build"
    );
    tracing::debug!(cmd = %cmd, "docker invocation");
    let _ = runner.run(&cmd)?.check(&cmd)?;
    tracing::info!(configuration = %settings.configuration, "cross build finished");

    match current_user_name() {
        Some(owner) => restore_ownership(runner, settings, &owner),
        None => tracing::warn!("cannot resolve invoking user, output ownership left as is"),
    }
    Ok(())
}

/// Hands the build output directory back to `owner`. Best effort.
pub fn restore_ownership<R>(runner: &R, settings: &BuildSettings, owner: &str)
where
    R: CommandRunner + ?Sized,
{
    let output = settings.working_dir.join(OUTPUT_DIR);
    if !output.is_dir() {
        tracing::debug!(path = %output.display(), "no build output to chown");
        return;
    }
    let cmd = CommandLine::new("chown")
        .arg("-R")
        .arg(owner)
        .arg(&output)
        .elevated();
    match runner.run(&cmd) {
        Ok(out) if out.success() => tracing::debug!(path = %output.display(), owner, "restored ownership"),
        Ok(out) => tracing::warn!(cmd = %cmd, code = out.code, stderr = %out.stderr.trim(), "chown failed"),
        Err(e) => tracing::warn!(cmd = %cmd, error = %e, "chown failed"),
    }
}

fn current_user_name() -> Option<String> {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|user| user.name)
}
