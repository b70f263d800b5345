//! Command-line flags and their validation into [`BuildSettings`].

use std::path::PathBuf;

use armci_common::config::{BuildSettings, rootfs_image_in};
use armci_common::error::{ArmCiError, Result};
use armci_common::types::{Architecture, BuildConfiguration, LinuxCodeName};
use clap::Parser;

/// ARM emulator cross-build.
///
/// Mounts the emulator rootfs, cross-builds the working tree inside a
/// toolchain container, and unmounts everything again on exit or Ctrl-C.
#[derive(Parser, Debug)]
#[command(name = "armci", version, about, long_about = None)]
pub struct Cli {
    /// Emulator directory; PATH/platform/rootfs-t30.ext4 must exist.
    #[arg(long = "emulatorPath", value_name = "PATH")]
    pub emulator_path: Option<PathBuf>,

    /// Mount point for the emulator rootfs; created if absent.
    #[arg(long = "mountPath", value_name = "PATH")]
    pub mount_path: Option<PathBuf>,

    /// Build configuration: Debug or Release (any case).
    #[arg(long = "buildConfig", value_name = "CONFIG")]
    pub build_config: Option<BuildConfiguration>,

    /// Build for the hard-float ABI (default).
    #[arg(long, conflicts_with = "armel")]
    pub arm: bool,

    /// Build for the soft-float ABI.
    #[arg(long)]
    pub armel: bool,

    /// Linux code name: trusty (default) or xenial for arm, tizen for armel.
    #[arg(long = "linuxCodeName", value_name = "NAME")]
    pub linux_code_name: Option<LinuxCodeName>,

    /// Verbose logging; also forwarded to the build script.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the parsed command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The configuration is valid but not built yet; exit successfully.
    Unsupported {
        /// Requested architecture.
        arch: Architecture,
        /// Requested code name.
        code_name: LinuxCodeName,
    },
    /// Run the full build.
    Build(BuildSettings),
}

impl Cli {
    /// Returns the selected architecture.
    #[must_use]
    pub const fn arch(&self) -> Architecture {
        if self.armel {
            Architecture::Armel
        } else {
            Architecture::Arm
        }
    }

    /// Validates the flags into a [`Plan`].
    ///
    /// Unsupported code names short-circuit before required arguments are
    /// checked.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad combinations, missing arguments,
    /// or missing emulator paths.
    pub fn into_plan(self) -> Result<Plan> {
        let arch = self.arch();
        let code_name = self
            .linux_code_name
            .unwrap_or_else(|| arch.default_code_name());

        if !code_name.supports(arch) {
            return Err(ArmCiError::InvalidCombination {
                message: format!("{code_name} is not a supported linux name for {arch}"),
            });
        }
        if !code_name.is_buildable() {
            return Ok(Plan::Unsupported { arch, code_name });
        }

        let emulator_path = self
            .emulator_path
            .ok_or(ArmCiError::MissingArgument { name: "emulatorPath" })?;
        let mount_path = self
            .mount_path
            .ok_or(ArmCiError::MissingArgument { name: "mountPath" })?;
        let configuration = self
            .build_config
            .ok_or(ArmCiError::MissingArgument { name: "buildConfig" })?;

        if !emulator_path.is_dir() {
            return Err(ArmCiError::MissingPath { path: emulator_path });
        }
        let rootfs_image = rootfs_image_in(&emulator_path);
        if !rootfs_image.is_file() {
            return Err(ArmCiError::MissingPath { path: rootfs_image });
        }

        let working_dir = std::env::current_dir().map_err(|source| ArmCiError::Io {
            path: PathBuf::from("."),
            source,
        })?;

        Ok(Plan::Build(BuildSettings {
            emulator_path,
            mount_path,
            configuration,
            arch,
            code_name,
            verbose: self.verbose,
            working_dir,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::path::Path;

    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("armci").chain(args.iter().copied()))
    }

    fn emulator_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("platform")).unwrap();
        std::fs::write(dir.path().join("platform/rootfs-t30.ext4"), b"").unwrap();
        dir
    }

    fn path_arg(flag: &str, path: &Path) -> String {
        format!("--{flag}={}", path.display())
    }

    #[test]
    fn build_config_is_case_insensitive() {
        let cli = parse(&["--buildConfig=release"]).unwrap();
        assert_eq!(cli.build_config, Some(BuildConfiguration::Release));
        let cli = parse(&["--buildConfig=DEBUG"]).unwrap();
        assert_eq!(cli.build_config, Some(BuildConfiguration::Debug));
    }

    #[test]
    fn unknown_build_config_is_rejected() {
        assert!(parse(&["--buildConfig=Foo"]).is_err());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse(&["--skipTests"]).is_err());
    }

    #[test]
    fn arm_and_armel_conflict() {
        assert!(parse(&["--arm", "--armel"]).is_err());
    }

    #[test]
    fn verbose_has_short_form() {
        assert!(parse(&["-v"]).unwrap().verbose);
    }

    #[test]
    fn xenial_short_circuits_without_required_args() {
        let plan = parse(&["--linuxCodeName=xenial"]).unwrap().into_plan().unwrap();
        assert_eq!(
            plan,
            Plan::Unsupported {
                arch: Architecture::Arm,
                code_name: LinuxCodeName::Xenial
            }
        );
    }

    #[test]
    fn armel_defaults_to_tizen_and_short_circuits() {
        let plan = parse(&["--armel"]).unwrap().into_plan().unwrap();
        assert!(matches!(plan, Plan::Unsupported { code_name: LinuxCodeName::Tizen, .. }));
    }

    #[test]
    fn mismatched_code_name_is_rejected() {
        let err = parse(&["--armel", "--linuxCodeName=trusty"])
            .unwrap()
            .into_plan()
            .unwrap_err();
        assert!(matches!(err, ArmCiError::InvalidCombination { .. }));
        assert!(err.shows_usage());
    }

    #[test]
    fn missing_emulator_path_is_reported() {
        let err = parse(&["--mountPath=/mnt/emul", "--buildConfig=Release"])
            .unwrap()
            .into_plan()
            .unwrap_err();
        assert!(matches!(err, ArmCiError::MissingArgument { name: "emulatorPath" }));
    }

    #[test]
    fn missing_rootfs_image_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse(&[
            path_arg("emulatorPath", dir.path()).as_str(),
            "--mountPath=/mnt/emul",
            "--buildConfig=Release",
        ])
        .unwrap()
        .into_plan()
        .unwrap_err();

        let expected = dir.path().join("platform/rootfs-t30.ext4");
        assert!(matches!(err, ArmCiError::MissingPath { ref path } if *path == expected));
        assert!(err.to_string().contains(&expected.display().to_string()));
    }

    #[test]
    fn missing_emulator_dir_is_reported() {
        let err = parse(&[
            "--emulatorPath=/nonexistent/armci-emulator",
            "--mountPath=/mnt/emul",
            "--buildConfig=Release",
        ])
        .unwrap()
        .into_plan()
        .unwrap_err();
        assert!(matches!(err, ArmCiError::MissingPath { .. }));
    }

    #[test]
    fn valid_flags_produce_build_settings() {
        let emul = emulator_dir();
        let plan = parse(&[
            "--arm",
            path_arg("emulatorPath", emul.path()).as_str(),
            "--mountPath=/mnt/emul",
            "--buildConfig=release",
            "--verbose",
        ])
        .unwrap()
        .into_plan()
        .unwrap();

        let Plan::Build(settings) = plan else {
            panic!("expected a build plan");
        };
        assert_eq!(settings.arch, Architecture::Arm);
        assert_eq!(settings.code_name, LinuxCodeName::Trusty);
        assert_eq!(settings.configuration, BuildConfiguration::Release);
        assert_eq!(settings.mount_path, PathBuf::from("/mnt/emul"));
        assert!(settings.verbose);
        assert_eq!(settings.rootfs_image(), emul.path().join("platform/rootfs-t30.ext4"));
    }
}
