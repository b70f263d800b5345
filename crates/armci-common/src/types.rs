//! Domain primitive types used across the armci workspace.

use std::fmt;
use std::str::FromStr;

use crate::error::ArmCiError;

/// Target ARM flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// Hard-float ABI.
    #[default]
    Arm,
    /// Soft-float ABI.
    Armel,
}

impl Architecture {
    /// Returns the identifier used in build parameters and runtime identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Armel => "armel",
        }
    }

    /// Returns the code name assumed when `--linuxCodeName` is omitted.
    #[must_use]
    pub const fn default_code_name(self) -> LinuxCodeName {
        match self {
            Self::Arm => LinuxCodeName::Trusty,
            Self::Armel => LinuxCodeName::Tizen,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distribution the cross rootfs is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinuxCodeName {
    /// Ubuntu 14.04.
    Trusty,
    /// Ubuntu 16.04.
    Xenial,
    /// Tizen.
    Tizen,
}

impl LinuxCodeName {
    /// Returns the lowercase code name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trusty => "trusty",
            Self::Xenial => "xenial",
            Self::Tizen => "tizen",
        }
    }

    /// Returns whether this code name is valid for the given architecture.
    #[must_use]
    pub const fn supports(self, arch: Architecture) -> bool {
        matches!(
            (arch, self),
            (Architecture::Arm, Self::Trusty | Self::Xenial) | (Architecture::Armel, Self::Tizen)
        )
    }

    /// Returns whether builds for this code name are wired up yet.
    ///
    /// Unsupported code names end the run successfully without touching
    /// mounts or containers.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Trusty)
    }
}

impl fmt::Display for LinuxCodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinuxCodeName {
    type Err = ArmCiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trusty" => Ok(Self::Trusty),
            "xenial" => Ok(Self::Xenial),
            "tizen" => Ok(Self::Tizen),
            other => Err(ArmCiError::InvalidValue {
                what: "linuxCodeName",
                value: other.to_owned(),
            }),
        }
    }
}

/// Build flavor passed through to the downstream build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildConfiguration {
    /// Unoptimized build with asserts.
    Debug,
    /// Optimized build.
    Release,
}

impl BuildConfiguration {
    /// Returns the canonical capitalized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildConfiguration {
    type Err = ArmCiError;

    /// Parses `Debug` or `Release` case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("debug") {
            Ok(Self::Debug)
        } else if s.eq_ignore_ascii_case("release") {
            Ok(Self::Release)
        } else {
            Err(ArmCiError::InvalidValue {
                what: "buildConfig",
                value: s.to_owned(),
            })
        }
    }
}
