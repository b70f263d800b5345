//! Exit-code scenarios for the `armci` binary.
//!
//! Every case here ends before the engine starts, so no mount, git or
//! docker access is needed.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::process::{Command, Output};

fn armci(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armci"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("armci binary runs")
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn invalid_build_config_exits_1_with_usage() {
    let out = armci(&["--emulatorPath=/tmp", "--mountPath=/mnt/emul", "--buildConfig=Foo"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("Usage"));
}

#[test]
fn unknown_flag_exits_1() {
    let out = armci(&["--bogus"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("Usage"));
}

#[test]
fn xenial_exits_0_without_building() {
    let out = armci(&["--linuxCodeName=xenial"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(combined(&out).contains("not supported yet"));
}

#[test]
fn missing_rootfs_image_exits_1_naming_path() {
    let emul = tempfile::tempdir().unwrap();
    let emulator_arg = format!("--emulatorPath={}", emul.path().display());
    let out = armci(&[
        "--arm",
        emulator_arg.as_str(),
        "--mountPath=/mnt/armci-test",
        "--buildConfig=Release",
    ]);

    assert_eq!(out.status.code(), Some(1));
    let text = combined(&out);
    let expected = emul.path().join("platform/rootfs-t30.ext4");
    assert!(text.contains(&expected.display().to_string()));
    assert!(text.contains("Usage"));
}

#[test]
fn missing_required_argument_exits_1() {
    let out = armci(&["--arm", "--buildConfig=Debug"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("emulatorPath"));
}

#[test]
fn help_exits_0() {
    let out = armci(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(combined(&out).contains("--buildConfig"));
}
