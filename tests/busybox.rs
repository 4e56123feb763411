//! End-to-end runs against Docker Hub
//!
//! These need network access plus CAP_SYS_ADMIN and CAP_SYS_CHROOT, so they
//! only run with `--ignored`. Each one is a separate CLI process, since a
//! process can only move its children into a new pid namespace once.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const IMAGE: &str = "busybox:latest";

fn burrow_run(args: &[&str]) -> assert_cmd::assert::Assert {
    Command::new(env!("CARGO"))
        .arg("run")
        .arg("--quiet")
        .arg("-p")
        .arg("burrow-cli")
        .arg("--")
        .arg("-l")
        .arg("error")
        .arg("run")
        .arg(IMAGE)
        .args(args)
        .assert()
}

#[test]
#[ignore]
fn busybox_true() {
    burrow_run(&["true"]).code(0);
}

#[test]
#[ignore]
fn busybox_false() {
    burrow_run(&["false"]).code(1);
}

#[test]
#[ignore]
fn busybox_exit_code() {
    burrow_run(&["sh", "-c", "exit 7"]).code(7);
}

#[test]
#[ignore]
fn busybox_echo() {
    burrow_run(&["echo", "hello", "world!"])
        .success()
        .stdout(predicate::eq("hello world!\n"))
        .stderr(predicate::str::is_empty());
}

#[test]
#[ignore]
fn busybox_is_pid_one() {
    burrow_run(&["sh", "-c", "echo $$"])
        .success()
        .stdout(predicate::eq("1\n"));
}

#[test]
#[ignore]
fn busybox_sees_its_own_root() {
    let script = format!(
        "test -x /bin/busybox && test ! -e {}",
        env!("CARGO_MANIFEST_DIR")
    );
    burrow_run(&["sh", "-c", &script]).success();
}
