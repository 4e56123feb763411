mod common;

use assert_cmd::prelude::*;
use common::{digest, layer, schema_v1, FakeRegistry};
use predicates::prelude::*;
use std::process::Command;

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO"));
    command
        .arg("run")
        .arg("--quiet")
        .arg("-p")
        .arg("burrow-cli")
        .arg("--");
    command
}

#[test]
fn cli_no_args() {
    cli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("USAGE"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUBCOMMANDS:"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn cli_run_help() {
    cli()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--unconfined"))
        .stdout(predicate::str::contains("--helper"));
}

#[test]
fn cli_bad_reference() {
    cli()
        .arg("run")
        .arg("Not/A/Valid/Name")
        .arg("true")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid image reference format"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn cli_bad_registry_url() {
    cli()
        .arg("run")
        .arg("--registry")
        .arg("not a url")
        .arg("busybox")
        .arg("true")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("burrow: "));
}

#[tokio::test]
async fn cli_exit_code_from_fake_registry() {
    let registry = FakeRegistry::start("library/app").await;
    let layers = vec![digest(0x30)];
    registry
        .manifest("library/app", "v1", schema_v1(&layers), 1)
        .await;
    registry
        .blob("library/app", &layers[0], layer(&[("etc/motd", "hi\n")]))
        .await;
    let tmp = tempfile::tempdir().unwrap();

    cli()
        .arg("-l")
        .arg("error")
        .arg("run")
        .arg("--unconfined")
        .arg("--registry")
        .arg(registry.server.uri())
        .arg("--auth-url")
        .arg(format!("{}/token", registry.server.uri()))
        .arg("--tmp-dir")
        .arg(tmp.path())
        .arg("app:v1")
        .arg("sh")
        .arg("-c")
        .arg("cat etc/motd; exit 7")
        .assert()
        .code(7)
        .stdout(predicate::eq("hi\n"));

    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}
