//! `servo render` runs the template-file path offline.
//!
//! GREEN when:
//! - with no `--out`, the synthesized config goes to stdout
//! - with `--out`, the config is written to the file and a key=value summary
//!   is printed
//! - a load balancer whose policy was never supplied fails and names it

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

use servo_testkit::{LOAD_BALANCER_JSON, STICKY_POLICY_JSON, TEMPLATE_CONF};

fn fixtures(dir: &Path) {
    fs::write(dir.join("template.conf"), TEMPLATE_CONF).unwrap();
    fs::write(dir.join("sticky.json"), STICKY_POLICY_JSON).unwrap();
    fs::write(dir.join("lb.json"), LOAD_BALANCER_JSON).unwrap();
    fs::write(
        dir.join("servo.yaml"),
        format!("paths:\n  log_dir: {}\n", dir.join("logs").display()),
    )
    .unwrap();
}

fn servo(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("servo").unwrap();
    cmd.current_dir(dir)
        .arg("--config")
        .arg(dir.join("servo.yaml"));
    cmd
}

#[test]
fn render_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    fixtures(dir.path());

    servo(dir.path())
        .args(["render", "--template", "template.conf"])
        .args(["--policy", "sticky.json", "--loadbalancer", "lb.json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#template\nglobal\n"))
        .stdout(predicate::str::contains("frontend http-8080\n"))
        .stdout(predicate::str::contains("cookie AWSELB insert indirect"));
}

#[test]
fn render_to_file_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    fixtures(dir.path());

    servo(dir.path())
        .args(["render", "--template", "template.conf"])
        .args(["--policy", "sticky.json", "--loadbalancer", "lb.json"])
        .args(["--out", "haproxy.cfg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reconciled=true load_balancer=balancer-1"))
        .stdout(predicate::str::contains("policies=sticky"));

    let written = fs::read_to_string(dir.path().join("haproxy.cfg")).unwrap();
    assert!(written.contains("backend backend-http-8080\n"));
}

#[test]
fn render_without_policy_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    fixtures(dir.path());

    servo(dir.path())
        .args(["render", "--template", "template.conf", "--loadbalancer", "lb.json"])
        .args(["--out", "haproxy.cfg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("policy not found sticky"));

    assert!(!dir.path().join("haproxy.cfg").exists());
}
