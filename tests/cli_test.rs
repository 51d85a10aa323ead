use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_enrollments_on_empty_ledger_prints_header() {
    let mut cmd = Command::new(cargo_bin!("coursepay"));
    cmd.arg("enrollments");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("user_id,course_id,order_id,granted_at"));
}

#[test]
fn test_sweep_on_empty_ledger() {
    let mut cmd = Command::new(cargo_bin!("coursepay"));
    cmd.arg("sweep").arg("--order-ttl-secs").arg("60");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("expired 0 orders"));
}

#[test]
fn test_serve_requires_gateway_secret() {
    let mut cmd = Command::new(cargo_bin!("coursepay"));
    cmd.env_remove("COURSEPAY_GATEWAY_SECRET")
        .arg("serve")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--gateway-secret"));
}

#[test]
fn test_serve_rejects_malformed_catalog() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "course_id,price,currency,total_lectures").unwrap();
    writeln!(file, "rust-101,not_a_number,INR,12").unwrap();

    let mut cmd = Command::new(cargo_bin!("coursepay"));
    cmd.env("COURSEPAY_GATEWAY_SECRET", "whsec_test")
        .arg("serve")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--catalog")
        .arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read catalog"));
}

#[test]
fn test_serve_reports_missing_catalog() {
    let mut cmd = Command::new(cargo_bin!("coursepay"));
    cmd.env("COURSEPAY_GATEWAY_SECRET", "whsec_test")
        .arg("serve")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--catalog")
        .arg("tests/fixtures/does_not_exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to open catalog"));
}
