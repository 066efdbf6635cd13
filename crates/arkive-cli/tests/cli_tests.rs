//! Integration tests for arkive-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use arkive_core::test_utils::create_encrypted_zip;
use arkive_core::test_utils::create_test_7z;
use arkive_core::test_utils::create_test_tar;
use arkive_core::test_utils::create_test_zip;
use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn arkive_cmd() -> Command {
    cargo_bin_cmd!("arkive")
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("failed to write fixture");
    path
}

fn sample_tar(dir: &TempDir) -> PathBuf {
    write_fixture(
        dir,
        "sample.tar",
        &create_test_tar(&[
            ("sample.txt", b"sample content\n"),
            ("nested/", b""),
            ("nested/deep.txt", b"deep"),
        ]),
    )
}

#[test]
fn test_version_flag() {
    arkive_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("arkive"));
}

#[test]
fn test_help_flag() {
    arkive_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Command-line utility"));
}

#[test]
fn test_extract_help() {
    arkive_cmd()
        .arg("extract")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Extract archive contents"))
        .stdout(predicate::str::contains("--password"));
}

#[test]
fn test_extract_creates_files() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_tar(&temp);
    let out = temp.path().join("out");

    arkive_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    assert_eq!(
        std::fs::read_to_string(out.join("sample.txt")).unwrap(),
        "sample content\n"
    );
    assert!(out.join("nested").is_dir());
    assert_eq!(std::fs::read(out.join("nested/deep.txt")).unwrap(), b"deep");
}

#[test]
fn test_extract_selected_entries() {
    let temp = TempDir::new().unwrap();
    let archive = sample_tar(&temp);
    let out = temp.path().join("out");

    arkive_cmd()
        .args(["extract", "--entry", "2"])
        .arg(&archive)
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("nested/deep.txt").is_file());
    assert!(!out.join("sample.txt").exists());
}

#[test]
fn test_extract_quiet_prints_nothing() {
    let temp = TempDir::new().unwrap();
    let archive = sample_tar(&temp);

    arkive_cmd()
        .arg("--quiet")
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_extract_json_output() {
    let temp = TempDir::new().unwrap();
    let archive = sample_tar(&temp);

    let output = arkive_cmd()
        .arg("--json")
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("out"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "extract");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["attempted"], 3);
    assert_eq!(json["data"]["skipped"], 1);
    assert_eq!(json["data"]["entries"][0]["status"], "ok");
}

#[test]
fn test_test_command_zip() {
    let temp = TempDir::new().unwrap();
    let archive = write_fixture(
        &temp,
        "bundle.zip",
        &create_test_zip(&[("a.txt", b"alpha"), ("b.txt", b"beta")]),
    );

    arkive_cmd()
        .arg("test")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Test complete"));
}

#[test]
fn test_wrong_password_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let archive = write_fixture(
        &temp,
        "locked.zip",
        &create_encrypted_zip(&[("secret.txt", b"hidden")], "opensesame"),
    );

    arkive_cmd()
        .arg("test")
        .arg(&archive)
        .assert()
        .failure()
        .stdout(predicate::str::contains("finished with failures"))
        .stderr(predicate::str::contains("HINT"))
        .stderr(predicate::str::contains("--password"));

    arkive_cmd()
        .args(["test", "--password", "opensesame"])
        .arg(&archive)
        .assert()
        .success();
}

#[test]
fn test_list_encrypted_7z_header() {
    let temp = TempDir::new().unwrap();
    let archive = write_fixture(
        &temp,
        "hidden.7z",
        &create_test_7z(&[("secret.txt", b"hidden")], Some("opensesame"), true),
    );

    arkive_cmd()
        .arg("list")
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password"));

    arkive_cmd()
        .args(["list", "--password", "opensesame"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("secret.txt"));
}

#[test]
fn test_extract_unknown_format() {
    let temp = TempDir::new().unwrap();
    let notes = write_fixture(&temp, "notes.txt", b"just text");

    arkive_cmd()
        .arg("extract")
        .arg(&notes)
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a supported archive"));
}

#[test]
fn test_extract_corrupt_archive() {
    let temp = TempDir::new().unwrap();
    let fake = write_fixture(&temp, "fake.zip", b"this is not a zip file at all");

    arkive_cmd()
        .arg("extract")
        .arg(&fake)
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot open"));
}

#[test]
fn test_list_short_and_long() {
    let temp = TempDir::new().unwrap();
    let archive = sample_tar(&temp);

    arkive_cmd()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("sample.txt"))
        .stdout(predicate::str::contains("nested/deep.txt"));

    arkive_cmd()
        .args(["list", "--long"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 3 entries (1 directories)"))
        .stdout(predicate::str::contains("2020-09-13 12:26:40"));
}

#[test]
fn test_list_json() {
    let temp = TempDir::new().unwrap();
    let archive = sample_tar(&temp);

    let output = arkive_cmd()
        .args(["--json", "list"])
        .arg(&archive)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["data"]["format"], "tar");
    assert_eq!(json["data"]["entry_count"], 3);
    assert_eq!(json["data"]["entries"][1]["is_dir"], true);
}

#[test]
fn test_formats_lists_builtin() {
    arkive_cmd()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("7z"))
        .stdout(predicate::str::contains("docx"))
        .stdout(predicate::str::contains("tgz"));
}

#[test]
fn test_formats_json() {
    let output = arkive_cmd().args(["--json", "formats"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["7z", "bzip2", "gzip", "tar", "xz", "zip", "zstd"]);
}

#[test]
fn test_info_resolves_paths() {
    arkive_cmd()
        .args(["info", "backup.tgz", "report.DOCX"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup.tgz: gzip"))
        .stdout(predicate::str::contains("report.DOCX: zip"));
}

#[test]
fn test_info_rejects_executable() {
    arkive_cmd()
        .args(["info", "setup.exe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an archive"));
}

#[test]
fn test_completion_bash() {
    arkive_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("arkive"));
}
