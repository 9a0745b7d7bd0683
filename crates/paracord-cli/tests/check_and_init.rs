use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_paracord"))
}

fn write_record(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, content).expect("write record");
}

#[test]
fn init_creates_the_vault_layout() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path().join("vault");

    let out = bin().arg("--root").arg(&root).arg("init").output().expect("init");
    assert!(out.status.success());
    assert!(root.join(".paracord.toml").is_file());
    assert!(root.join("tasks").is_dir());
    assert!(root.join("projects").is_dir());
    assert!(root.join("areas").is_dir());

    // Running it again is harmless.
    let again = bin().arg("--root").arg(&root).arg("init").output().expect("init again");
    assert!(again.status.success());

    let list = bin()
        .arg("--root")
        .arg(&root)
        .arg("list")
        .arg("--json")
        .output()
        .expect("list");
    assert!(list.status.success());
    let rows: Value = serde_json::from_slice(&list.stdout).expect("json");
    assert_eq!(rows.as_array().expect("array").len(), 0);
}

#[test]
fn check_reports_a_clean_vault() {
    let temp = TempDir::new().expect("tempdir");
    write_record(
        temp.path(),
        "tasks/water-plants.md",
        "---\ntitle: Water plants\nstatus: ready\n---\n",
    );

    let out = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("check")
        .output()
        .expect("check");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("vault is clean"));
}

#[test]
fn check_finds_duplicates_behind_the_archive_flag() {
    let temp = TempDir::new().expect("tempdir");
    write_record(temp.path(), "tasks/report.md", "---\ntitle: Live\n---\n");
    write_record(
        temp.path(),
        "tasks/archive/report.md",
        "---\ntitle: Old\n---\n",
    );

    // The live set alone is consistent.
    let live = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("check")
        .output()
        .expect("check");
    assert!(live.status.success());

    let all = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("check")
        .arg("--all")
        .arg("--json")
        .output()
        .expect("check --all");
    assert_eq!(all.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&all.stdout).expect("json");
    let errors = report["errors"].as_array().expect("errors");
    assert!(errors
        .iter()
        .any(|err| err.as_str().expect("error").contains("duplicate task name")));
}

#[test]
fn broken_references_fail_check() {
    let temp = TempDir::new().expect("tempdir");
    write_record(
        temp.path(),
        "tasks/stray.md",
        "---\ntitle: Stray\nproject: '[[missing]]'\n---\n",
    );

    let out = bin()
        .arg("--root")
        .arg(temp.path())
        .arg("check")
        .output()
        .expect("check");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("unknown project"));
}

#[test]
fn version_prints_semver_with_git_metadata() {
    let out = bin().arg("version").output().expect("version");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("paracord "), "stdout: {stdout}");
    assert!(stdout.contains("+git."), "stdout: {stdout}");
    assert!(stdout.contains("(core "), "stdout: {stdout}");
}
