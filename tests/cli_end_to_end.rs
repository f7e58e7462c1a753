use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn vault() -> TempDir {
    let dir = TempDir::new().expect("tmp dir");
    fs::write(
        dir.path().join("titled.md"),
        "---\ntitle: \"Release notes\"\ntags: [x]\n---\nbody\n",
    )
    .expect("write titled");
    fs::write(dir.path().join("plain.md"), "no front matter\n").expect("write plain");
    fs::write(
        dir.path().join("custom.md"),
        "---\nheading: Custom heading\n---\n",
    )
    .expect("write custom");
    dir
}

fn titlekeeper() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("titlekeeper"));
    cmd.env("TITLEKEEPER__LOGGING__LEVEL", "error")
        .env_remove("TITLEKEEPER_CONFIG_FILE")
        .env_remove("TITLEKEEPER_LOG");
    cmd
}

#[test]
fn resolve_prints_titles_with_basename_fallback() {
    let vault = vault();

    let assert = titlekeeper()
        .arg("resolve")
        .arg("--root")
        .arg(vault.path())
        .arg("titled.md")
        .arg("plain.md")
        .arg("missing.md")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("titled.md\tRelease notes"));
    assert!(output.contains("plain.md\tplain"));
    assert!(output.contains("missing.md\tmissing"));
}

#[test]
fn resolve_honours_custom_title_key() {
    let vault = vault();

    titlekeeper()
        .arg("resolve")
        .arg("--root")
        .arg(vault.path())
        .arg("--title-key")
        .arg("heading")
        .arg("custom.md")
        .assert()
        .success()
        .stdout(contains("custom.md\tCustom heading"));
}

#[test]
fn config_prints_effective_settings() {
    titlekeeper()
        .arg("config")
        .arg("--cache-capacity")
        .arg("32")
        .assert()
        .success()
        .stdout(contains("capacity: 32"));
}

#[test]
fn zero_capacity_fails_fast() {
    titlekeeper()
        .arg("config")
        .arg("--cache-capacity")
        .arg("0")
        .assert()
        .failure()
        .stderr(contains("cache.capacity"));
}

#[test]
fn logs_stay_off_stdout() {
    let vault = vault();

    let assert = titlekeeper()
        .env("TITLEKEEPER_LOG", "debug")
        .arg("resolve")
        .arg("--root")
        .arg(vault.path())
        .arg("titled.md")
        .assert()
        .success();

    let output = assert.get_output();
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "titled.md\tRelease notes\n"
    );
    assert!(!output.stderr.is_empty());
}
