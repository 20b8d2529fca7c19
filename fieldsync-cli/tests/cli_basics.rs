use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn fieldsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fieldsync"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

fn write_settings(home: &Path) {
    let dir = home.join(".fieldsync");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(
        dir.join("config.yaml"),
        "version: 1\n\
         portal_url: https://maps.example.com\n\
         feature_layer_url: https://maps.example.com/arcgis/rest/services/Survey/FeatureServer/0\n\
         referer: https://maps.example.com/Uploads/\n\
         user_id: surveyor01\n\
         read_username: surveyor01\n\
         write_username: editor01\n",
    )
    .expect("write config");
}

#[test]
fn help_lists_every_subcommand() {
    let home = TempDir::new().expect("home");
    fieldsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("login"))
        .stdout(contains("dedupe"))
        .stdout(contains("rekey"))
        .stdout(contains("update-heights"))
        .stdout(contains("report-nulls"))
        .stdout(contains("purge"));
}

#[test]
fn missing_settings_fails_with_a_clear_message() {
    let home = TempDir::new().expect("home");
    fieldsync_cmd(home.path())
        .arg("login")
        .assert()
        .failure()
        .stderr(contains("settings not found"));
}

#[test]
fn missing_password_env_fails_before_any_network_call() {
    let home = TempDir::new().expect("home");
    write_settings(home.path());
    fieldsync_cmd(home.path())
        .env_remove("FIELDSYNC_READ_PASSWORD")
        .env_remove("FIELDSYNC_WRITE_PASSWORD")
        .arg("login")
        .assert()
        .failure()
        .stderr(contains("FIELDSYNC_READ_PASSWORD"));
}

#[test]
fn rekey_requires_both_prefixes() {
    let home = TempDir::new().expect("home");
    write_settings(home.path());
    fieldsync_cmd(home.path())
        .arg("rekey")
        .assert()
        .failure()
        .stderr(contains("--from-prefix"));
}

#[test]
fn update_heights_requires_spk() {
    let home = TempDir::new().expect("home");
    write_settings(home.path());
    fieldsync_cmd(home.path())
        .args(["update-heights", "some-dir"])
        .assert()
        .failure()
        .stderr(contains("--spk"));
}
