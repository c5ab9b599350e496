//! CLI end-to-end tests
//!
//! Tests for the recast command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the recast binary
#[allow(deprecated)]
fn recast_cmd() -> Command {
    Command::cargo_bin("recast").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = recast_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = recast_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recast"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = recast_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("recast"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = recast_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("recast "));
}

#[test]
fn test_cli_formats_lists_families() {
    let mut cmd = recast_cmd();
    cmd.arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("image:"))
        .stdout(predicate::str::contains("document:"))
        .stdout(predicate::str::contains("jpeg"))
        .stdout(predicate::str::contains("pdf"));
}

#[test]
fn test_cli_formats_single_input() {
    let mut cmd = recast_cmd();
    // An alias resolves to its canonical name
    cmd.args(["formats", "jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jpeg can be converted to:"))
        .stdout(predicate::str::contains("png"));
}

#[test]
fn test_cli_formats_unknown_input() {
    let mut cmd = recast_cmd();
    cmd.args(["formats", "exe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = recast_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("pandoc"));
}

#[test]
fn test_cli_validate_no_config() {
    let mut cmd = recast_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("No config file specified"));
}

#[test]
fn test_cli_validate_valid_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("recast.toml");
    fs::write(
        &config_file,
        r#"
[storage]
retention_secs = 120

[queue]
workers = 2
"#,
    )
    .unwrap();

    let mut cmd = recast_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Configuration is valid"))
        .stdout(predicate::str::contains("Retention: 120s"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("recast.toml");
    fs::write(&config_file, "[storage]\nretention_secs = 0\n").unwrap();

    let mut cmd = recast_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention"));
}

#[test]
fn test_cli_convert_missing_input() {
    let mut cmd = recast_cmd();
    cmd.args(["convert", "/nonexistent/input.png", "--to", "jpeg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_convert_unknown_format() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("input.xyz");
    fs::write(&input, b"whatever").unwrap();

    let mut cmd = recast_cmd();
    cmd.args(["convert", input.to_str().unwrap(), "--to", "png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn test_cli_convert_png_to_jpeg_roundtrip() {
    let temp = tempdir().unwrap();

    // Keep the service's artifacts inside the test directory.
    let config_file = temp.path().join("recast.toml");
    fs::write(
        &config_file,
        format!(
            "[storage]\noutput_dir = \"{}\"\n\n[queue]\nworkers = 1\n",
            temp.path().join("artifacts").display()
        ),
    )
    .unwrap();

    let input = temp.path().join("input.png");
    let img = image::RgbImage::from_pixel(12, 12, image::Rgb([200, 40, 40]));
    img.save(&input).unwrap();

    let output = temp.path().join("out.jpeg");

    let mut cmd = recast_cmd();
    cmd.args([
        "--config",
        config_file.to_str().unwrap(),
        "convert",
        input.to_str().unwrap(),
        "--to",
        "jpeg",
        "--output",
        output.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Conversion complete"));

    let bytes = fs::read(&output).unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}
