#![cfg(all(feature = "cli", feature = "opencv"))]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn calibrate() -> Command {
    Command::cargo_bin("charuco-calibrate").expect("binary built")
}

#[test]
fn help_lists_board_flags() {
    calibrate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dictionary"))
        .stdout(predicate::str::contains("--image-dir"));
}

#[test]
fn capture_help_lists_calibration_flags() {
    Command::cargo_bin("charuco-capture")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-calibrate"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--modern-layout"));
}

#[test]
fn empty_image_directory_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("calibration_pictures");
    fs::create_dir(&images).unwrap();
    let output = tmp.path().join("calibration.json");

    calibrate()
        .arg("--image-dir")
        .arg(&images)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure();

    assert!(!output.exists());
}

#[test]
fn undecodable_images_fail_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("calibration_pictures");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("notes.txt"), "not an image").unwrap();
    fs::write(images.join("broken.png"), [0u8; 16]).unwrap();
    let output = tmp.path().join("calibration.json");

    calibrate()
        .arg("--image-dir")
        .arg(&images)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("any of the 2 images"));

    assert!(!output.exists());
}

#[test]
fn missing_config_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    calibrate()
        .arg("--config")
        .arg(tmp.path().join("nope.json"))
        .assert()
        .failure();
}
