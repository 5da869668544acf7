// cargo_bin is deprecated in favour of a macro that needs build-dir setup.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("beyonder-cli-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn beyonder() -> Command {
    Command::cargo_bin("beyonder").unwrap()
}

#[test]
fn roster_lists_bundled_characters() {
    beyonder()
        .arg("roster")
        .assert()
        .success()
        .stdout(predicate::str::contains("WARRIOR"))
        .stdout(predicate::str::contains("beyonder-default-ninja"));
}

#[test]
fn battle_between_bundled_characters() {
    beyonder()
        .args(["battle", "--p1", "warrior", "--p2", "mage", "--seed", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[START]"))
        .stdout(predicate::str::contains("winner: P"));
}

#[test]
fn battle_json_report() {
    let out = beyonder()
        .args(["battle", "--p1", "knight", "--p2", "rogue", "--seed", "7", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(report["log"].is_array());
    assert!(report["turns"].as_u64().is_some_and(|t| t >= 1));
}

#[test]
fn battle_accepts_card_files_with_bom() {
    let dir = scratch("card");
    let card = dir.join("golem.json");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(br#"{"name":"GOLEM","uuid":"beyonder-golem","hp":150,"atk":9}"#);
    std::fs::write(&card, bytes).unwrap();

    beyonder()
        .args(["battle", "--p2", "paladin", "--p1"])
        .arg(&card)
        .assert()
        .success()
        .stdout(predicate::str::contains("GOLEM"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unknown_character_fails() {
    beyonder()
        .args(["battle", "--p1", "dragon", "--p2", "mage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dragon"));
}

#[test]
fn battle_persists_progression_to_store() {
    let dir = scratch("store");
    let store = dir.join("progress.json");
    beyonder()
        .args(["battle", "--p1", "warrior", "--p2", "mage", "--seed", "1", "--store"])
        .arg(&store)
        .assert()
        .success();

    let saved = std::fs::read_to_string(&store).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&saved).unwrap();
    let exp = doc["beyonder-default-warrior"]["exp"].as_u64().unwrap();
    assert!(exp == 25 || exp == 50);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn upgrade_spends_a_bundled_point() {
    let dir = scratch("upgrade");
    let store = dir.join("progress.json");

    // a fresh store starts from the bundled dataset, where the knight holds 3 points
    beyonder()
        .args(["upgrade", "--uuid", "beyonder-default-knight", "--stat", "hp", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("hp +2"))
        .stdout(predicate::str::contains("2 pts left"));

    beyonder()
        .args(["upgrade", "--uuid", "beyonder-nobody", "--stat", "atk", "--store"])
        .arg(&store)
        .assert()
        .failure();

    beyonder()
        .args(["upgrade", "--uuid", "beyonder-default-knight", "--stat", "luck", "--store"])
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown stat"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn migrate_rewrites_legacy_records() {
    let dir = scratch("migrate");
    let store = dir.join("progress.json");
    std::fs::write(&store, r#"{"beyonder-x":{"hpBonus":1,"speedBonus":4,"points":2}}"#).unwrap();

    beyonder()
        .args(["migrate", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 records"));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(doc["beyonder-x"]["defenceBonus"], 4);
    assert_eq!(doc["beyonder-x"]["level"], 1);
    assert!(doc["beyonder-x"].get("speedBonus").is_none());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn progress_shows_records_without_writing() {
    let dir = scratch("progress");
    let store = dir.join("progress.json");

    beyonder()
        .args(["progress", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("beyonder-default-knight"))
        .stdout(predicate::str::contains("defenceBonus"));
    assert!(!store.exists());

    let legacy = r#"{"beyonder-x":{"speedBonus":4}}"#;
    std::fs::write(&store, legacy).unwrap();
    beyonder()
        .args(["progress", "--store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("beyonder-x"));
    assert_eq!(std::fs::read_to_string(&store).unwrap(), legacy);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn simulate_many_reports_rates() {
    Command::cargo_bin("simulate-many")
        .unwrap()
        .args(["--p1", "ninja", "--p2", "knight", "--samples", "10", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("samples:            10"))
        .stdout(predicate::str::contains("p1 win rate:"));
}
