use assert_cmd::Command;
use tempfile::tempdir;

use pariksha::history::{HistoryDb, HistoryEntry};
use pariksha::scorer::ResultRecord;
use pariksha::session::SubmitReason;

#[test]
fn help_lists_options() {
    let out = Command::cargo_bin("pariksha")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--resume"));
    assert!(stdout.contains("--max-cheat-attempts"));
    assert!(stdout.contains("--history"));
}

#[test]
fn missing_question_set_is_a_usage_error() {
    let home = tempdir().unwrap();
    Command::cargo_bin("pariksha")
        .unwrap()
        .env("HOME", home.path())
        .assert()
        .failure();
}

#[test]
fn empty_history() {
    let home = tempdir().unwrap();
    let out = Command::cargo_bin("pariksha")
        .unwrap()
        .env("HOME", home.path())
        .arg("--history")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("no attempts recorded yet"));
}

#[test]
fn history_lists_recorded_attempts() {
    let home = tempdir().unwrap();
    let db_path = home
        .path()
        .join(".local")
        .join("state")
        .join("pariksha")
        .join("history.db");
    HistoryDb::open(&db_path)
        .unwrap()
        .record(&HistoryEntry {
            title: "Fractions".to_string(),
            result: ResultRecord {
                correct_answers: 2,
                wrong_answers: 2,
                total_marks: 10,
                time_spent_secs: 95,
            },
            cheat_count: 3,
            submit_reason: SubmitReason::CheatLimit,
            finished_at: chrono::Local::now(),
        })
        .unwrap();

    let out = Command::cargo_bin("pariksha")
        .unwrap()
        .env("HOME", home.path())
        .arg("--history")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Fractions"));
    assert!(stdout.contains("10/20"));
    assert!(stdout.contains("CheatLimit"));
}

#[test]
fn non_tty_stdin_is_rejected() {
    let home = tempdir().unwrap();
    let set = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/arithmetic.json");
    let out = Command::cargo_bin("pariksha")
        .unwrap()
        .env("HOME", home.path())
        .arg(set)
        .write_stdin("")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("stdin must be a tty"));
}
