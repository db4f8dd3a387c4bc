use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCENARIO: &str = r#"{
    "movements": [
        {"subphase": "Tower 1", "period": 5, "concept": "cost", "value": 200},
        {"subphase": "Tower 1", "period": 7, "concept": "income", "value": 100},
        {"subphase": "Tower 1", "period": 7, "concept": "cost", "value": 700},
        {"subphase": "Tower 2", "period": 8, "concept": "income", "value": 300},
        {"subphase": "Tower 2", "period": 8, "concept": "cost", "value": 400},
        {"subphase": "Tower 2", "period": 10, "concept": "income", "value": 1500},
        {"subphase": "Tower 2", "period": 11, "concept": "income", "value": 2000}
    ],
    "terms": {
        "credit_limit": 7000,
        "monthly_cap": 8,
        "window_start": 7,
        "window_end": 30,
        "annual_rate": 12
    }
}"#;

fn ccs() -> Command {
    Command::cargo_bin("ccs").unwrap()
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn schedule_from_scenario_file_prints_envelope() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "scenario.json", SCENARIO);

    ccs()
        .args(["schedule", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"credit_ledger\""))
        .stdout(predicate::str::contains("\"contributions\""))
        .stdout(predicate::str::contains("\"rows\""))
        .stdout(predicate::str::contains("rust_decimal_128bit"));
}

#[test]
fn schedule_csv_has_one_record_per_period() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "scenario.json", SCENARIO);

    let output = ccs()
        .args(["schedule", "--output", "csv", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    // header + periods 5, 7, 8, 10, 11
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("period,"));
    assert!(lines[1].starts_with("5,"));
}

#[test]
fn schedule_from_yaml_movements_uses_flag_terms() {
    let dir = TempDir::new().unwrap();
    let movements = write_file(
        &dir,
        "movements.yaml",
        "- {period: 1, concept: income, value: 100}\n\
         - {period: 1, concept: cost, value: 300}\n\
         - {period: 2, concept: income, value: 500}\n\
         - {period: 3, concept: income, value: 500}\n",
    );

    ccs()
        .args(["schedule", "--output", "minimal", "--window-start", "1", "--movements"])
        .arg(&movements)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0"));
}

#[test]
fn unknown_concept_fails_with_exit_code_one() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        &dir,
        "bad.json",
        &SCENARIO.replace("\"concept\": \"cost\", \"value\": 200", "\"concept\": \"sales\", \"value\": 200"),
    );

    ccs()
        .args(["schedule", "--input"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown concept 'sales' in period 5"));
}

#[test]
fn invalid_window_is_rejected() {
    let dir = TempDir::new().unwrap();
    let movements = write_file(
        &dir,
        "movements.json",
        r#"[{"period": 1, "concept": "income", "value": 100}]"#,
    );

    ccs()
        .args(["schedule", "--window-start", "40", "--movements"])
        .arg(&movements)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credit window"));
}

#[test]
fn save_writes_project_to_store() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "scenario.json", SCENARIO);
    let store = dir.path().join("store.json");

    ccs()
        .args(["schedule", "--project", "Riverside", "--input"])
        .arg(&input)
        .arg("--save")
        .arg(&store)
        .assert()
        .success();

    let saved = fs::read_to_string(&store).unwrap();
    assert!(saved.contains("Riverside"));
    assert!(saved.contains("Tower 2"));
    assert!(saved.contains("Scenario imported from"));
}

#[test]
fn subphases_lists_windows() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "scenario.json", SCENARIO);

    ccs()
        .args(["subphases", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tower 1"))
        .stdout(predicate::str::contains("Tower 2"));
}

#[test]
fn missing_file_is_reported() {
    ccs()
        .args(["schedule", "--input", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn version_prints_binary_name() {
    ccs()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ccs "));
}
