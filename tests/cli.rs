use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn invoicer(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("invoicer"));
    cmd.current_dir(dir.path()).env_clear();
    cmd
}

#[test]
fn schedule_prints_the_cron_expression() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("invoicer.toml"),
        "[schedule]\nstart_date = \"2026-01-15\"\ninterval_unit = \"month\"\ninterval_quantity = \"3\"\n",
    )
    .expect("write config");

    invoicer(&dir)
        .arg("schedule")
        .assert()
        .success()
        .stdout(contains("0 0 1 */3 *"));
}

#[test]
fn check_names_every_missing_value() {
    let dir = TempDir::new().expect("temp dir");
    let template = dir.path().join("invoice.md");
    fs::write(&template, "Billed to {client}: {total}\n").expect("write template");

    invoicer(&dir)
        .arg("check")
        .arg("--template")
        .arg(&template)
        .assert()
        .failure()
        .stderr(contains("client, total"));
}

#[test]
fn check_reads_values_from_a_dotenv_file() {
    let dir = TempDir::new().expect("temp dir");
    let template = dir.path().join("invoice.md");
    fs::write(&template, "Billed to {client}: {total}\n").expect("write template");
    let env_file = dir.path().join("invoice.env");
    fs::write(&env_file, "client=ACME Corp\ntotal=\"1,200.00\"\n").expect("write env file");

    invoicer(&dir)
        .arg("--env-file")
        .arg(&env_file)
        .arg("check")
        .arg("--template")
        .arg(&template)
        .assert()
        .success()
        .stdout(contains("placeholders: client, total"));
}
