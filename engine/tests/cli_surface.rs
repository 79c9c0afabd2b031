use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn pyxray() -> Command {
    Command::cargo_bin("pyxray").unwrap()
}

fn seed(temp: &TempDir) {
    fs::write(temp.path().join("a.py"), "import b\n").unwrap();
    fs::write(temp.path().join("b.py"), "def run():\n    return 1\n").unwrap();
}

#[test]
fn missing_target_exits_two() {
    pyxray()
        .arg("/definitely/not/a/real/path")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("target path"));
}

#[test]
fn markdown_report_lands_on_stdout() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    pyxray()
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Repository X-Ray"));
}

#[test]
fn json_output_parses() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    let output = pyxray()
        .arg(temp.path())
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["metadata"]["total_files"], 2);
}

#[test]
fn out_prefix_writes_both_files() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    let prefix = temp.path().join("report");
    pyxray()
        .arg(temp.path())
        .args(["--output", "both", "--out"])
        .arg(&prefix)
        .assert()
        .success();
    assert!(prefix.with_extension("md").exists());
    assert!(prefix.with_extension("json").exists());
}

#[test]
fn no_section_shorthand_disables_a_section() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    pyxray()
        .arg(temp.path())
        .arg("--no-mermaid")
        .assert()
        .success()
        .stdout(predicate::str::contains("## Module Graph").not());
}

#[test]
fn unknown_no_section_warns_but_runs() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    pyxray()
        .arg(temp.path())
        .args(["--no", "not_a_section"])
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown section"));
}

#[test]
fn init_config_prints_template() {
    pyxray()
        .arg("--init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[sections]"))
        .stdout(predicate::str::contains("logic_maps"));
}

#[test]
fn malformed_config_exits_one() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    let config = temp.path().join("bad.toml");
    fs::write(&config, "sections = \"oops").unwrap();
    pyxray()
        .arg(temp.path())
        .args(["--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn minimal_preset_drops_git_sections() {
    let temp = TempDir::new().unwrap();
    seed(&temp);
    pyxray()
        .arg(temp.path())
        .args(["--preset", "minimal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Change Risk").not());
}
