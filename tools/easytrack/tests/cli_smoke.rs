use assert_cmd::cargo::cargo_bin_cmd;

fn fixture(path: &str) -> String {
    format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn help_lists_flags() {
    let mut cmd = cargo_bin_cmd!("easytrack");
    cmd.arg("--help");
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");

    assert!(stdout.contains("--task"));
    assert!(stdout.contains("--quit-after"));
    assert!(stdout.contains("--headless"));
}

#[test]
fn seeded_task_run_exits_zero_at_deadline() {
    let mut cmd = cargo_bin_cmd!("easytrack");
    cmd.arg("--task")
        .arg("water plants")
        .arg("--quit-after")
        .arg("0")
        .arg("--headless")
        .write_stdin("");
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("subject=task-1 event=added message=water plants"));
    assert!(stdout.contains("subject=session event=finished"));
}

#[test]
fn stdin_commands_drive_a_celebration() {
    let mut cmd = cargo_bin_cmd!("easytrack");
    cmd.arg("--config")
        .arg(fixture("configs/fast-celebration.toml"))
        .arg("--headless")
        .write_stdin("add stretch\ntoggle 1\ntoggle 1\n");
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("subject=task-1 event=toggled message=completed"));
    assert!(stdout.contains("subject=balloon event=started"));
    assert!(stdout.contains("subject=balloon event=finished"));
}

#[test]
fn invalid_config_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("easytrack");
    cmd.arg("--config")
        .arg(fixture("configs/invalid-rows.toml"))
        .write_stdin("");
    cmd.assert().failure();
}

#[test]
fn missing_config_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("easytrack");
    cmd.arg("--config")
        .arg(fixture("configs/missing.toml"))
        .write_stdin("");
    cmd.assert().failure();
}
