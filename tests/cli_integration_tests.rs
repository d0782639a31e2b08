//! End-to-end tests for the cycle-supervisor binary
//!
//! Standard utilities stand in for the workflow engine executables: `true`
//! always succeeds, `false` always fails and `echo` shows the arguments the
//! supervisor passed.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const WORKFLOW_ENV: &str = "CYCLE_SUPERVISOR__ENGINE__WORKFLOW";

/// Binary invocation isolated from any config file or env in the caller's cwd
fn supervisor(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cycle-supervisor").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("CYCLE_SUPERVISOR__SUPERVISOR__POLL_INTERVAL_SECS")
        .env_remove(WORKFLOW_ENV)
        .timeout(std::time::Duration::from_secs(30));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("boot"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn test_boot_failure_terminates_before_polling() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["run", "--rocotorun", "true", "--rocotoboot", "false", "--interval", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("false exited with status 1"));
}

#[test]
fn test_initial_synchronize_failure_terminates() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["--rocotorun", "false", "--rocotoboot", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("false exited with status 1"));
}

#[test]
fn test_missing_engine_binary_is_reported() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["sync", "--rocotorun", "/nonexistent/bin/rocotorun"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/bin/rocotorun not found"));
}

#[test]
fn test_sync_runs_engine_once() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["sync", "--rocotorun", "true"])
        .assert()
        .success();
}

#[test]
fn test_boot_passes_cycle_and_task_list_to_engine() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args([
            "boot",
            "--rocotoboot",
            "echo",
            "--cycle",
            "2024010100",
            "--task-list",
            "prep_ic",
            "--log-level",
            "debug",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "-w workflow.xml -d workflow.db -c 2024010100 -t prep_ic",
        ));
}

#[test]
fn test_status_prints_engine_table_on_stdout() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args([
            "status",
            "--rocotostat",
            "echo",
            "--workflow",
            "/work/gsi.xml",
            "--database",
            "/work/gsi.store",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("-w /work/gsi.xml -d /work/gsi.store\n"));
}

#[test]
fn test_config_file_in_working_directory_is_picked_up() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("cycle-supervisor.toml"),
        "[engine]\nrocotostat = \"echo\"\nworkflow = \"from-file.xml\"\n",
    )
    .unwrap();

    supervisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-w from-file.xml"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["--config", "nope.toml", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_environment_override_is_validated() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .env("CYCLE_SUPERVISOR__SUPERVISOR__POLL_INTERVAL_SECS", "0")
        .args(["--rocotorun", "true", "--rocotoboot", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs must be greater than zero"));
}

/// `status` echoes its arguments, so stdout shows which workflow path won.
fn write_workflow_config(dir: &TempDir) {
    std::fs::write(
        dir.path().join("cycle-supervisor.toml"),
        "[engine]\nrocotostat = \"echo\"\nworkflow = \"from-file.xml\"\n",
    )
    .unwrap();
}

#[test]
fn test_environment_beats_config_file() {
    let dir = TempDir::new().unwrap();
    write_workflow_config(&dir);

    supervisor(&dir)
        .env(WORKFLOW_ENV, "from-env.xml")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-w from-env.xml"));
}

#[test]
fn test_command_line_beats_environment_and_file() {
    let dir = TempDir::new().unwrap();
    write_workflow_config(&dir);

    supervisor(&dir)
        .env(WORKFLOW_ENV, "from-env.xml")
        .args(["status", "--workflow", "from-cli.xml"])
        .assert()
        .success()
        .stdout(predicate::str::diff("-w from-cli.xml -d workflow.db\n"));
}

#[test]
fn test_interval_flag_overrides_invalid_environment_value() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .env("CYCLE_SUPERVISOR__SUPERVISOR__POLL_INTERVAL_SECS", "0")
        .args(["--interval", "5", "--rocotorun", "true", "--rocotoboot", "false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("false exited with status 1"))
        .stderr(predicate::str::contains("must be greater than zero").not());
}

#[test]
fn test_dotenv_file_sits_between_file_and_environment() {
    let dir = TempDir::new().unwrap();
    write_workflow_config(&dir);
    std::fs::write(dir.path().join(".env"), format!("{WORKFLOW_ENV}=from-dotenv.xml\n")).unwrap();

    supervisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-w from-dotenv.xml"))
        .stderr(predicate::str::contains("Loaded environment variables from .env file"));

    supervisor(&dir)
        .env(WORKFLOW_ENV, "from-env.xml")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-w from-env.xml"));
}

#[test]
fn test_target_flags_work_without_run_subcommand() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args([
            "--cycle",
            "2024010100",
            "--task-list",
            "prep_ic",
            "--interval",
            "5",
            "--rocotorun",
            "true",
            "--rocotoboot",
            "false",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Boot failed"))
        .stderr(predicate::str::contains("2024010100"));
}

#[test]
fn test_logs_carry_no_color_codes_when_piped() {
    let dir = TempDir::new().unwrap();
    supervisor(&dir)
        .args(["sync", "--rocotorun", "true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Engine synchronized"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_init_config_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();

    supervisor(&dir)
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));

    let written = std::fs::read_to_string(dir.path().join("cycle-supervisor.toml")).unwrap();
    assert!(written.contains("poll_interval_secs = 60"));
    assert!(written.contains("cycle = \"201808121200\""));

    supervisor(&dir)
        .arg("init-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    supervisor(&dir)
        .args(["init-config", "--force"])
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_polling_gracefully() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::Duration;

    let dir = TempDir::new().unwrap();
    let child = StdCommand::new(assert_cmd::cargo::cargo_bin("cycle-supervisor"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["run", "--rocotorun", "true", "--rocotoboot", "true", "--interval", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(2500));
    let killed = StdCommand::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("Cycle booted"));
    assert!(stderr.contains("Supervisor stopped"));
}

#[cfg(unix)]
#[test]
fn test_second_sigterm_exits_while_engine_call_runs() {
    use std::os::unix::fs::PermissionsExt;
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let slow_boot = dir.path().join("slowboot.sh");
    std::fs::write(&slow_boot, "#!/bin/sh\nexec sleep 20\n").unwrap();
    std::fs::set_permissions(&slow_boot, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("cycle-supervisor"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["run", "--rocotorun", "true", "--interval", "1", "--rocotoboot"])
        .arg(&slow_boot)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let sigterm = |pid: u32| {
        StdCommand::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .unwrap()
    };

    std::thread::sleep(Duration::from_millis(1500));
    assert!(sigterm(child.id()).success());
    std::thread::sleep(Duration::from_millis(500));
    assert!(child.try_wait().unwrap().is_none(), "first SIGTERM waits for the boot");
    assert!(sigterm(child.id()).success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        assert!(Instant::now() < deadline, "still running after a second SIGTERM");
        std::thread::sleep(Duration::from_millis(100));
    };
    assert_eq!(status.code(), Some(143));
}
