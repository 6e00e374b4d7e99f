//! CLI tests for `wrapper run` and `wrapper plan`.
//!
//! Spawns the wrapper binary against a shell-script optimizer and verifies
//! exit codes, the forwarded command line, and the delivered result bytes.

#![cfg(unix)]

use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use wrapper::exit_codes;
use wrapper::test_support::{TEST_INDEX_VAR, TaskDir};

fn wrapper_cmd(subcommand: &str, task: &TaskDir, binary: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wrapper"));
    cmd.arg(subcommand)
        .arg("--share-root")
        .arg(task.share_root())
        .arg("--workdir")
        .arg(task.workdir())
        .arg("--binary")
        .arg(binary)
        .arg("--index-var")
        .arg(TEST_INDEX_VAR)
        .env(TEST_INDEX_VAR, task.index().as_str())
        .env_remove("SEED")
        .env_remove("EXPLORE")
        .env_remove("COMPRESS")
        .env_remove("FAKE_MODE");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("spawn wrapper")
}

#[test]
fn explore_override_reaches_optimizer_and_result_is_delivered() {
    let task = TaskDir::new("5").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");
    let payload = "{\"strip_width\":42.5}";

    let output = run(wrapper_cmd("run", &task, &fake)
        .env("EXPLORE", "50")
        .env("FAKE_PAYLOAD", payload));

    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let args = fs::read_to_string(task.workdir().join("args.txt")).expect("args");
    let args: Vec<&str> = args.lines().collect();
    let input = task.input_path();
    assert_eq!(
        args,
        vec![
            "-i",
            input.to_str().expect("utf8 path"),
            "-s",
            "23",
            "-e",
            "50",
            "-c",
            "200"
        ]
    );
    assert_eq!(
        fs::read_to_string(task.result_path()).expect("result"),
        payload
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("result_5.json"));
}

#[test]
fn two_outputs_exit_nonzero_without_result() {
    let task = TaskDir::new("8").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake).env("FAKE_MODE", "two"));

    assert_eq!(output.status.code(), Some(exit_codes::RESULT_AMBIGUOUS));
    assert!(!task.result_path().exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("found 2"));
}

#[test]
fn no_output_exits_nonzero_without_result() {
    let task = TaskDir::new("9").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake).env("FAKE_MODE", "none"));

    assert_eq!(output.status.code(), Some(exit_codes::RESULT_AMBIGUOUS));
    assert!(!task.result_path().exists());
}

#[test]
fn optimizer_failure_exits_nonzero_without_touching_outputs() {
    let task = TaskDir::new("1").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake).env("FAKE_MODE", "fail"));

    assert_eq!(output.status.code(), Some(exit_codes::SUBPROCESS_FAILED));
    assert!(!task.share_root().join("outputs").exists());
}

#[test]
fn missing_index_is_invalid() {
    let task = TaskDir::new("1").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake).env_remove(TEST_INDEX_VAR));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(!task.workdir().join("args.txt").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains(TEST_INDEX_VAR));
}

#[test]
fn timeout_kills_optimizer() {
    let task = TaskDir::new("4").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake)
        .arg("--timeout-secs")
        .arg("1")
        .env("FAKE_MODE", "sleep"));

    assert_eq!(output.status.code(), Some(exit_codes::TIMED_OUT));
    assert!(!task.result_path().exists());
}

#[test]
fn sigterm_is_forwarded_and_reported() {
    let task = TaskDir::new("6").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let mut child = wrapper_cmd("run", &task, &fake)
        .env("FAKE_MODE", "sleep")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn wrapper");

    // The optimizer writes args.txt once started, after the handler is installed.
    let started = Instant::now();
    while !task.workdir().join("args.txt").exists() {
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "optimizer never started"
        );
        thread::sleep(Duration::from_millis(20));
    }

    let pid = i32::try_from(child.id()).expect("pid");
    kill(Pid::from_raw(pid), Signal::SIGTERM).expect("signal wrapper");
    let status = child.wait().expect("wait wrapper");

    assert_eq!(status.code(), Some(exit_codes::INTERRUPTED));
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(!task.result_path().exists());
}

#[test]
fn non_unicode_parameter_is_rejected() {
    let task = TaskDir::new("2").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake)
        .env("SEED", std::ffi::OsStr::from_bytes(&[0x37, 0xff])));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SEED"));
    assert!(!task.workdir().join("args.txt").exists());
}

#[test]
fn missing_config_file_is_invalid() {
    let task = TaskDir::new("2").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("run", &task, &fake)
        .arg("--config")
        .arg(task.path().join("wrapper.tmol")));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    assert!(!task.workdir().join("args.txt").exists());
}

#[test]
fn plan_prints_invocation_without_running() {
    let task = TaskDir::new("3").expect("task dir");
    let fake = task.fake_optimizer().expect("fake optimizer");

    let output = run(wrapper_cmd("plan", &task, &fake).env("SEED", "11"));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("plan json");
    assert_eq!(plan["index"], "3");
    assert_eq!(plan["params"]["seed"], "11");
    assert_eq!(plan["params"]["explore"], "300");
    assert_eq!(plan["argv"][1], "-i");
    assert!(!task.workdir().join("args.txt").exists());
}
