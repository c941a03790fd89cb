//! Runs the `respawn` binary end to end

#![cfg(unix)]

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

fn respawn() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_respawn"));
    cmd.env_remove("N_WORKERS")
        .env("RUST_LOG", "info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

#[tokio::test]
async fn sigint_shuts_the_pool_down_cleanly() {
    let mut child = respawn()
        .env("N_WORKERS", "2")
        .args(["--grace-secs", "3"])
        .spawn()
        .expect("spawn respawn");
    let pid = child.id().expect("running") as i32;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(child.try_wait().unwrap().is_none(), "supervisor exited early");

    kill(Pid::from_raw(pid), Signal::SIGINT).unwrap();

    let status = tokio::time::timeout(Duration::from_secs(15), child.wait())
        .await
        .expect("supervisor did not exit after SIGINT")
        .unwrap();
    assert!(status.success(), "{status:?}");
}

#[tokio::test]
async fn invalid_worker_count_exits_with_configuration_error() {
    for (flag, env) in [(None, "abc"), (Some("0"), "2")] {
        let mut cmd = respawn();
        cmd.env("N_WORKERS", env);
        if let Some(flag) = flag {
            cmd.args(["--workers", flag]);
        }

        let status = tokio::time::timeout(Duration::from_secs(10), cmd.status())
            .await
            .expect("respawn did not fail fast")
            .unwrap();
        assert_eq!(status.code(), Some(2), "flag {flag:?}, N_WORKERS={env}");
    }
}

#[tokio::test]
async fn worker_subcommand_exits_cleanly_on_sigterm() {
    let mut child = respawn()
        .args(["worker"])
        .spawn()
        .expect("spawn respawn worker");
    let pid = child.id().expect("running") as i32;

    tokio::time::sleep(Duration::from_millis(500)).await;
    if child.try_wait().unwrap().is_some() {
        // The first task drawn was the fatal one; nothing left to signal.
        return;
    }

    kill(Pid::from_raw(pid), Signal::SIGTERM).unwrap();

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("worker did not exit after SIGTERM")
        .unwrap();
    // A fatal task may still win the race against the signal.
    assert!(matches!(status.code(), Some(0) | Some(1)), "{status:?}");
}
