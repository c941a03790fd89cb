//! Integration tests for Unix process management
//!
//! These tests verify that spawned workers:
//! - live in their own process groups (via setsid)
//! - can be terminated and killed by group
//! - report liveness and exit status correctly

#![cfg(unix)]
#![allow(unsafe_code)] // Required for libc calls in tests

use respawn_core::process::unix::{exit_parts, signal_kill_group, signal_term_group, spawn};
use std::time::Duration;

/// Test that spawned processes are in their own process group
#[tokio::test]
async fn test_process_group_isolation() {
    let mut child = spawn("sleep", &["5"], &[]).expect("Failed to spawn sleep");

    let parent_pgid = unsafe { libc::getpgrp() };
    let child_pgid = unsafe { libc::getpgid(child.pid() as i32) };

    assert_eq!(child_pgid as u32, child.pid());
    assert_ne!(child_pgid, parent_pgid);

    signal_kill_group(&child).unwrap();
    child.wait().await.unwrap();
}

/// SIGTERM ends a default-handling process and is reported as a signal exit
#[tokio::test]
async fn test_sigterm_termination() {
    let mut child = spawn("sleep", &["10"], &[]).expect("Failed to spawn sleep");

    signal_term_group(&child).expect("Failed to send SIGTERM");

    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("sleep survived SIGTERM")
        .unwrap();
    assert_eq!(exit_parts(status), (None, Some(libc::SIGTERM)));
}

/// A process that traps SIGTERM keeps running until SIGKILL
#[tokio::test]
async fn test_sigkill_after_ignored_sigterm() {
    let mut child = spawn("sh", &["-c", "trap '' TERM; sleep 10"], &[])
        .expect("Failed to spawn sh");
    tokio::time::sleep(Duration::from_millis(200)).await;

    signal_term_group(&child).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // sleep inherited the ignored disposition, so the whole group survives
    assert!(child.is_alive().unwrap());

    signal_kill_group(&child).unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("process survived SIGKILL")
        .unwrap();
    assert!(!status.success());
}

/// Liveness is polled without blocking and the exit code is preserved
#[tokio::test]
async fn test_liveness_and_exit_code() {
    let mut child = spawn("sh", &["-c", "sleep 0.2; exit 3"], &[]).expect("Failed to spawn sh");
    assert!(child.is_alive().unwrap());

    let mut attempts = 0;
    while child.is_alive().unwrap() {
        attempts += 1;
        assert!(attempts < 100, "process {} never exited", child.pid());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let status = child.exit_status().expect("status recorded after exit");
    assert_eq!(exit_parts(status), (Some(3), None));
}

/// Test spawning multiple processes
#[tokio::test]
async fn test_multiple_processes() {
    let mut child1 = spawn("sleep", &["2"], &[]).expect("Failed to spawn first sleep");
    let mut child2 = spawn("sleep", &["2"], &[]).expect("Failed to spawn second sleep");

    assert_ne!(child1.pid(), child2.pid());
    assert_eq!(child1.pid(), child1.pgid());
    assert_eq!(child2.pid(), child2.pgid());

    signal_kill_group(&child1).unwrap();
    signal_kill_group(&child2).unwrap();
    child1.wait().await.unwrap();
    child2.wait().await.unwrap();
}
