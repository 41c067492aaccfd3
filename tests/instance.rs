#![cfg(unix)]

mod common;
use crate::common::builders::InstanceConfigBuilder;
use crate::common::process::{counter_command, echo_command, stubborn_command};
use crate::common::{
    append, init_tracing, wait_for_change, wait_for_output, wait_for_stabilize, with_timeout,
    write_file,
};

use std::sync::Arc;
use std::time::Duration;

use wado::engine::Instance;
use wado::errors::WadoError;
use wado::exec::SharedBuffer;
use wado::types::WatcherKind;

fn runs(buf: &SharedBuffer) -> usize {
    buf.contents().matches("run").count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn changes_inside_min_delay_are_absorbed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let go = write_file(dir.path(), "main.go", "package main\n");

    let cfg = InstanceConfigBuilder::new("debounce")
        .include("*.go")
        .cmd(&echo_command("run"))
        .min_delay(500)
        .build();
    let buf = SharedBuffer::new();
    let instance = Instance::start_with_sink(&cfg, dir.path(), buf.sink()).unwrap();
    assert!(wait_for_output(&buf, Duration::from_secs(5), |s| s == "run\n").await);

    instance.notify_change(&go).await;
    with_timeout(instance.chain().wait()).await;
    assert_eq!(runs(&buf), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    instance.notify_change(&go).await;
    assert!(wait_for_output(&buf, Duration::from_secs(5), |s| s == "run\nrun\n").await);

    with_timeout(instance.kill()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_change_restarts_the_chain() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let go = write_file(dir.path(), "main.go", "package main\n");

    let cfg = InstanceConfigBuilder::new("e2e")
        .include("*.go")
        .cmd(&echo_command("run"))
        .watcher(WatcherKind::Event)
        .build();
    let buf = SharedBuffer::new();
    let instance = Instance::start_with_sink(&cfg, dir.path(), buf.sink()).unwrap();
    assert_eq!(instance.name(), "e2e");
    assert!(wait_for_output(&buf, Duration::from_secs(5), |s| s == "run\n").await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    append(&go, b"// edit\n");
    assert!(wait_for_output(&buf, Duration::from_secs(5), |s| runs_in(s) >= 2).await);

    with_timeout(instance.kill()).await;
}

fn runs_in(s: &str) -> usize {
    s.matches("run").count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn kill_stops_commands_and_watcher() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "main.go", "package main\n");

    let cfg = InstanceConfigBuilder::new("long")
        .include("*.go")
        .cmd(&counter_command(20))
        .cmd(&echo_command("never"))
        .build();
    let buf = SharedBuffer::new();
    let instance = Instance::start_with_sink(&cfg, dir.path(), buf.sink()).unwrap();
    assert!(wait_for_change(&buf, Duration::from_secs(5)).await);

    with_timeout(instance.kill()).await;

    assert!(!instance.chain().is_running());
    assert_eq!(instance.watcher().file_count(), 0);
    assert!(wait_for_stabilize(&buf, Duration::from_millis(150), Duration::from_secs(5)).await);
    assert!(!buf.contents().contains("never"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_in_flight_during_kill_does_not_revive_the_chain() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let go = write_file(dir.path(), "main.go", "package main\n");

    let cfg = InstanceConfigBuilder::new("shutdown")
        .include("*.go")
        .cmd(&stubborn_command(30))
        .min_delay(1)
        .build();
    let instance =
        Arc::new(Instance::start_with_sink(&cfg, dir.path(), SharedBuffer::new().sink()).unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let change = tokio::spawn({
        let instance = Arc::clone(&instance);
        async move { instance.notify_change(go).await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    with_timeout(instance.kill()).await;
    assert!(instance.is_stopped());
    assert!(!instance.chain().is_running());

    with_timeout(change).await.unwrap();
    assert!(!instance.chain().is_running());

    instance.notify_change(dir.path().join("main.go")).await;
    assert!(!instance.chain().is_running());
}

#[tokio::test]
async fn missing_watch_root_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = InstanceConfigBuilder::new("broken")
        .include("nope/*.go")
        .cmd(&echo_command("run"))
        .build();

    let err = Instance::start_with_sink(&cfg, dir.path(), SharedBuffer::new().sink()).unwrap_err();
    assert!(matches!(err, WadoError::WatchRoot { .. }));
}

#[tokio::test]
async fn malformed_command_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = InstanceConfigBuilder::new("broken")
        .include("*.go")
        .cmd("echo \"unterminated")
        .build();

    let err = Instance::start_with_sink(&cfg, dir.path(), SharedBuffer::new().sink()).unwrap_err();
    assert!(matches!(err, WadoError::CommandParse(_)));
}
