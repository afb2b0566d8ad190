//! Daemon lifecycle specs
//!
//! Verify that the run ledger survives restarts, that records of removed
//! scripts are pruned, and that one state directory serves one daemon.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn records_survive_a_restart() {
    let mut dash = Dashboard::empty();
    dash.script("deploy", "echo shipped");
    dash.start().await;
    dash.get("/stream/deploy").await;
    dash.stop();

    assert!(read(&dash.ledger_file()).contains("shipped"));
    assert!(!dash.state.path().join("daemon.pid").exists());

    dash.start().await;
    let view = dash.get("/scripts/deploy").await.json();
    assert_eq!(view["status"], "success");
    assert_eq!(view["last_run"]["stdout_tail"], "shipped\n");
}

#[tokio::test]
async fn removed_scripts_lose_their_records() {
    let mut dash = Dashboard::empty();
    dash.script("old", "true");
    dash.script("kept", "true");
    dash.start().await;
    dash.get("/stream/old").await;
    dash.get("/stream/kept").await;
    dash.stop();

    dash.remove_script("old");
    dash.start().await;
    let ids: Vec<String> = dash.ledger().all().into_iter().map(|r| r.script_id.to_string()).collect();
    assert_eq!(ids, vec!["kept".to_string()]);
}

#[tokio::test]
async fn second_daemon_on_the_same_state_dir_is_refused() {
    let mut dash = Dashboard::empty();
    dash.start().await;

    let err = lifecycle::startup(&dash.config(spec_runner(), None)).await.err().unwrap();
    assert!(matches!(err, lifecycle::LifecycleError::LockFailed(_)), "{err}");
    // The running daemon keeps its PID file.
    assert_eq!(
        read(&dash.state.path().join("daemon.pid")).trim(),
        std::process::id().to_string()
    );
}

#[tokio::test]
async fn corrupt_ledger_is_set_aside() {
    let mut dash = Dashboard::empty();
    std::fs::write(dash.ledger_file(), "{ not json").unwrap();
    dash.start().await;

    assert!(dash.ledger().all().is_empty());
    assert!(dash.state.path().join("runs.bak").exists());
}
