//! Blocking run specs
//!
//! `POST /run/{id}` waits for the script and returns the record together
//! with the full captured output.

use std::time::Duration;

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn blocking_run_returns_full_output_and_record() {
    let mut dash = Dashboard::empty();
    dash.script("backup", "echo dumping\necho done\necho 'note' >&2");
    dash.start().await;

    let reply = dash.send("POST", "/run/backup", &[("X-Operator", "ops")], "").await;
    assert_eq!(reply.status, 200);
    let body = reply.json();
    assert_eq!(body["stdout"], "dumping\ndone\n");
    assert_eq!(body["stderr"], "note\n");
    assert_eq!(body["script"]["status"], "success");
    assert_eq!(body["script"]["name"], "Backup");
    assert_eq!(body["script"]["last_run"]["actor"], "ops");

    let record = dash.ledger().latest(&ScriptId::new("backup")).unwrap();
    assert_eq!(record.actor.unwrap().as_str(), "ops");
}

#[tokio::test]
async fn blocking_run_uses_its_own_budget() {
    let mut dash = Dashboard::empty();
    dash.script("slowish", "sleep 2\necho finished");
    let runner = spec_runner()
        .stream_timeout(Duration::from_secs(1))
        .run_timeout(Duration::from_secs(10));
    dash.start_with(runner, None).await;

    let body = dash.post("/run/slowish").await.json();
    assert_eq!(body["script"]["status"], "success");
    assert_eq!(body["stdout"], "finished\n");
}

#[tokio::test]
async fn blocking_run_times_out() {
    let mut dash = Dashboard::empty();
    dash.script("stuck", "echo waiting\nsleep 30");
    dash.start_with(spec_runner().run_timeout(Duration::from_secs(1)), None).await;

    let body = dash.post("/run/stuck").await.json();
    assert_eq!(body["script"]["status"], "timeout");
    assert_eq!(body["stdout"], "waiting\n");
    assert!(body["script"]["last_run"].get("exit_code").is_none());
}

#[tokio::test]
async fn non_executable_script_is_an_exception() {
    let mut dash = Dashboard::empty();
    dash.script("locked", "echo never");
    let path = dash.deploy.path().join("deploy_locked.sh");
    std::fs::set_permissions(&path, std::os::unix::fs::PermissionsExt::from_mode(0o644)).unwrap();
    dash.start().await;

    let events = dash.get("/stream/locked").await.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].starts_with("[ERRO INTERNO]: "), "{events:?}");

    let record = dash.ledger().latest(&ScriptId::new("locked")).unwrap();
    assert_eq!(record.status, RunStatus::Exception);
    assert!(record.stdout_tail.is_empty());
    assert!(!record.stderr_tail.is_empty());
}

#[tokio::test]
async fn rerun_replaces_the_previous_record() {
    let mut dash = Dashboard::empty();
    let flag = dash.state.path().join("flag");
    dash.script("flip", &format!("if [ -e {0} ]; then exit 0; fi\ntouch {0}\nexit 1", flag.display()));
    dash.start().await;

    assert_eq!(dash.post("/run/flip").await.json()["script"]["status"], "error");
    assert_eq!(dash.post("/run/flip").await.json()["script"]["status"], "success");
    assert_eq!(dash.ledger().all().len(), 1);
}
