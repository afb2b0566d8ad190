//! Live stream specs
//!
//! Verify the pushed frames, the terminal marker, and that the run is
//! recorded in the durable ledger before the stream closes.

use std::time::Duration;

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn hello_streams_lines_then_the_completion_marker() {
    let mut dash = Dashboard::empty();
    dash.script("hello", "echo hello\necho world");
    dash.start().await;

    let reply = dash.get("/stream/hello").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("text/event-stream"));
    assert_eq!(reply.header("cache-control"), Some("no-cache"));
    assert_eq!(reply.header("x-accel-buffering"), Some("no"));
    assert_eq!(
        reply.body,
        "data: hello\n\ndata: world\n\ndata: [FIM_DA_EXECUCAO] Status: success\n\n"
    );

    let record = dash.ledger().latest(&ScriptId::new("hello")).unwrap();
    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.stdout_tail, "hello\nworld\n");
    assert_eq!(record.exit_code, Some(0));
}

#[tokio::test]
async fn stderr_lines_carry_the_marker() {
    let mut dash = Dashboard::empty();
    dash.script("warn", "echo careful >&2\nexit 2");
    dash.start().await;

    let events = dash.get("/stream/warn").await.events();
    assert_eq!(
        events,
        vec!["[STDERR] careful".to_string(), "[FIM_DA_EXECUCAO] Status: error".to_string()]
    );
    let record = dash.ledger().latest(&ScriptId::new("warn")).unwrap();
    assert_eq!(record.stderr_tail, "careful\n");
}

#[tokio::test]
async fn ansi_sequences_never_reach_the_client() {
    let mut dash = Dashboard::empty();
    dash.script("color", r"printf '\033[1;32mgreen\033[0m\n'");
    dash.start().await;

    let events = dash.get("/stream/color").await.events();
    assert_eq!(events[0], "green");
    assert!(!dash.ledger().latest(&ScriptId::new("color")).unwrap().stdout_tail.contains('\u{1b}'));
}

#[tokio::test]
async fn timeout_kills_the_script_and_reports_the_budget() {
    let mut dash = Dashboard::empty();
    let marker = dash.state.path().join("survived");
    dash.script("hang", &format!("echo begin\nsleep 5\ntouch {}", marker.display()));
    dash.start_with(spec_runner().stream_timeout(Duration::from_secs(1)), None).await;

    let events = dash.get("/stream/hang").await.events();
    assert_eq!(
        events,
        vec!["begin".to_string(), "[TIMEOUT] Execution exceeded 1s".to_string()]
    );
    let record = dash.ledger().latest(&ScriptId::new("hang")).unwrap();
    assert_eq!(record.status, RunStatus::Timeout);
    assert_eq!(record.stdout_tail, "begin\n");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!marker.exists(), "script outlived its timeout");
}

#[tokio::test]
async fn unknown_script_is_404_and_spawns_nothing() {
    let mut dash = Dashboard::empty();
    dash.start().await;

    let reply = dash.get("/stream/nope").await;
    assert_eq!(reply.status, 404);
    assert!(reply.json()["error"].as_str().unwrap().contains("nope"));
    assert!(dash.ledger().all().is_empty());
}

#[tokio::test]
async fn client_disconnect_cancels_the_run() {
    let mut dash = Dashboard::empty();
    let marker = dash.state.path().join("finished");
    // Keeps writing so the server notices the hang-up on its next frame.
    dash.script(
        "long",
        &format!("i=0\nwhile [ $i -lt 15 ]; do echo tick; sleep 0.2; i=$((i+1)); done\ntouch {}", marker.display()),
    );
    dash.start().await;

    // Give up on the response early, dropping the connection.
    let reply = tokio::time::timeout(Duration::from_millis(500), dash.get("/stream/long")).await;
    assert!(reply.is_err());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!marker.exists());
    let record = dash.ledger().latest(&ScriptId::new("long")).unwrap();
    assert_eq!(record.status, RunStatus::Exception);
}
