//! Dashboard view specs: script listing, summary, secrets, health, auth.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn health_is_always_ok() {
    let mut dash = Dashboard::empty();
    dash.start_with(spec_runner(), Some("token")).await;

    let reply = dash.get("/health").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, r#"{"status":"OK"}"#);
}

#[tokio::test]
async fn token_guards_everything_but_health() {
    let mut dash = Dashboard::empty();
    dash.script("hello", "echo hello");
    dash.start_with(spec_runner(), Some("token")).await;

    for path in ["/scripts", "/summary", "/secrets", "/stream/hello"] {
        let reply = dash.get(path).await;
        assert_eq!(reply.status, 401, "{path}");
    }
    assert!(dash.ledger().all().is_empty());

    let reply = dash.send("GET", "/stream/hello", &[("Authorization", "Bearer token")], "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.events().last().unwrap(), "[FIM_DA_EXECUCAO] Status: success");
}

#[tokio::test]
async fn scripts_are_listed_by_display_name() {
    let mut dash = Dashboard::empty();
    dash.script("web_frontend", "true");
    dash.script("api_server", "true");
    std::fs::write(dash.deploy.path().join("README.md"), "not a script").unwrap();
    dash.start().await;
    dash.get("/stream/web_frontend").await;

    let list = dash.get("/scripts").await.json();
    let rows: Vec<(String, String)> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["name"].as_str().unwrap().to_string(), s["status"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Api Server".to_string(), "unset".to_string()),
            ("Web Frontend".to_string(), "success".to_string()),
        ]
    );
}

#[tokio::test]
async fn summary_reflects_latest_runs() {
    let mut dash = Dashboard::empty();
    dash.script("a", "true");
    dash.script("b", "exit 1");
    dash.start().await;

    let empty = dash.get("/summary").await.json();
    assert_eq!(empty, serde_json::json!({ "total_scripts": 2, "success_count": 0, "error_count": 0 }));

    dash.get("/stream/a").await;
    dash.get("/stream/b").await;
    let summary = dash.get("/summary").await.json();
    assert_eq!(summary["success_count"], 1);
    assert_eq!(summary["error_count"], 1);
    assert_eq!(summary["last_run"]["script_id"], "b");
    assert_eq!(summary["last_run"]["status"], "error");
    assert!(summary["last_run"]["finished_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn secrets_can_be_edited_but_not_created() {
    let mut dash = Dashboard::empty();
    dash.secret("db.env", "PASSWORD=old\n");
    dash.secret(".hidden.env", "x");
    dash.start().await;

    let list = dash.get("/secrets").await.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "db.env");
    assert_eq!(list[0]["size"], 13);

    assert_eq!(dash.send("PUT", "/secrets/db.env", &[], "PASSWORD=new\n").await.status, 204);
    assert_eq!(read(&dash.secrets.path().join("db.env")), "PASSWORD=new\n");
    assert_eq!(dash.get("/secrets/db.env").await.json()["content"], "PASSWORD=new\n");

    assert_eq!(dash.send("PUT", "/secrets/fresh.env", &[], "A=1").await.status, 404);
    assert!(!dash.secrets.path().join("fresh.env").exists());
    assert_eq!(dash.get("/secrets/deploy.sh").await.status, 400);
}
