use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_smartclassd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn smartclassd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(resp: &serde_json::Value) -> &str {
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
}

#[test]
fn health_reports_version_and_no_session() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(resp["ok"], json!(true));
    assert_eq!(resp["result"]["hasSession"], json!(false));
    assert!(resp["result"]["version"].as_str().is_some());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn views_refuse_to_open_without_a_session() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    for (i, method) in ["grades.open", "attendance.open", "participation.open", "predictions.open"]
        .iter()
        .enumerate()
    {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            method,
            json!({ "classId": 1, "periodId": 10 }),
        );
        assert_eq!(error_code(&resp), "no_session", "{} must require a session", method);
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn component_validation_works_without_network() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "v1",
        "grades.validate",
        json!({ "field": "saber", "value": 50.0 }),
    );
    assert_eq!(error_code(&resp), "validation_failed");
    assert_eq!(resp["error"]["details"]["field"], json!("saber"));
    assert_eq!(resp["error"]["details"]["max"], json!(45.0));

    let resp = request(
        &mut stdin,
        &mut reader,
        "v2",
        "grades.validate",
        json!({ "field": "saber", "value": 45.0 }),
    );
    assert_eq!(resp["ok"], json!(true));
    assert_eq!(resp["result"]["valid"], json!(true));

    let resp = request(
        &mut stdin,
        &mut reader,
        "v3",
        "grades.validate",
        json!({ "field": "promedio", "value": 1.0 }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn preview_totals_and_status_match_the_approval_threshold() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "p1",
        "grades.preview",
        json!({ "ser": 5.0, "saber": 45.0, "hacer": 40.0, "decidir": 5.0, "autoevaluacion": 5.0 }),
    );
    assert_eq!(resp["result"]["notaTotal"], json!(100.0));
    assert_eq!(resp["result"]["estado"], json!("approved"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "p2",
        "grades.preview",
        json!({ "ser": 0.0, "saber": 0.0, "hacer": 0.0, "decidir": 0.0, "autoevaluacion": 0.0 }),
    );
    assert_eq!(resp["result"]["notaTotal"], json!(0.0));
    assert_eq!(resp["result"]["estado"], json!("failed"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "p3",
        "grades.preview",
        json!({ "ser": 1.0, "saber": 30.0, "hacer": 15.0, "decidir": 2.0, "autoevaluacion": 3.0 }),
    );
    assert_eq!(resp["result"]["notaTotal"], json!(51.0));
    assert_eq!(resp["result"]["estado"], json!("approved"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn session_install_and_role_gating() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "t1",
        "session.set",
        json!({
            "baseUrl": "http://127.0.0.1:9",
            "token": "test-token",
            "profile": { "id": 5, "username": "amaru", "user_type": "student" }
        }),
    );
    assert_eq!(resp["ok"], json!(true));
    assert_eq!(resp["result"]["role"], json!("student"));

    let resp = request(&mut stdin, &mut reader, "t2", "health", json!({}));
    assert_eq!(resp["result"]["hasSession"], json!(true));
    assert_eq!(resp["result"]["username"], json!("amaru"));

    // Students never get as far as the network on write paths.
    let resp = request(
        &mut stdin,
        &mut reader,
        "t3",
        "grades.bulkSave",
        json!({ "classId": 1, "periodId": 10, "grades": [] }),
    );
    assert_eq!(error_code(&resp), "permission_denied");

    let resp = request(
        &mut stdin,
        &mut reader,
        "t4",
        "predictions.retrain",
        json!({ "classId": 1 }),
    );
    assert_eq!(error_code(&resp), "permission_denied");

    let resp = request(&mut stdin, &mut reader, "t5", "session.clear", json!({}));
    assert_eq!(resp["ok"], json!(true));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn cache_invalidate_and_unknown_methods() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "c1",
        "cache.invalidate",
        json!({ "classId": 3 }),
    );
    assert_eq!(resp["ok"], json!(true));

    let resp = request(&mut stdin, &mut reader, "c2", "grades.export", json!({}));
    assert_eq!(error_code(&resp), "not_implemented");

    drop(stdin);
    let _ = child.wait();
}
