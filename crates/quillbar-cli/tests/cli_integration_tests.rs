//! CLI integration tests for quillbar
//!
//! Tests the quillbar CLI commands end-to-end using assert_cmd. Every test
//! runs against its own configuration directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_cmd::Command;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Helper to create a command isolated from the user's configuration
#[allow(deprecated)]
fn quillbar_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quillbar").unwrap();
    cmd.current_dir(config_dir.path());
    cmd.env("QUILLBAR_CONFIG_DIR", config_dir.path());
    cmd.env_remove("REPLICATE_API_TOKEN");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_PROXY", "127.0.0.1");
    cmd.write_stdin("");
    cmd
}

/// Local stand-in for the completion and prediction services
struct MockService {
    base: String,
    reply: String,
    polls: AtomicUsize,
}

/// Serve the mock on a background thread and return its base URL
fn spawn_mock(reply: &str) -> String {
    let reply = reply.to_string();
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let mock = Arc::new(MockService {
                base: base.clone(),
                reply,
                polls: AtomicUsize::new(0),
            });

            let app = Router::new()
                .route("/v1/chat/completions", post(chat_completion))
                .route("/v1/models/{owner}/{name}/predictions", post(create_prediction))
                .route("/v1/predictions/{id}", get(poll_prediction))
                .route("/files/out.png", get(image_file))
                .with_state(mock);

            tx.send(base).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    rx.recv().unwrap()
}

async fn chat_completion(State(mock): State<Arc<MockService>>, Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": mock.reply }, "finish_reason": "stop" }
        ]
    }))
}

async fn create_prediction(State(mock): State<Arc<MockService>>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "p1",
            "status": "starting",
            "urls": { "get": format!("{}/v1/predictions/p1", mock.base) }
        })),
    )
}

async fn poll_prediction(State(mock): State<Arc<MockService>>) -> Json<Value> {
    if mock.polls.fetch_add(1, Ordering::SeqCst) == 0 {
        return Json(json!({
            "id": "p1",
            "status": "processing",
            "urls": { "get": format!("{}/v1/predictions/p1", mock.base) }
        }));
    }
    Json(json!({
        "id": "p1",
        "status": "succeeded",
        "output": [format!("{}/files/out.png", mock.base)]
    }))
}

async fn image_file() -> impl IntoResponse {
    ([("content-type", "image/png")], b"\x89PNG fake".to_vec())
}

/// Point the completion client at `base` and store a key
fn configure_llm(dir: &TempDir, base: &str) {
    quillbar_cmd(dir)
        .args(["config", "set", "llm.base_url", &format!("{}/v1", base)])
        .assert()
        .success();
    quillbar_cmd(dir)
        .args(["key", "set", "sk-test"])
        .assert()
        .success();
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transform"))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("menu"));
}

#[test]
fn test_config_path_uses_override_dir() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.path().to_string_lossy().as_ref()))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["config", "set", "llm.model", "gpt-4o"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set llm.model = gpt-4o"));

    quillbar_cmd(&dir)
        .args(["config", "get", "llm.model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("gpt-4o\n"));

    quillbar_cmd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image.default_aspect_ratio = 16:9"));
}

#[test]
fn test_config_rejects_bad_aspect_ratio() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["config", "set", "image.default_aspect_ratio", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid aspect ratio"));
}

#[test]
fn test_key_set_show_clear() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["key", "set", "sk-test-abcd1234"])
        .assert()
        .success();

    let stored = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(stored.contains("\"api_key\":\"sk-test-abcd1234\""));

    quillbar_cmd(&dir)
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1234"))
        .stdout(predicate::str::contains("sk-test").not());

    quillbar_cmd(&dir).args(["key", "clear"]).assert().success();

    quillbar_cmd(&dir)
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No API key configured."));
}

#[test]
fn test_transform_rejects_unknown_operation() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["transform", "translate", "--text", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown operation 'translate'"));
}

#[test]
fn test_transform_without_key_fails_before_network() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["config", "set", "llm.base_url", "http://127.0.0.1:9/v1"])
        .assert()
        .success();

    quillbar_cmd(&dir)
        .args(["transform", "summary", "--text", "A B C D E."])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No API key provided. AI processing will not work.",
        ))
        .stderr(predicate::str::contains("No API key configured").not())
        .stderr(predicate::str::contains("[E100] API Key Missing"))
        .stderr(predicate::str::contains("quillbar key set"));
}

#[test]
fn test_transform_text_prints_result() {
    let dir = TempDir::new().unwrap();
    let base = spawn_mock("A B C.");
    configure_llm(&dir, &base);

    quillbar_cmd(&dir)
        .args(["transform", "summary", "--text", "A B C D E."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Option: Summary\n\nA B C."))
        .stderr(predicate::str::contains("Warning").not());

    quillbar_cmd(&dir)
        .args(["-q", "transform", "summary", "--text", "A B C D E."])
        .assert()
        .success()
        .stdout(predicate::str::diff("A B C.\n"));
}

#[test]
fn test_transform_warns_on_language_mismatch() {
    let dir = TempDir::new().unwrap();
    let base = spawn_mock("Olá");
    configure_llm(&dir, &base);

    quillbar_cmd(&dir)
        .args(["transform", "rewrite", "--text", "Hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Option: Rewrite\n\nOlá"))
        .stderr(predicate::str::contains(
            "Warning: The API response is in a different language. Input: English",
        ));
}

#[test]
fn test_transform_blank_text_is_missing_input() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["key", "set", "sk-test"])
        .assert()
        .success();

    quillbar_cmd(&dir)
        .args(["transform", "proofread", "--text", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Text Selected"));
}

#[test]
fn test_image_models() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["-q", "image", "models"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "black-forest-labs/flux-dev\nblack-forest-labs/flux-pro\n",
        ));
}

#[test]
fn test_image_generate_requires_token() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .args(["image", "generate", "a lighthouse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Replicate API token"))
        .stderr(predicate::str::contains("REPLICATE_API_TOKEN"));
}

#[test]
fn test_image_generate_downloads_output() {
    let dir = TempDir::new().unwrap();
    let base = spawn_mock("ok");
    quillbar_cmd(&dir)
        .args(["config", "set", "image.base_url", &format!("{}/v1", base)])
        .assert()
        .success();
    quillbar_cmd(&dir)
        .args(["config", "set", "image.poll_interval_ms", "10"])
        .assert()
        .success();

    let target = dir.path().join("fox.png");
    quillbar_cmd(&dir)
        .env("REPLICATE_API_TOKEN", "r8_test")
        .args(["image", "generate", "a red fox", "--output"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 1 images. Displaying the first one."))
        .stdout(predicate::str::contains(format!("{}/files/out.png", base)))
        .stdout(predicate::str::contains("Image downloaded successfully"));

    assert_eq!(std::fs::read(&target).unwrap(), b"\x89PNG fake");
}

#[test]
fn test_doctor_reports_missing_key() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[OK] Configuration: Valid"))
        .stdout(predicate::str::contains("[!!] API Key: Not configured"));
}

#[test]
fn test_menu_help_and_exit() {
    let dir = TempDir::new().unwrap();
    quillbar_cmd(&dir)
        .write_stdin("help\nlast-prompt\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("key-points"))
        .stdout(predicate::str::contains("Extract Key Points"))
        .stderr(predicate::str::contains("No previous prompt available."));
}
