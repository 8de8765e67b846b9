use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use rankup::config::{CoachConfig, ModelChoice};
use rankup::constants::{FALLBACK_REPLY, GREETING};
use rankup::llm_interaction::{CompletionBackend, CompletionError, CompletionRequest};
use rankup::session::SessionFactory;
use rankup::transcript::{Role, Turn};
use rankup::web_server::{
    build_router, handle_client_text, resolve_model, send_initial_state, AppState, ServerEvent,
};
use serde_json::Value;

struct Canned(Result<&'static str, ()>);

/// Replies with the model id it was asked to use and records every request.
#[derive(Default)]
struct ModelEcho {
    seen: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionBackend for ModelEcho {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(format!("answered by {}", request.model))
    }
}

#[async_trait]
impl CompletionBackend for Canned {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        match self.0 {
            Ok(text) => Ok(text.to_string()),
            Err(()) => Err(CompletionError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "loading model".to_string(),
            }),
        }
    }
}

fn factory(reply: Result<&'static str, ()>) -> SessionFactory {
    SessionFactory::new(Arc::new(Canned(reply)), &CoachConfig::default())
}

fn asset_dir(name: &str) -> String {
    format!("{}/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn test_server() -> TestServer {
    let state = AppState::new(factory(Ok("gg")), &asset_dir("templates"), &asset_dir("static"));
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn test_index_renders_page_with_models_and_greeting() {
    let server = test_server();
    let response = server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("Valorant Rank-Up Coach"));
    assert!(html.contains(r#"<option value="deepseek-r1:1.5b" selected>"#));
    assert!(html.contains(r#"<option value="deepseek-r1:3b">"#));
    assert!(html.contains("Aim &amp; Crosshair Training"));
    // The apostrophe in "I'm" comes out HTML-escaped.
    assert!(html.contains("Valorant Coach! 🎮 How can I help you rank up?"));
}

#[tokio::test]
async fn test_models_endpoint() {
    let server = test_server();
    let response = server.get("/api/models").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["default"], "deepseek-r1:1.5b");
    assert_eq!(body["models"], serde_json::json!(["deepseek-r1:1.5b", "deepseek-r1:3b"]));
}

#[tokio::test]
async fn test_static_assets_and_missing_files() {
    let server = test_server();
    server.get("/static/app.js").await.assert_status_ok();
    let missing = server.get("/static/nope.css").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(missing.text(), "Not Found");
}

#[tokio::test]
async fn test_custom_templates_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "{{ title }}|{% for t in turns %}{{ t.role }}{% endfor %}",
    )
    .unwrap();
    let state = AppState::new(
        factory(Ok("gg")),
        dir.path().to_str().unwrap(),
        &asset_dir("static"),
    );
    let server = TestServer::new(build_router(state)).unwrap();

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "🔥 Valorant Rank-Up Coach|assistant");
}

#[tokio::test]
async fn test_submit_event_sequence() {
    let sessions = factory(Ok("Work on your crosshair placement daily."));
    let mut session = sessions.open(None);
    let mut events: Vec<ServerEvent> = Vec::new();

    handle_client_text(
        &sessions,
        &mut session,
        r#"{"type":"submit","text":"how do I aim better?"}"#,
        &mut events,
    )
    .await
    .unwrap();

    let greeting = Turn::new(Role::Assistant, GREETING);
    let question = Turn::new(Role::User, "how do I aim better?");
    let answer = Turn::new(Role::Assistant, "Work on your crosshair placement daily.");
    assert_eq!(
        events,
        vec![
            ServerEvent::Transcript {
                turns: vec![greeting.clone(), question.clone()]
            },
            ServerEvent::Thinking { active: true },
            ServerEvent::Thinking { active: false },
            ServerEvent::Transcript {
                turns: vec![greeting, question, answer]
            },
        ]
    );
}

#[tokio::test]
async fn test_submit_with_backend_down_sends_fallback() {
    let sessions = factory(Err(()));
    let mut session = sessions.open(Some(ModelChoice::DeepSeekR1Medium));
    let mut events: Vec<ServerEvent> = Vec::new();

    handle_client_text(&sessions, &mut session, r#"{"type":"submit","text":"eco?"}"#, &mut events)
        .await
        .unwrap();

    match events.last() {
        Some(ServerEvent::Transcript { turns }) => {
            assert_eq!(turns.len(), 3);
            assert_eq!(turns[2], Turn::new(Role::Assistant, FALLBACK_REPLY));
        }
        other => panic!("expected transcript, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_and_malformed_events_leave_transcript_alone() {
    let sessions = factory(Ok("unused"));
    let mut session = sessions.open(None);
    let mut events: Vec<ServerEvent> = Vec::new();

    handle_client_text(&sessions, &mut session, r#"{"type":"submit","text":"   "}"#, &mut events)
        .await
        .unwrap();
    handle_client_text(&sessions, &mut session, "not json", &mut events).await.unwrap();
    handle_client_text(&sessions, &mut session, r#"{"type":"reset"}"#, &mut events)
        .await
        .unwrap();
    handle_client_text(
        &sessions,
        &mut session,
        r#"{"type":"select_model","model":"llama3:8b"}"#,
        &mut events,
    )
    .await
    .unwrap();

    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| matches!(e, ServerEvent::Error { .. })));
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.model(), ModelChoice::DeepSeekR1Small);
}

#[tokio::test]
async fn test_unknown_query_model_opens_default_session_with_greeting() {
    let sessions = factory(Ok("gg"));
    let session = sessions.open(resolve_model(Some("bogus")));
    let mut events: Vec<ServerEvent> = Vec::new();

    send_initial_state(&session, &mut events).await.unwrap();

    assert_eq!(
        events,
        vec![
            ServerEvent::Model {
                model: "deepseek-r1:1.5b"
            },
            ServerEvent::Transcript {
                turns: vec![Turn::new(Role::Assistant, GREETING)]
            },
        ]
    );
}

#[tokio::test]
async fn test_model_switch_keeps_history_and_routes_next_request() {
    let backend = Arc::new(ModelEcho::default());
    let sessions = SessionFactory::new(backend.clone(), &CoachConfig::default());
    let mut session = sessions.open(None);
    let mut events: Vec<ServerEvent> = Vec::new();

    handle_client_text(&sessions, &mut session, r#"{"type":"submit","text":"first"}"#, &mut events)
        .await
        .unwrap();
    let before_switch = session.transcript().to_vec();
    events.clear();

    handle_client_text(
        &sessions,
        &mut session,
        r#"{"type":"select_model","model":"deepseek-r1:3b"}"#,
        &mut events,
    )
    .await
    .unwrap();
    assert_eq!(
        events,
        vec![
            ServerEvent::Model {
                model: "deepseek-r1:3b"
            },
            ServerEvent::Transcript {
                turns: before_switch.clone()
            },
        ]
    );

    handle_client_text(&sessions, &mut session, r#"{"type":"submit","text":"second"}"#, &mut events)
        .await
        .unwrap();

    let turns = session.transcript();
    assert_eq!(turns.len(), 5);
    assert_eq!(&turns[..3], before_switch.as_slice());
    assert_eq!(turns[2].content(), "answered by deepseek-r1:1.5b");
    assert_eq!(turns[4].content(), "answered by deepseek-r1:3b");

    let seen = backend.seen.lock().unwrap();
    let models: Vec<&str> = seen.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(models, vec!["deepseek-r1:1.5b", "deepseek-r1:3b"]);
    // The second request replays the whole history, including the earlier model's reply.
    assert_eq!(seen[1].messages.len(), 5);
}
