use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{Html, IntoResponse},
    routing::get,
    serve, Json, Router,
};
use futures::{future, sink::SinkExt, stream::StreamExt, Sink};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::ModelChoice;
use crate::constants;
use crate::session::{ChatSession, SessionFactory};
use crate::transcript::{Transcript, Turn};

/// Events the page sends over the WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Submit { text: String },
    /// Use another model for the replies that follow. History is kept.
    SelectModel { model: String },
}

/// Events pushed to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Transcript { turns: Vec<Turn> },
    Thinking { active: bool },
    Model { model: &'static str },
    Error { message: String },
}

impl ServerEvent {
    fn transcript(session: &ChatSession) -> Self {
        ServerEvent::Transcript {
            turns: session.transcript().to_vec(),
        }
    }
}

// Shared application state. Sessions are not stored here: each WebSocket owns one.
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: Arc<SessionFactory>,
    static_dir: String,
}

impl AppState {
    pub fn new(sessions: SessionFactory, templates_dir: &str, static_dir: &str) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir)),
            sessions: Arc::new(sessions),
            static_dir: static_dir.to_string(),
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: &str) -> AutoReloader {
    let templates_dir = templates_dir.to_string();
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, Html<String>> {
    let models: Vec<&str> = ModelChoice::ALL.iter().map(|m| m.id()).collect();
    let seed = Transcript::new();

    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => constants::APP_TITLE,
                    caption => constants::APP_CAPTION,
                    models => models,
                    selected_model => state.sessions.default_model().id(),
                    features => constants::COACHING_FEATURES,
                    placeholder => constants::INPUT_PLACEHOLDER,
                    turns => seed.all(),
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            Html(format!("Internal Server Error: {}", e))
        })
}

#[derive(Serialize)]
struct ModelList {
    default: &'static str,
    models: Vec<&'static str>,
}

async fn models_handler(State(state): State<AppState>) -> Json<ModelList> {
    Json(ModelList {
        default: state.sessions.default_model().id(),
        models: ModelChoice::ALL.iter().map(|m| m.id()).collect(),
    })
}

#[derive(Debug, Deserialize)]
struct WsParams {
    model: Option<String>,
}

/// Model requested in the `/ws` query. Missing or unknown values yield `None`,
/// which opens the session on the configured default.
pub fn resolve_model(raw: Option<&str>) -> Option<ModelChoice> {
    raw.and_then(|raw| match raw.parse::<ModelChoice>() {
        Ok(model) => Some(model),
        Err(e) => {
            warn!("{}; using the default model", e);
            None
        }
    })
}

// WebSocket upgrade handler. The query only picks the starting model.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let model = resolve_model(params.model.as_deref());
    info!(?model, "WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state, model))
}

// Handle individual WebSocket connections
async fn handle_socket(socket: WebSocket, state: AppState, model: Option<ModelChoice>) {
    let mut session = state.sessions.open(model);
    let session_id = session.id();
    info!(session = %session_id, "New WebSocket connection established");

    let (sender, mut receiver) = socket.split();
    let mut events = sender.with(|event: ServerEvent| {
        future::ready(
            serde_json::to_string(&event)
                .map(Message::Text)
                .map_err(axum::Error::new),
        )
    });

    if let Err(e) = send_initial_state(&session, &mut events).await {
        warn!("Failed to send initial state to new WebSocket client: {}", e);
        return;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handle_client_text(&state.sessions, &mut session, &text, &mut events).await {
                    warn!("WebSocket client disconnected or send error: {}", e);
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!("Received unexpected binary message from client");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Client requested WebSocket close");
                break;
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }
    info!(session = %session_id, "WebSocket connection closed");
}

/// First events on a fresh connection: the active model, then the transcript.
pub async fn send_initial_state<S>(session: &ChatSession, events: &mut S) -> Result<(), S::Error>
where
    S: Sink<ServerEvent> + Unpin,
{
    events
        .send(ServerEvent::Model {
            model: session.model().id(),
        })
        .await?;
    events.send(ServerEvent::transcript(session)).await
}

/// Apply one raw client message to `session`, pushing every resulting event
/// to `events`. The transcript is re-sent after each change.
pub async fn handle_client_text<S>(
    sessions: &SessionFactory,
    session: &mut ChatSession,
    text: &str,
    events: &mut S,
) -> Result<(), S::Error>
where
    S: Sink<ServerEvent> + Unpin,
{
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring malformed client event: {}", e);
            return events
                .send(ServerEvent::Error {
                    message: format!("malformed event: {}", e),
                })
                .await;
        }
    };

    match event {
        ClientEvent::Submit { text } => {
            if let Err(e) = session.push_user(&text) {
                return events.send(ServerEvent::Error { message: e.to_string() }).await;
            }
            events.send(ServerEvent::transcript(session)).await?;
            events.send(ServerEvent::Thinking { active: true }).await?;
            session.respond().await;
            events.send(ServerEvent::Thinking { active: false }).await?;
            events.send(ServerEvent::transcript(session)).await
        }
        ClientEvent::SelectModel { model } => match model.parse::<ModelChoice>() {
            Ok(model) => {
                session.set_generator(sessions.generator_for(model));
                events.send(ServerEvent::Model { model: model.id() }).await?;
                events.send(ServerEvent::transcript(session)).await
            }
            Err(e) => events.send(ServerEvent::Error { message: e.to_string() }).await,
        },
    }
}

pub fn build_router(state: AppState) -> Router {
    // Serve static files from the configured directory
    let static_files_service =
        ServeDir::new(&state.static_dir).not_found_service(tower::service_fn(
            |_req: axum::extract::Request| async {
                Ok::<_, std::convert::Infallible>(
                    (hyper::StatusCode::NOT_FOUND, "Not Found").into_response(),
                )
            },
        ));

    Router::new()
        .route("/", get(index_handler))
        .route("/api/models", get(models_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(port: u16, state: AppState) -> Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
