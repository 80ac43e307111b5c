//! HTTP API
//!
//! `POST /api/chat` runs one conversational turn and returns the reply with
//! its render instruction. Saved schematics live under `/api/schematics` and
//! `/api/folders`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use lisa_core::schematics::{
    Folder, Schematic, SchematicError, SchematicSource, SchematicStore, SchematicTree,
};
use lisa_core::{
    AssistantService, ImageAttachment, LisaConfig, RenderDispatcher, RenderInstruction,
    ReplyPayload, SessionError, SessionOrchestrator, ThreadRegistry,
};

/// Body text for failures whose details stay in the server log
const GENERIC_ERROR: &str = "Error processing request";

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<SessionOrchestrator>,
    dispatcher: Arc<RenderDispatcher>,
    schematics: Arc<SchematicStore>,
    /// Parent of every chat request's token
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: Arc<dyn AssistantService>, config: &LisaConfig) -> Self {
        let orchestrator = SessionOrchestrator::new(service, Arc::new(ThreadRegistry::new()))
            .with_poll_config(config.poll_config());
        Self {
            orchestrator: Arc::new(orchestrator),
            dispatcher: Arc::new(RenderDispatcher::new(config.render.clone())),
            schematics: Arc::new(SchematicStore::new()),
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/render", post(render))
        .route("/api/schematics", get(list_schematics).post(save_schematic))
        .route("/api/schematics/:id", delete(delete_schematic))
        .route("/api/folders", post(create_folder))
        .route("/api/folders/:id", delete(delete_folder))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C; in-flight turns stop waiting on shutdown
pub async fn serve(service: Arc<dyn AssistantService>, config: &LisaConfig) -> Result<()> {
    let state = AppState::new(service, config);
    let shutdown = state.shutdown.clone();
    let registry = Arc::clone(state.orchestrator.registry());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!("Server running on http://{local}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {e}");
                return;
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    if !registry.is_empty() {
        tracing::info!(threads = registry.len(), "Released conversation threads");
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    message: String,
    thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_train_part: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    train_part: Option<ImageAttachment>,
    render: RenderInstruction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    train_part: Option<ImageAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveSchematicRequest {
    name: String,
    #[serde(default)]
    folder_id: Option<String>,
    schematic: SchematicSource,
}

#[derive(Debug, Deserialize)]
struct CreateFolderRequest {
    name: String,
}

/// Error response: a status plus `{ "error": message }`
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_job_outcome() {
            tracing::warn!("Chat turn failed: {err}");
        } else {
            tracing::error!("Chat turn failed: {err}");
        }

        match &err {
            SessionError::JobFailed { reason, .. } => {
                Self::new(StatusCode::BAD_GATEWAY, reason.clone())
            }
            SessionError::Remote { message, .. } => {
                Self::new(StatusCode::BAD_GATEWAY, message.clone())
            }
            SessionError::RemoteUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, GENERIC_ERROR)
            }
            SessionError::Timeout { .. } => Self::new(StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            SessionError::Cancelled { .. }
            | SessionError::MissingReply { .. }
            | SessionError::Protocol(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
            }
        }
    }
}

impl From<SchematicError> for ApiError {
    fn from(err: SchematicError) -> Self {
        let status = match err {
            SchematicError::EmptyName => StatusCode::BAD_REQUEST,
            SchematicError::FolderNotFound(_) | SchematicError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
        };
        Self::new(status, err.to_string())
    }
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Message must not be empty",
        ));
    }

    let reply = state
        .orchestrator
        .submit_with_cancel(
            request.thread_id.as_deref(),
            &request.message,
            state.shutdown.child_token(),
        )
        .await?;

    let render = state.dispatcher.classify(&reply.payload);
    let train_part = reply
        .payload
        .attachment
        .filter(|a| !a.image_url.trim().is_empty());

    Ok(Json(ChatResponse {
        message: reply.payload.text,
        thread_id: reply.thread_id,
        is_train_part: train_part.is_some().then_some(true),
        train_part,
        render,
    }))
}

async fn render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Json<RenderInstruction> {
    let payload = ReplyPayload {
        text: request.message,
        attachment: request.train_part,
    };
    Json(state.dispatcher.classify(&payload))
}

async fn list_schematics(State(state): State<AppState>) -> Json<SchematicTree> {
    Json(state.schematics.list())
}

async fn save_schematic(
    State(state): State<AppState>,
    Json(request): Json<SaveSchematicRequest>,
) -> Result<(StatusCode, Json<Schematic>), ApiError> {
    let saved = state.schematics.save(
        &request.name,
        request.folder_id.as_deref(),
        request.schematic,
    )?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn delete_schematic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.schematics.delete_schematic(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_folder(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let folder = state.schematics.create_folder(&request.name)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ungrouped = state.schematics.delete_folder(&id)?;
    Ok(Json(json!({ "ungrouped": ungrouped })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lisa_core::assistant::{InMemoryAssistant, JobStatus, ScriptedTurn};
    use serde_json::Value;

    async fn spawn(service: InMemoryAssistant) -> String {
        let mut config = LisaConfig::default();
        config.polling.interval_ms = 5;
        config.polling.max_wait_secs = 5;
        let app = router(AppState::new(Arc::new(service), &config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_chat_round_trip_reuses_thread() {
        let base = spawn(InMemoryAssistant::echo()).await;
        let client = reqwest::Client::new();

        let first: Value = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "hello", "threadId": null }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first["message"], "You said: hello");
        assert_eq!(first["render"]["kind"], "plain_render");
        assert!(first.get("isTrainPart").is_none());
        let thread_id = first["threadId"].as_str().unwrap().to_string();

        let second: Value = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "again", "threadId": thread_id }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["threadId"], thread_id.as_str());
        assert_eq!(second["message"], "You said: again");
    }

    #[tokio::test]
    async fn test_chat_attachment_sets_train_part() {
        let service = InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Running, JobStatus::Completed],
            ReplyPayload::text("").with_attachment(ImageAttachment::new(
                "Brake Assembly",
                "https://cdn.example/brake.png",
            )),
        )]);
        let base = spawn(service).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "brakes" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["isTrainPart"], true);
        assert_eq!(body["trainPart"]["displayName"], "Brake Assembly");
        assert_eq!(body["render"]["kind"], "attached_image");
        assert_eq!(body["render"]["caption"], "Here's the Brake Assembly");
    }

    #[tokio::test]
    async fn test_chat_errors_map_to_status() {
        let service = InMemoryAssistant::scripted(vec![ScriptedTurn::failing(
            vec![JobStatus::Failed],
            "Assistant run failed",
        )]);
        let base = spawn(service).await;
        let client = reqwest::Client::new();

        let empty = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

        let failed = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(failed.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: Value = failed.json().await.unwrap();
        assert_eq!(body["error"], "Assistant run failed");
    }

    #[tokio::test]
    async fn test_render_endpoint() {
        let base = spawn(InMemoryAssistant::echo()).await;
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/api/render"))
            .json(&json!({ "message": "| A | B |\n|---|---|\n| 1 | 2 |" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["kind"], "table_render");
        assert_eq!(body["blocks"][0]["rows"][0][1], "2");
    }

    #[tokio::test]
    async fn test_schematic_endpoints() {
        let base = spawn(InMemoryAssistant::echo()).await;
        let client = reqwest::Client::new();

        let folder: Value = client
            .post(format!("{base}/api/folders"))
            .json(&json!({ "name": "Brakes" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let folder_id = folder["id"].as_str().unwrap().to_string();

        let saved = client
            .post(format!("{base}/api/schematics"))
            .json(&json!({
                "name": "Front brake",
                "folderId": folder_id,
                "schematic": { "imageUrl": "/brake.png", "displayName": "Brake Assembly" }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(saved.status(), reqwest::StatusCode::CREATED);

        let tree: Value = client
            .get(format!("{base}/api/schematics"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(tree["folders"][0]["schematics"][0]["name"], "Front brake");

        let removed: Value = client
            .delete(format!("{base}/api/folders/{folder_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(removed["ungrouped"], 1);

        let missing = client
            .delete(format!("{base}/api/schematics/nope"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
