//! Prefab Bridge Server
//!
//! HTTP server that relays commands to the editor plugin and creates prefab
//! assets from live scene nodes.

pub mod bridge;
pub mod collaborators;
pub mod creation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prefab_core::{serialize_prefab, validate_references, BridgeConfig, LiveNode, WalkOptions};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use bridge::{BridgeError, PluginBridge, PluginRequest, PluginResponse};
pub use collaborators::{AssetDatabase, AssetInfo, CollaboratorError, SceneService};
pub use creation::{
    AssetDbStrategy, CreateError, CreatePrefabRequest, CreationStrategy, NativeStrategy,
    OfflineStrategy, PrefabCreated, PrefabCreator, ToolResult,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// How long a caller waits for the plugin to answer a command
    pub request_timeout: Duration,
    /// How long a plugin poll is held open when the queue is empty
    pub poll_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 44756,
            host: "127.0.0.1".to_string(),
            request_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(15),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub bridge: Arc<PluginBridge>,
    pub creator: PrefabCreator,
    pub config: BridgeConfig,
    pub poll_timeout: Duration,
}

impl AppState {
    /// State whose collaborators are reached through the plugin bridge
    pub fn new(server: &ServerConfig, config: BridgeConfig) -> Arc<Self> {
        let bridge = Arc::new(PluginBridge::new(server.request_timeout));
        let creator = PrefabCreator::from_config(&config, bridge.clone(), bridge.clone());
        Self::with_creator(server, config, bridge, creator)
    }

    pub fn with_creator(
        server: &ServerConfig,
        config: BridgeConfig,
        bridge: Arc<PluginBridge>,
        creator: PrefabCreator,
    ) -> Arc<Self> {
        Arc::new(Self {
            bridge,
            creator,
            config,
            poll_timeout: server.poll_timeout,
        })
    }
}

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Editor plugin long-poll endpoints
        .route("/bridge/request", get(handle_request_poll))
        .route("/bridge/response", post(handle_response))
        // Prefab tools
        .route("/prefab/create", post(handle_create_prefab))
        .route("/prefab/serialize", post(handle_serialize))
        .route("/health", get(handle_health))
        .with_state(state)
        // Node snapshots of large scenes can be several megabytes
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "strategies": state.creator.strategy_kinds(),
    }))
}

/// Long-polling endpoint for the plugin to receive commands
async fn handle_request_poll(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.bridge.next_request(state.poll_timeout).await {
        Some(request) => (StatusCode::OK, Json(json!(request))),
        None => (StatusCode::NO_CONTENT, Json(Value::Null)),
    }
}

/// Command result posted by the plugin
async fn handle_response(
    State(state): State<Arc<AppState>>,
    Json(response): Json<PluginResponse>,
) -> impl IntoResponse {
    if state.bridge.deliver(response).await {
        StatusCode::OK
    } else {
        StatusCode::GONE
    }
}

async fn handle_create_prefab(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePrefabRequest>,
) -> impl IntoResponse {
    tracing::info!("Creating prefab '{}' from node {}", req.prefab_name, req.node_uuid);
    Json(state.creator.create_prefab_from_node(&req).await)
}

/// Serialize a snapshot supplied by the caller without touching the editor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializeRequest {
    pub tree: Value,
    pub name: String,
    #[serde(default = "default_true")]
    pub include_children: bool,
    #[serde(default = "default_true")]
    pub include_components: bool,
}

fn default_true() -> bool {
    true
}

fn serialize_snapshot(req: SerializeRequest, config: &BridgeConfig) -> Result<Value, prefab_core::PrefabError> {
    let tree = LiveNode::from_json(req.tree)?;
    let options = WalkOptions {
        include_children: req.include_children,
        include_components: req.include_components,
    };
    let document = serialize_prefab(&tree, &req.name, options, &config.serializer)?;
    let records = document.to_value()?;
    let references = validate_references(&records)?;

    Ok(json!({
        "recordCount": document.records.len(),
        "nodeCount": document.node_count(),
        "references": references,
        "records": records,
    }))
}

async fn handle_serialize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SerializeRequest>,
) -> impl IntoResponse {
    let result = match serialize_snapshot(req, &state.config) {
        Ok(data) => ToolResult::ok(data),
        Err(e) => {
            tracing::warn!("Serialization failed: {}", e);
            ToolResult::fail(e.to_string())
        }
    };
    Json(result)
}

/// Start the server
pub async fn run_server(server: ServerConfig, config: BridgeConfig) -> anyhow::Result<()> {
    let state = AppState::new(&server, config);
    let router = create_router(state);

    let addr = format!("{}:{}", server.host, server.port);
    tracing::info!("Prefab bridge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
