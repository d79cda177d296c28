//! Editor plugin bridge
//!
//! The editor plugin long-polls `/bridge/request` for queued commands and
//! posts results back to `/bridge/response`. Server-side callers enqueue a
//! command and wait on a per-request channel for the matching response.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use uuid::Uuid;

use crate::collaborators::{AssetDatabase, AssetInfo, CollaboratorError, SceneService};

/// Command queued for the editor plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    pub id: Uuid,
    pub command: String,
    pub payload: Value,
}

/// Result posted back by the editor plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    pub id: Uuid,
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Timed out waiting for the editor to answer '{0}'")]
    Timeout(String),

    #[error("Response channel closed for '{0}'")]
    ChannelClosed(String),

    #[error("Editor rejected '{command}': {message}")]
    Rejected { command: String, message: String },
}

/// Request queue shared between HTTP handlers and collaborator calls
pub struct PluginBridge {
    request_queue: Mutex<VecDeque<PluginRequest>>,
    response_channels: RwLock<HashMap<Uuid, mpsc::UnboundedSender<PluginResponse>>>,
    trigger: watch::Sender<()>,
    trigger_rx: watch::Receiver<()>,
    request_timeout: Duration,
}

impl PluginBridge {
    pub fn new(request_timeout: Duration) -> Self {
        let (trigger, trigger_rx) = watch::channel(());
        Self {
            request_queue: Mutex::new(VecDeque::new()),
            response_channels: RwLock::new(HashMap::new()),
            trigger,
            trigger_rx,
            request_timeout,
        }
    }

    /// Wait up to `wait` for the next queued request
    pub async fn next_request(&self, wait: Duration) -> Option<PluginRequest> {
        let mut trigger_rx = self.trigger_rx.clone();
        let _ = trigger_rx.borrow_and_update();

        if let Some(request) = self.request_queue.lock().await.pop_front() {
            return Some(request);
        }

        tokio::select! {
            _ = tokio::time::sleep(wait) => None,
            _ = trigger_rx.changed() => self.request_queue.lock().await.pop_front(),
        }
    }

    /// Route a plugin response to its waiting caller
    pub async fn deliver(&self, response: PluginResponse) -> bool {
        let channels = self.response_channels.read().await;
        match channels.get(&response.id) {
            Some(sender) => sender.send(response).is_ok(),
            None => {
                tracing::warn!("No caller waiting for response {}", response.id);
                false
            }
        }
    }

    /// Send a command to the plugin and wait for its result data
    pub async fn dispatch(&self, command: &str, payload: Value) -> Result<Value, BridgeError> {
        let request_id = Uuid::new_v4();

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.response_channels.write().await.insert(request_id, tx);

        self.request_queue.lock().await.push_back(PluginRequest {
            id: request_id,
            command: command.to_string(),
            payload,
        });
        let _ = self.trigger.send(());

        tracing::debug!("Sent plugin command: {} ({})", command, request_id);

        let result = tokio::time::timeout(self.request_timeout, rx.recv()).await;

        self.response_channels.write().await.remove(&request_id);

        // A command nobody waits for any more must not reach the plugin later
        if !matches!(result, Ok(Some(_))) {
            self.request_queue
                .lock()
                .await
                .retain(|request| request.id != request_id);
        }

        match result {
            Ok(Some(response)) if response.success => Ok(response.data),
            Ok(Some(response)) => Err(BridgeError::Rejected {
                command: command.to_string(),
                message: response.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            Ok(None) => Err(BridgeError::ChannelClosed(command.to_string())),
            Err(_) => {
                tracing::warn!("Timeout waiting for response: {} ({})", command, request_id);
                Err(BridgeError::Timeout(command.to_string()))
            }
        }
    }
}

#[async_trait]
impl SceneService for PluginBridge {
    async fn query_node_tree(&self, node_uuid: &str) -> Result<Option<Value>, CollaboratorError> {
        let data = self
            .dispatch("scene:query-node-tree", json!({ "uuid": node_uuid }))
            .await?;
        Ok(if data.is_null() { None } else { Some(data) })
    }

    async fn link_prefab_instance(&self, node_uuid: &str, prefab_uuid: &str) -> Result<(), CollaboratorError> {
        self.dispatch(
            "scene:link-prefab",
            json!({ "node": node_uuid, "prefab": prefab_uuid }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AssetDatabase for PluginBridge {
    async fn create_asset(&self, url: &str, content: &str) -> Result<AssetInfo, CollaboratorError> {
        const COMMAND: &str = "asset-db:create-asset";
        let data = self
            .dispatch(COMMAND, json!({ "url": url, "content": content }))
            .await?;
        serde_json::from_value(data).map_err(|e| CollaboratorError::UnexpectedResponse {
            command: COMMAND.to_string(),
            message: e.to_string(),
        })
    }

    async fn save_asset(&self, url: &str, content: &str) -> Result<(), CollaboratorError> {
        self.dispatch("asset-db:save-asset", json!({ "url": url, "content": content }))
            .await?;
        Ok(())
    }

    async fn save_asset_meta(&self, url: &str, meta: &str) -> Result<(), CollaboratorError> {
        self.dispatch("asset-db:save-asset-meta", json!({ "url": url, "content": meta }))
            .await?;
        Ok(())
    }

    async fn reimport_asset(&self, url: &str) -> Result<(), CollaboratorError> {
        self.dispatch("asset-db:reimport-asset", json!({ "url": url }))
            .await?;
        Ok(())
    }
}
