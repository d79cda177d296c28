//! External collaborators
//!
//! The scene query service supplies live node snapshots; the asset database
//! persists files and assigns canonical ids. Both live inside the editor and
//! are reached through the plugin bridge in production.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::bridge::BridgeError;

/// Errors reported by a collaborator call
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Unexpected response from {command}: {message}")]
    UnexpectedResponse { command: String, message: String },
}

/// Asset database entry returned when an asset is created
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetInfo {
    pub uuid: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Live scene access
#[async_trait]
pub trait SceneService: Send + Sync {
    /// Snapshot of the node tree rooted at `node_uuid`; `None` if no such node
    async fn query_node_tree(&self, node_uuid: &str) -> Result<Option<Value>, CollaboratorError>;

    /// Replace the live node with an instance linked to the prefab asset
    async fn link_prefab_instance(&self, node_uuid: &str, prefab_uuid: &str) -> Result<(), CollaboratorError>;
}

/// Asset persistence
#[async_trait]
pub trait AssetDatabase: Send + Sync {
    /// Create an asset at `url`; the database assigns its uuid
    async fn create_asset(&self, url: &str, content: &str) -> Result<AssetInfo, CollaboratorError>;

    /// Overwrite the content of an existing asset
    async fn save_asset(&self, url: &str, content: &str) -> Result<(), CollaboratorError>;

    /// Overwrite the companion meta of an existing asset
    async fn save_asset_meta(&self, url: &str, meta: &str) -> Result<(), CollaboratorError>;

    /// Ask the database to re-import an asset after its files changed
    async fn reimport_asset(&self, url: &str) -> Result<(), CollaboratorError>;
}
