//! Prefab creation
//!
//! Turns one live node into a persisted prefab asset. Strategies are tried in
//! configured order and the first success wins:
//!
//! 1. `asset-db`: create a placeholder asset to get a database uuid, overwrite
//!    it with the serialized tree, write the meta, re-import, then try to link
//!    the source node to the new prefab
//! 2. `native`: the editor's own prefab API, unavailable in this editor
//!    version, so it always fails with an instruction for the user
//! 3. `offline`: generate a uuid locally and write both files to disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use prefab_core::{
    meta_path, normalize_save_path, random_canonical_id, resolve_db_url, serialize_prefab,
    BridgeConfig, LiveNode, PrefabDocument, PrefabError, PrefabMeta, StrategyKind, WalkOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborators::{AssetDatabase, CollaboratorError, SceneService};

/// Content of the placeholder asset created to obtain a database uuid
const PLACEHOLDER_CONTENT: &str = "[]";

/// Request to create a prefab from a live node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrefabRequest {
    pub node_uuid: String,
    /// `db://` url of the prefab, or of the folder to create it in
    pub save_path: String,
    pub prefab_name: String,
    #[serde(default = "default_true")]
    pub include_children: bool,
    #[serde(default = "default_true")]
    pub include_components: bool,
}

fn default_true() -> bool {
    true
}

impl CreatePrefabRequest {
    pub fn options(&self) -> WalkOptions {
        WalkOptions {
            include_children: self.include_children,
            include_components: self.include_components,
        }
    }

    /// Full prefab url
    pub fn url(&self) -> String {
        normalize_save_path(&self.save_path, &self.prefab_name)
    }
}

/// Outcome of a successful creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabCreated {
    pub uuid: String,
    pub url: String,
    pub strategy: StrategyKind,
    pub record_count: usize,
    pub node_count: usize,
    /// Whether the source node now points at the prefab
    pub linked: bool,
    /// File written by the offline strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error(transparent)]
    Prefab(#[from] PrefabError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Unsupported { message: String, instruction: String },
}

/// Uniform result returned to tool callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

impl From<CreateError> for ToolResult {
    fn from(err: CreateError) -> Self {
        match err {
            CreateError::Unsupported { message, instruction } => {
                ToolResult::fail(message).with_instruction(instruction)
            }
            other => ToolResult::fail(other.to_string()),
        }
    }
}

/// One way of turning a live node into a prefab asset
#[async_trait]
pub trait CreationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn create(&self, request: &CreatePrefabRequest) -> Result<PrefabCreated, CreateError>;
}

/// Fetch and parse the live tree rooted at `node_uuid`
async fn fetch_tree(scene: &dyn SceneService, node_uuid: &str) -> Result<LiveNode, CreateError> {
    let snapshot = scene
        .query_node_tree(node_uuid)
        .await?
        .ok_or_else(|| CreateError::NodeNotFound(node_uuid.to_string()))?;
    Ok(LiveNode::from_json(snapshot)?)
}

fn serialize(tree: &LiveNode, request: &CreatePrefabRequest, config: &BridgeConfig) -> Result<PrefabDocument, CreateError> {
    Ok(serialize_prefab(
        tree,
        &request.prefab_name,
        request.options(),
        &config.serializer,
    )?)
}

fn meta_json(uuid: &str, request: &CreatePrefabRequest, config: &BridgeConfig) -> Result<String, CreateError> {
    PrefabMeta::new(uuid, &request.prefab_name, &config.meta_version)
        .to_json()
        .map_err(|e| CreateError::Prefab(PrefabError::Encode(e)))
}

/// Creates through the asset database
pub struct AssetDbStrategy {
    scene: Arc<dyn SceneService>,
    assets: Arc<dyn AssetDatabase>,
    config: BridgeConfig,
}

impl AssetDbStrategy {
    pub fn new(scene: Arc<dyn SceneService>, assets: Arc<dyn AssetDatabase>, config: BridgeConfig) -> Self {
        Self { scene, assets, config }
    }
}

#[async_trait]
impl CreationStrategy for AssetDbStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AssetDb
    }

    async fn create(&self, request: &CreatePrefabRequest) -> Result<PrefabCreated, CreateError> {
        let tree = fetch_tree(self.scene.as_ref(), &request.node_uuid).await?;
        let url = request.url();

        let info = self.assets.create_asset(&url, PLACEHOLDER_CONTENT).await?;
        tracing::debug!("Placeholder asset {} created with uuid {}", url, info.uuid);

        let document = serialize(&tree, request, &self.config)?;
        self.assets.save_asset(&url, &document.to_json()?).await?;
        self.assets
            .save_asset_meta(&url, &meta_json(&info.uuid, request, &self.config)?)
            .await?;
        self.assets.reimport_asset(&url).await?;

        let linked = if self.config.link_original_node {
            match self
                .scene
                .link_prefab_instance(&request.node_uuid, &info.uuid)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        "Prefab {} created but node {} could not be linked: {}",
                        url,
                        request.node_uuid,
                        e
                    );
                    false
                }
            }
        } else {
            false
        };

        Ok(PrefabCreated {
            uuid: info.uuid,
            url,
            strategy: self.kind(),
            record_count: document.records.len(),
            node_count: document.node_count(),
            linked,
            path: None,
        })
    }
}

/// The editor's native prefab API, not exposed by this editor version
pub struct NativeStrategy;

#[async_trait]
impl CreationStrategy for NativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    async fn create(&self, _request: &CreatePrefabRequest) -> Result<PrefabCreated, CreateError> {
        Err(CreateError::Unsupported {
            message: "The editor does not expose a prefab creation API in this version".to_string(),
            instruction: "Drag the node from the Hierarchy panel into the Assets panel to create the prefab manually"
                .to_string(),
        })
    }
}

/// Writes the prefab and meta straight to the project directory
pub struct OfflineStrategy {
    scene: Arc<dyn SceneService>,
    config: BridgeConfig,
}

impl OfflineStrategy {
    pub fn new(scene: Arc<dyn SceneService>, config: BridgeConfig) -> Self {
        Self { scene, config }
    }
}

async fn write_file(path: &Path, content: &str) -> Result<(), CreateError> {
    let to_error = |source| CreateError::Write { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
    }
    tokio::fs::write(path, content).await.map_err(to_error)
}

#[async_trait]
impl CreationStrategy for OfflineStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Offline
    }

    async fn create(&self, request: &CreatePrefabRequest) -> Result<PrefabCreated, CreateError> {
        let tree = fetch_tree(self.scene.as_ref(), &request.node_uuid).await?;
        let url = request.url();
        let uuid = random_canonical_id();

        let document = serialize(&tree, request, &self.config)?;
        let prefab_path = resolve_db_url(&self.config.project_root, &url);

        write_file(&prefab_path, &document.to_json()?).await?;
        write_file(&meta_path(&prefab_path), &meta_json(&uuid, request, &self.config)?).await?;

        tracing::info!("Wrote prefab {} to {}", uuid, prefab_path.display());

        Ok(PrefabCreated {
            uuid,
            url,
            strategy: self.kind(),
            record_count: document.records.len(),
            node_count: document.node_count(),
            linked: false,
            path: Some(prefab_path),
        })
    }
}

/// Tries each strategy in order until one succeeds
pub struct PrefabCreator {
    strategies: Vec<Box<dyn CreationStrategy>>,
}

impl PrefabCreator {
    pub fn new(strategies: Vec<Box<dyn CreationStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the strategy chain named in `config`
    pub fn from_config(
        config: &BridgeConfig,
        scene: Arc<dyn SceneService>,
        assets: Arc<dyn AssetDatabase>,
    ) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|kind| -> Box<dyn CreationStrategy> {
                match kind {
                    StrategyKind::AssetDb => {
                        Box::new(AssetDbStrategy::new(scene.clone(), assets.clone(), config.clone()))
                    }
                    StrategyKind::Native => Box::new(NativeStrategy),
                    StrategyKind::Offline => Box::new(OfflineStrategy::new(scene.clone(), config.clone())),
                }
            })
            .collect();
        Self::new(strategies)
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub async fn create_prefab_from_node(&self, request: &CreatePrefabRequest) -> ToolResult {
        if request.node_uuid.trim().is_empty() {
            return ToolResult::fail("nodeUuid is required");
        }
        if request.prefab_name.trim().is_empty() {
            return ToolResult::fail("prefabName is required");
        }

        let mut failures = Vec::new();
        let mut instruction = None;

        for strategy in &self.strategies {
            match strategy.create(request).await {
                Ok(created) => {
                    tracing::info!(
                        "Created prefab {} ({}) via {}",
                        created.url,
                        created.uuid,
                        created.strategy
                    );
                    return ToolResult::ok(serde_json::to_value(&created).unwrap_or_default());
                }
                Err(e) => {
                    tracing::warn!("Strategy {} failed: {}", strategy.kind(), e);
                    if let CreateError::Unsupported { instruction: ref text, .. } = e {
                        instruction = Some(text.clone());
                    }
                    failures.push(format!("{}: {}", strategy.kind(), e));
                }
            }
        }

        if failures.is_empty() {
            return ToolResult::fail("No creation strategies configured");
        }

        let result = ToolResult::fail(format!("All strategies failed ({})", failures.join("; ")));
        match instruction {
            Some(text) => result.with_instruction(text),
            None => result,
        }
    }
}
