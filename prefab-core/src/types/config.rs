//! Bridge configuration
//!
//! Defines the `prefab-bridge.json` file read by the server and CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::meta::DEFAULT_META_VERSION;
use super::record::DEFAULT_LAYER;
use crate::error::PrefabError;

/// Default config file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "prefab-bridge.json";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Editor project root; `db://assets/...` maps to `<projectRoot>/assets/...`
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// `ver` written into `.prefab.meta` files
    #[serde(default = "default_meta_version")]
    pub meta_version: String,

    /// Try to turn the source node into a prefab instance after creation
    #[serde(default = "default_true")]
    pub link_original_node: bool,

    /// Record builder settings
    #[serde(default)]
    pub serializer: SerializerConfig,

    /// Creation strategies, tried in order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_meta_version() -> String {
    DEFAULT_META_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::AssetDb, StrategyKind::Native, StrategyKind::Offline]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            meta_version: default_meta_version(),
            link_original_node: true,
            serializer: SerializerConfig::default(),
            strategies: default_strategies(),
        }
    }
}

impl BridgeConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, PrefabError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(PrefabError::ConfigParse)
    }

    /// Load `prefab-bridge.json` from `dir`, or defaults if there is none.
    /// A relative `projectRoot` is resolved against `dir`.
    pub fn load_or_default(dir: &Path) -> Result<Self, PrefabError> {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        if config.project_root.is_relative() {
            config.project_root = dir.join(&config.project_root);
        }
        Ok(config)
    }
}

/// Settings for the record builders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializerConfig {
    /// Properties copied from components without a dedicated builder.
    /// Anything not listed is dropped so live-only state never leaks into
    /// the prefab.
    #[serde(default = "default_generic_fields")]
    pub generic_fields: Vec<String>,

    /// Layer written for nodes whose snapshot has none
    #[serde(default = "default_layer")]
    pub default_layer: u32,
}

fn default_generic_fields() -> Vec<String> {
    [
        "color",
        "string",
        "fontSize",
        "lineHeight",
        "spriteFrame",
        "sizeMode",
        "type",
        "target",
        "interactable",
        "contentSize",
        "anchorPoint",
        "horizontalAlign",
        "verticalAlign",
        "overflow",
        "enableWrapText",
        "font",
        "clickEvents",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_layer() -> u32 {
    DEFAULT_LAYER
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            generic_fields: default_generic_fields(),
            default_layer: default_layer(),
        }
    }
}

/// Named creation strategies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Create through the asset database, then overwrite the placeholder
    AssetDb,
    /// Ask the editor's own prefab API
    Native,
    /// Write files directly to disk with a locally generated uuid
    Offline,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::AssetDb => write!(f, "asset-db"),
            StrategyKind::Native => write!(f, "native"),
            StrategyKind::Offline => write!(f, "offline"),
        }
    }
}
