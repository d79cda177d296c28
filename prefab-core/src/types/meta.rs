//! Companion `.prefab.meta` record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Importer version written when none is configured
pub const DEFAULT_META_VERSION: &str = "1.1.50";

/// The metadata file written next to a prefab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabMeta {
    pub ver: String,
    pub importer: String,
    pub imported: bool,
    pub uuid: String,
    pub files: Vec<String>,
    pub sub_metas: Map<String, Value>,
    pub user_data: PrefabUserData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabUserData {
    pub sync_node_name: String,
}

impl PrefabMeta {
    pub fn new(uuid: impl Into<String>, node_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ver: version.into(),
            importer: "prefab".to_string(),
            imported: true,
            uuid: uuid.into(),
            files: vec![".json".to_string()],
            sub_metas: Map::new(),
            user_data: PrefabUserData {
                sync_node_name: node_name.into(),
            },
        }
    }

    /// Pretty-printed JSON, as the editor writes it
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
