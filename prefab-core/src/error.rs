//! Error types for prefab serialization

/// Errors raised while building or loading prefab data
#[derive(Debug, thiserror::Error)]
pub enum PrefabError {
    #[error("Record slot {0} was allocated but never filled")]
    UnfilledSlot(usize),

    #[error("Record {0} has no metadata link")]
    UnlinkedMetadata(usize),

    #[error("Record {from} references missing record {target}")]
    DanglingReference { from: usize, target: usize },

    #[error("Invalid node snapshot: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),

    #[error("Failed to encode prefab: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[source] serde_json::Error),
}
