//! Prefab Bridge Core Library
//!
//! Turns a live scene-node snapshot into the editor's on-disk prefab format:
//! - Compact id codec and random identifiers
//! - Property descriptor resolution (references, assets, value types)
//! - Node and component record builders
//! - The tree walker that lays out the flat, index-addressed record array
//! - Companion meta records and bridge configuration

pub mod codec;
pub mod component;
pub mod error;
pub mod node;
pub mod path_utils;
pub mod transducer;
pub mod types;
pub mod walker;

// Re-export commonly used types
pub use codec::{compact_id, random_canonical_id, random_file_tag};
pub use error::PrefabError;
pub use path_utils::{meta_path, normalize_save_path, resolve_db_url};
pub use transducer::resolve;
pub use types::{
    unwrap, AssetRef, BridgeConfig, IdRef, LiveComponent, LiveNode, PrefabMeta, Record,
    RecordKind, SerializerConfig, StrategyKind,
};
pub use walker::{
    build_tree, serialize_prefab, validate_references, BuildContext, PrefabDocument, WalkOptions,
    ASSET_INDEX, ROOT_INDEX,
};
