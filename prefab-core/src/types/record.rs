//! Serialized prefab records
//!
//! A prefab file is a flat JSON array. A record's identity is its position in
//! that array, and every structural link (parent, children, components,
//! metadata) is an `{"__id__": n}` pointer into the same array.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::values::{Quat, Vec3};

pub const PREFAB: &str = "cc.Prefab";
pub const NODE: &str = "cc.Node";
pub const PREFAB_INFO: &str = "cc.PrefabInfo";
pub const COMP_PREFAB_INFO: &str = "cc.CompPrefabInfo";

/// Default node layer (`1 << 30`)
pub const DEFAULT_LAYER: u32 = 1 << 30;

/// Keys every component record writes itself; type-specific fields never
/// reuse them
pub const COMPONENT_HEADER_KEYS: &[&str] = &[
    "__type__",
    "_name",
    "_objFlags",
    "__editorExtras__",
    "node",
    "_enabled",
    "__prefab",
    "_id",
];

/// Same-array reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IdRef {
    #[serde(rename = "__id__")]
    pub id: usize,
}

impl IdRef {
    pub fn new(id: usize) -> Self {
        Self { id }
    }

    pub fn to_value(self) -> Value {
        json!({ "__id__": self.id })
    }
}

/// Reference into the asset database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    #[serde(rename = "__uuid__")]
    pub uuid: String,
    #[serde(rename = "__expectedType__")]
    pub expected_type: String,
}

impl AssetRef {
    pub fn to_value(&self) -> Value {
        json!({
            "__uuid__": self.uuid,
            "__expectedType__": self.expected_type,
        })
    }
}

/// The prefab asset record, always at index 0
#[derive(Debug, Clone, Serialize)]
pub struct PrefabAssetRecord {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Map<String, Value>,
    #[serde(rename = "_native")]
    pub native: String,
    pub data: IdRef,
    #[serde(rename = "optimizationPolicy")]
    pub optimization_policy: u32,
    pub persistent: bool,
}

impl PrefabAssetRecord {
    pub fn new(name: impl Into<String>, root: IdRef) -> Self {
        Self {
            type_tag: PREFAB,
            name: name.into(),
            obj_flags: 0,
            editor_extras: Map::new(),
            native: String::new(),
            data: root,
            optimization_policy: 0,
            persistent: false,
        }
    }
}

/// A scene node
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Map<String, Value>,
    #[serde(rename = "_parent")]
    pub parent: Option<IdRef>,
    #[serde(rename = "_children")]
    pub children: Vec<IdRef>,
    #[serde(rename = "_active")]
    pub active: bool,
    #[serde(rename = "_components")]
    pub components: Vec<IdRef>,
    /// Link to this node's `cc.PrefabInfo`, filled once that record exists
    #[serde(rename = "_prefab")]
    pub prefab: Option<IdRef>,
    #[serde(rename = "_lpos")]
    pub position: Vec3,
    #[serde(rename = "_lrot")]
    pub rotation: Quat,
    #[serde(rename = "_lscale")]
    pub scale: Vec3,
    #[serde(rename = "_mobility")]
    pub mobility: u32,
    #[serde(rename = "_layer")]
    pub layer: u32,
    #[serde(rename = "_euler")]
    pub euler: Vec3,
    #[serde(rename = "_id")]
    pub id: String,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, parent: Option<IdRef>) -> Self {
        Self {
            type_tag: NODE,
            name: name.into(),
            obj_flags: 0,
            editor_extras: Map::new(),
            parent,
            children: Vec::new(),
            active: true,
            components: Vec::new(),
            prefab: None,
            position: Vec3::zero(),
            rotation: Quat::identity(),
            scale: Vec3::one(),
            mobility: 0,
            layer: DEFAULT_LAYER,
            euler: Vec3::zero(),
            id: String::new(),
        }
    }
}

/// A component attached to a node
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRecord {
    #[serde(rename = "__type__")]
    pub type_tag: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Map<String, Value>,
    pub node: IdRef,
    #[serde(rename = "_enabled")]
    pub enabled: bool,
    /// Link to this component's `cc.CompPrefabInfo`, back-filled by the walker
    #[serde(rename = "__prefab")]
    pub prefab: Option<IdRef>,
    /// Type-specific serialized fields, in insertion order
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "_id")]
    pub id: String,
}

impl ComponentRecord {
    pub fn new(type_tag: impl Into<String>, node: IdRef, enabled: bool) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: String::new(),
            obj_flags: 0,
            editor_extras: Map::new(),
            node,
            enabled,
            prefab: None,
            fields: Map::new(),
            id: String::new(),
        }
    }
}

/// Per-node prefab metadata (`cc.PrefabInfo`)
#[derive(Debug, Clone, Serialize)]
pub struct PrefabInfoRecord {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub root: IdRef,
    pub asset: IdRef,
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub instance: Option<Value>,
    #[serde(rename = "targetOverrides")]
    pub target_overrides: Option<Vec<IdRef>>,
    #[serde(rename = "nestedPrefabInstanceRoots")]
    pub nested_prefab_instance_roots: Option<Vec<IdRef>>,
}

impl PrefabInfoRecord {
    pub fn new(root: IdRef, asset: IdRef, file_id: impl Into<String>) -> Self {
        Self {
            type_tag: PREFAB_INFO,
            root,
            asset,
            file_id: file_id.into(),
            instance: None,
            target_overrides: None,
            nested_prefab_instance_roots: None,
        }
    }
}

/// Per-component prefab metadata (`cc.CompPrefabInfo`)
#[derive(Debug, Clone, Serialize)]
pub struct CompPrefabInfoRecord {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

impl CompPrefabInfoRecord {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self { type_tag: COMP_PREFAB_INFO, file_id: file_id.into() }
    }
}

/// Any record in the flat prefab array
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Record {
    PrefabAsset(PrefabAssetRecord),
    Node(NodeRecord),
    Component(ComponentRecord),
    NodeLink(PrefabInfoRecord),
    ComponentLink(CompPrefabInfoRecord),
}

/// Discriminant of a [`Record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    PrefabAsset,
    Node,
    Component,
    NodeLink,
    ComponentLink,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::PrefabAsset(_) => RecordKind::PrefabAsset,
            Record::Node(_) => RecordKind::Node,
            Record::Component(_) => RecordKind::Component,
            Record::NodeLink(_) => RecordKind::NodeLink,
            Record::ComponentLink(_) => RecordKind::ComponentLink,
        }
    }

    /// The `__type__` tag written for this record
    pub fn type_tag(&self) -> &str {
        match self {
            Record::PrefabAsset(r) => r.type_tag,
            Record::Node(r) => r.type_tag,
            Record::Component(r) => &r.type_tag,
            Record::NodeLink(r) => r.type_tag,
            Record::ComponentLink(r) => r.type_tag,
        }
    }

    pub fn as_node(&self) -> Option<&NodeRecord> {
        match self {
            Record::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentRecord> {
        match self {
            Record::Component(component) => Some(component),
            _ => None,
        }
    }
}
