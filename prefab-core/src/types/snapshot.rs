//! Live scene snapshots
//!
//! The scene query service hands back nodes in a loosely shaped JSON form:
//! any scalar field may arrive bare (`"name": "Foo"`) or wrapped
//! (`"name": {"value": "Foo"}`). Fields are therefore kept as raw JSON and
//! always read through [`unwrap`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::values::{coerce_number, Quat, Vec3};
use crate::error::PrefabError;

/// Fallback component type when a snapshot carries none
pub const GENERIC_COMPONENT: &str = "cc.Component";

/// Strip a `{value: ...}` wrapper if there is one
pub fn unwrap(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").unwrap_or(value),
        _ => value,
    }
}

/// Unwrap an optional field into a non-empty string
fn unwrap_str(value: Option<&Value>) -> Option<&str> {
    value
        .map(unwrap)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn unwrap_bool(value: Option<&Value>, default: bool) -> bool {
    value.map(unwrap).and_then(Value::as_bool).unwrap_or(default)
}

/// Accept `null` wherever a list or map is expected
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node as returned by the scene query service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveNode {
    #[serde(default)]
    pub uuid: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub rotation: Option<Value>,
    #[serde(default)]
    pub euler_angles: Option<Value>,
    #[serde(default)]
    pub scale: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub layer: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<LiveNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<LiveComponent>,
}

impl LiveNode {
    /// Parse a snapshot from raw JSON
    pub fn from_json(value: Value) -> Result<Self, PrefabError> {
        serde_json::from_value(value).map_err(PrefabError::InvalidSnapshot)
    }

    pub fn uuid(&self) -> Option<&str> {
        unwrap_str(self.uuid.as_ref())
    }

    pub fn name(&self) -> Option<&str> {
        unwrap_str(self.name.as_ref())
    }

    pub fn active(&self) -> bool {
        unwrap_bool(self.active.as_ref(), true)
    }

    pub fn layer(&self, default: u32) -> u32 {
        match self.layer.as_ref().map(unwrap) {
            None | Some(Value::Null) => default,
            Some(v) => coerce_number(v) as u32,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
            .as_ref()
            .map(|v| Vec3::from_value(unwrap(v)))
            .unwrap_or_else(Vec3::zero)
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
            .as_ref()
            .map(|v| Quat::from_value_or(unwrap(v), Quat::identity()))
            .unwrap_or_else(Quat::identity)
    }

    pub fn euler(&self) -> Vec3 {
        self.euler_angles
            .as_ref()
            .map(|v| Vec3::from_value(unwrap(v)))
            .unwrap_or_else(Vec3::zero)
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
            .as_ref()
            .map(|v| Vec3::from_value_or(unwrap(v), Vec3::one()))
            .unwrap_or_else(Vec3::one)
    }

    /// Count this node and every descendant
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(LiveNode::subtree_len).sum::<usize>()
    }
}

/// A component as returned by the scene query service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveComponent {
    #[serde(default, rename = "type")]
    pub type_name: Option<Value>,
    #[serde(default, rename = "__type__")]
    pub engine_type: Option<Value>,
    #[serde(default)]
    pub uuid: Option<Value>,
    #[serde(default)]
    pub enabled: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,
}

impl LiveComponent {
    /// The declared type tag (`type`, then `__type__`)
    pub fn type_tag(&self) -> &str {
        unwrap_str(self.type_name.as_ref())
            .or_else(|| unwrap_str(self.engine_type.as_ref()))
            .unwrap_or(GENERIC_COMPONENT)
    }

    pub fn uuid(&self) -> Option<&str> {
        unwrap_str(self.uuid.as_ref())
    }

    pub fn enabled(&self) -> bool {
        unwrap_bool(self.enabled.as_ref(), true)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
