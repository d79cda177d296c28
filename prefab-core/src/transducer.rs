//! Property transducer
//!
//! Turns one live property descriptor (`{value, type?, elementTypeData?}`,
//! or a bare value) into the JSON written into a component record. Node and
//! component references become same-array `{"__id__"}` pointers when the
//! target was already emitted, asset references become `{"__uuid__"}`
//! pointers, and small engine value types are rebuilt field by field.
//!
//! Resolution never fails: a reference that cannot be resolved is logged and
//! written as `null` so the array never holds a dangling index.

use serde_json::{Map, Value};

use crate::codec::compact_id;
use crate::types::{
    to_json, unwrap, AssetRef, Color, IdRef, Quat, Size, Vec2, Vec3, COLOR, QUAT, SIZE, VEC2, VEC3,
};
use crate::walker::BuildContext;

/// Type tag of node references
pub const NODE_REFERENCE: &str = "cc.Node";

/// Type tag of untyped component references
pub const COMPONENT_REFERENCE: &str = "cc.Component";

/// Engine namespace prefix
pub const ENGINE_PREFIX: &str = "cc.";

pub const PREFAB_ASSET: &str = "cc.Prefab";

/// Asset kinds referenced by uuid
pub const ASSET_TYPES: &[&str] = &[
    PREFAB_ASSET,
    "cc.Texture2D",
    "cc.SpriteFrame",
    "cc.Material",
    "cc.AnimationClip",
    "cc.AudioClip",
    "cc.Font",
    "cc.Asset",
];

/// Built-in component types that may be referenced from other components
pub const WELL_KNOWN_COMPONENTS: &[&str] = &[
    "cc.UITransform",
    "cc.Sprite",
    "cc.Button",
    "cc.Label",
    "cc.Widget",
    "cc.Layout",
    "cc.Mask",
    "cc.Graphics",
    "cc.RichText",
    "cc.ScrollView",
    "cc.EditBox",
    "cc.Toggle",
];

pub fn is_asset_type(type_tag: &str) -> bool {
    ASSET_TYPES.contains(&type_tag)
}

/// Component tags: the generic tag, a well-known name, or any engine type
/// that is not a sub-asset (`@`).
pub fn is_component_type(type_tag: &str) -> bool {
    type_tag == COMPONENT_REFERENCE
        || WELL_KNOWN_COMPONENTS.contains(&type_tag)
        || (type_tag.starts_with(ENGINE_PREFIX) && !type_tag.contains('@'))
}

/// Engine-namespaced element kinds that are not value types, e.g.
/// `cc.SpriteAtlas` or `cc.JsonAsset`
fn is_engine_asset_like(type_tag: &str) -> bool {
    type_tag.starts_with(ENGINE_PREFIX) && ValueType::from_tag(type_tag).is_none()
}

/// Small engine value types rebuilt from their numeric fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Vec2,
    Vec3,
    Size,
    Color,
    Quat,
}

impl ValueType {
    pub fn from_tag(type_tag: &str) -> Option<Self> {
        match type_tag {
            VEC2 => Some(ValueType::Vec2),
            VEC3 => Some(ValueType::Vec3),
            SIZE => Some(ValueType::Size),
            COLOR => Some(ValueType::Color),
            QUAT => Some(ValueType::Quat),
            _ => None,
        }
    }

    /// Build a fresh typed record from a loosely shaped object
    pub fn build(self, value: &Value) -> Value {
        match self {
            ValueType::Vec2 => to_json(&Vec2::from_value(value)),
            ValueType::Vec3 => to_json(&Vec3::from_value(value)),
            ValueType::Size => to_json(&Size::from_value(value)),
            ValueType::Color => to_json(&Color::from_value(value)),
            ValueType::Quat => to_json(&Quat::from_value(value)),
        }
    }
}

/// A descriptor split into its parts
struct Descriptor<'a> {
    value: &'a Value,
    type_tag: Option<&'a str>,
    element_type: Option<&'a str>,
}

impl<'a> Descriptor<'a> {
    /// Objects carrying `value` or `type` are descriptors; anything else is
    /// a bare value with no declared type.
    fn parse(input: &'a Value) -> Self {
        match input.as_object() {
            Some(obj) if obj.contains_key("value") || obj.contains_key("type") => Self {
                value: obj.get("value").unwrap_or(&Value::Null),
                type_tag: obj.get("type").and_then(Value::as_str),
                element_type: obj
                    .get("elementTypeData")
                    .and_then(|e| e.get("type"))
                    .and_then(Value::as_str),
            },
            _ => Self {
                value: input,
                type_tag: None,
                element_type: None,
            },
        }
    }
}

/// Resolve one property descriptor against the current build
pub fn resolve(input: &Value, ctx: &BuildContext) -> Value {
    if !input.is_object() {
        return input.clone();
    }

    let Descriptor { value, type_tag, element_type } = Descriptor::parse(input);

    if value.is_null() {
        return Value::Null;
    }

    let uuid = match value.get("uuid") {
        Some(Value::String(s)) if s.is_empty() => return Value::Null,
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };

    if let (Some(type_tag), Some(uuid)) = (type_tag, uuid) {
        if type_tag == NODE_REFERENCE {
            return node_reference(uuid, ctx);
        }
        if is_asset_type(type_tag) {
            return asset_reference(uuid, type_tag, type_tag != PREFAB_ASSET);
        }
        if is_component_type(type_tag) {
            return component_reference(uuid, type_tag, ctx);
        }
    }

    if let Some(value_type) = type_tag.and_then(ValueType::from_tag) {
        return value_type.build(value);
    }

    if let Value::Array(items) = value {
        return resolve_array(items, element_type, ctx);
    }

    if let (Value::Object(map), Some(type_tag)) = (value, type_tag) {
        if type_tag.starts_with(ENGINE_PREFIX) {
            let mut tagged = Map::with_capacity(map.len() + 1);
            tagged.insert("__type__".to_string(), Value::String(type_tag.to_string()));
            tagged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            return Value::Object(tagged);
        }
    }

    value.clone()
}

fn node_reference(uuid: &str, ctx: &BuildContext) -> Value {
    match ctx.node_index(uuid) {
        Some(index) => IdRef::new(index).to_value(),
        None => {
            tracing::warn!("Node reference {} is outside the serialized subtree, writing null", uuid);
            Value::Null
        }
    }
}

fn component_reference(uuid: &str, type_tag: &str, ctx: &BuildContext) -> Value {
    match ctx.component_index(uuid) {
        Some(index) => IdRef::new(index).to_value(),
        None => {
            tracing::warn!(
                "Component reference {} ({}) has not been serialized yet, writing null",
                uuid,
                type_tag
            );
            Value::Null
        }
    }
}

fn asset_reference(uuid: &str, expected_type: &str, compact: bool) -> Value {
    AssetRef {
        uuid: if compact { compact_id(uuid) } else { uuid.to_string() },
        expected_type: expected_type.to_string(),
    }
    .to_value()
}

/// Uuid of an array element, wrapped or bare
fn element_uuid(element: &Value) -> Option<&str> {
    unwrap(element)
        .get("uuid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn resolve_array(items: &[Value], element_type: Option<&str>, ctx: &BuildContext) -> Value {
    match element_type {
        Some(NODE_REFERENCE) => items
            .iter()
            .filter_map(element_uuid)
            .map(|uuid| node_reference(uuid, ctx))
            .filter(|v| !v.is_null())
            .collect(),
        Some(asset_type) if is_asset_type(asset_type) => items
            .iter()
            .filter_map(element_uuid)
            .map(|uuid| asset_reference(uuid, asset_type, true))
            .collect(),
        // Open set of engine asset kinds. Elements without a uuid are engine
        // structs (click events and the like) and keep their unwrapped value.
        Some(engine_type) if is_engine_asset_like(engine_type) => items
            .iter()
            .filter_map(|item| match element_uuid(item) {
                Some(uuid) => Some(asset_reference(uuid, engine_type, true)),
                None => Some(unwrap(item).clone()).filter(|v| !v.is_null()),
            })
            .collect(),
        _ => items.iter().map(|item| unwrap(item).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SerializerConfig;
    use serde_json::json;

    const NODE_UUID: &str = "node-aaaa";
    const COMP_UUID: &str = "comp-bbbb";
    const ASSET_UUID: &str = "0123456789abcdef0123456789abcdef";

    fn context() -> BuildContext {
        let mut ctx = BuildContext::new(SerializerConfig::default());
        ctx.register_node(NODE_UUID, 1);
        ctx.register_component(COMP_UUID, 4);
        ctx
    }

    #[test]
    fn test_non_object_passthrough() {
        let ctx = context();
        assert_eq!(resolve(&json!(42), &ctx), json!(42));
        assert_eq!(resolve(&json!("text"), &ctx), json!("text"));
        assert_eq!(resolve(&json!(null), &ctx), json!(null));
    }

    #[test]
    fn test_null_and_empty_uuid() {
        let ctx = context();
        assert_eq!(resolve(&json!({"value": null, "type": "cc.Node"}), &ctx), json!(null));
        assert_eq!(resolve(&json!({"type": "cc.SpriteFrame"}), &ctx), json!(null));
        assert_eq!(
            resolve(&json!({"value": {"uuid": ""}, "type": "cc.SpriteFrame"}), &ctx),
            json!(null)
        );
        assert_eq!(resolve(&json!({"uuid": ""}), &ctx), json!(null));
    }

    #[test]
    fn test_node_reference_resolution() {
        let ctx = context();
        let known = json!({"value": {"uuid": NODE_UUID}, "type": "cc.Node"});
        assert_eq!(resolve(&known, &ctx), json!({"__id__": 1}));

        let unknown = json!({"value": {"uuid": "elsewhere"}, "type": "cc.Node"});
        assert_eq!(resolve(&unknown, &ctx), json!(null));
    }

    #[test]
    fn test_asset_references() {
        let ctx = context();
        let sprite = json!({"value": {"uuid": ASSET_UUID}, "type": "cc.SpriteFrame"});
        assert_eq!(
            resolve(&sprite, &ctx),
            json!({"__uuid__": "01234VniavN7wEjRWeJq83v", "__expectedType__": "cc.SpriteFrame"})
        );

        let prefab = json!({"value": {"uuid": ASSET_UUID}, "type": "cc.Prefab"});
        assert_eq!(
            resolve(&prefab, &ctx),
            json!({"__uuid__": ASSET_UUID, "__expectedType__": "cc.Prefab"})
        );
    }

    #[test]
    fn test_component_references() {
        let ctx = context();
        for tag in ["cc.Component", "cc.Label", "cc.CustomThing"] {
            let known = json!({"value": {"uuid": COMP_UUID}, "type": tag});
            assert_eq!(resolve(&known, &ctx), json!({"__id__": 4}));
        }
        let unknown = json!({"value": {"uuid": "nope"}, "type": "cc.Sprite"});
        assert_eq!(resolve(&unknown, &ctx), json!(null));
    }

    #[test]
    fn test_sub_asset_tags_are_not_components() {
        assert!(!is_component_type("cc.SpriteFrame@f9941"));
        assert!(is_component_type("cc.Widget"));
        assert!(!is_component_type("MyScript"));
    }

    #[test]
    fn test_value_types() {
        let ctx = context();
        let color = json!({"value": {"r": 10, "g": 999, "b": -5}, "type": "cc.Color"});
        assert_eq!(
            resolve(&color, &ctx),
            json!({"__type__": "cc.Color", "r": 10, "g": 255, "b": 0, "a": 255})
        );

        let vec = json!({"value": {"x": "3", "y": null}, "type": "cc.Vec3"});
        assert_eq!(
            resolve(&vec, &ctx),
            json!({"__type__": "cc.Vec3", "x": 3, "y": 0, "z": 0})
        );

        let size = json!({"value": {"width": 120.5, "height": 40}, "type": "cc.Size"});
        assert_eq!(
            resolve(&size, &ctx),
            json!({"__type__": "cc.Size", "width": 120.5, "height": 40})
        );
    }

    #[test]
    fn test_node_arrays_drop_unresolved() {
        let ctx = context();
        let nodes = json!({
            "value": [
                {"value": {"uuid": NODE_UUID}},
                {"uuid": "missing"},
                {"uuid": NODE_UUID}
            ],
            "type": "Array",
            "elementTypeData": {"type": "cc.Node"}
        });
        assert_eq!(resolve(&nodes, &ctx), json!([{"__id__": 1}, {"__id__": 1}]));
    }

    #[test]
    fn test_asset_arrays_always_compact() {
        let ctx = context();
        let frames = json!({
            "value": [{"value": {"uuid": ASSET_UUID}}, {"value": null}],
            "elementTypeData": {"type": "cc.Prefab"}
        });
        assert_eq!(
            resolve(&frames, &ctx),
            json!([{"__uuid__": "01234VniavN7wEjRWeJq83v", "__expectedType__": "cc.Prefab"}])
        );
    }

    #[test]
    fn test_engine_asset_arrays_outside_closed_set() {
        let ctx = context();
        let atlases = json!({
            "value": [{"value": {"uuid": ASSET_UUID}}, {"value": null}, {"uuid": ASSET_UUID}],
            "elementTypeData": {"type": "cc.SpriteAtlas"}
        });
        let atlas = json!({"__uuid__": "01234VniavN7wEjRWeJq83v", "__expectedType__": "cc.SpriteAtlas"});
        assert_eq!(resolve(&atlases, &ctx), json!([atlas.clone(), atlas]));

        let events = json!({
            "value": [{"value": {"handler": "onClick"}}],
            "elementTypeData": {"type": "cc.ClickEvent"}
        });
        assert_eq!(resolve(&events, &ctx), json!([{"handler": "onClick"}]));
    }

    #[test]
    fn test_value_type_arrays_are_not_assets() {
        let ctx = context();
        let points = json!({
            "value": [{"value": {"x": 1, "y": 2}}],
            "elementTypeData": {"type": "cc.Vec2"}
        });
        assert_eq!(resolve(&points, &ctx), json!([{"x": 1, "y": 2}]));
    }

    #[test]
    fn test_plain_arrays_unwrap_elements() {
        let ctx = context();
        let numbers = json!({"value": [{"value": 1}, 2, {"value": "three"}], "type": "Integer"});
        assert_eq!(resolve(&numbers, &ctx), json!([1, 2, "three"]));
    }

    #[test]
    fn test_engine_objects_get_type_marker() {
        let ctx = context();
        let event = json!({"value": {"handler": "onClick"}, "type": "cc.ClickEvent@x"});
        assert_eq!(
            resolve(&event, &ctx),
            json!({"__type__": "cc.ClickEvent@x", "handler": "onClick"})
        );
    }

    #[test]
    fn test_fallback_is_verbatim() {
        let ctx = context();
        assert_eq!(resolve(&json!({"value": "hello", "type": "String"}), &ctx), json!("hello"));
        assert_eq!(resolve(&json!({"value": {"a": 1}, "type": "Object"}), &ctx), json!({"a": 1}));
        assert_eq!(resolve(&json!({"a": 1}), &ctx), json!({"a": 1}));
    }
}
