//! Component record builder
//!
//! Every component record carries the shared header (type, owner node,
//! enabled flag, metadata link). The four built-in UI types then get their
//! full default field sets with live overrides; any other type only copies
//! the allow-listed properties.

use serde_json::{json, Map, Value};

use crate::transducer::{resolve, ValueType};
use crate::types::{
    to_json, Color, ComponentRecord, IdRef, LiveComponent, Size, Vec2, COMPONENT_HEADER_KEYS,
};
use crate::walker::BuildContext;

/// Component types with a dedicated builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    UiTransform,
    Sprite,
    Button,
    Label,
    Other,
}

impl ComponentKind {
    pub fn from_tag(type_tag: &str) -> Self {
        match type_tag {
            "cc.UITransform" => ComponentKind::UiTransform,
            "cc.Sprite" => ComponentKind::Sprite,
            "cc.Button" => ComponentKind::Button,
            "cc.Label" => ComponentKind::Label,
            _ => ComponentKind::Other,
        }
    }
}

/// Collects serialized fields, preferring live values over defaults
struct Fields<'a> {
    live: &'a LiveComponent,
    ctx: &'a BuildContext,
    out: Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(live: &'a LiveComponent, ctx: &'a BuildContext) -> Self {
        Self { live, ctx, out: Map::new() }
    }

    /// Resolved live property, if present and non-null
    fn live_value(&self, property: &str) -> Option<Value> {
        self.live
            .property(property)
            .map(|descriptor| resolve(descriptor, self.ctx))
            .filter(|v| !v.is_null())
    }

    /// Write `key` from `property`, or `default`
    fn pull(&mut self, key: &str, property: &str, default: Value) -> &mut Self {
        let value = self.live_value(property).unwrap_or(default);
        self.out.insert(key.to_string(), value);
        self
    }

    /// Like [`Fields::pull`], but untyped objects are rebuilt as `value_type`
    fn pull_typed(&mut self, key: &str, property: &str, value_type: ValueType, default: Value) -> &mut Self {
        let value = match self.live_value(property) {
            Some(v) if v.is_object() && v.get("__type__").is_none() => value_type.build(&v),
            Some(v) => v,
            None => default,
        };
        self.out.insert(key.to_string(), value);
        self
    }

    fn fixed(&mut self, key: &str, value: Value) -> &mut Self {
        self.out.insert(key.to_string(), value);
        self
    }

    fn finish(self) -> Map<String, Value> {
        self.out
    }
}

/// Build one component record owned by the node at `owner`.
///
/// The returned record's `__prefab` link is empty; the tree walker fills it
/// after emitting the `cc.CompPrefabInfo` record right behind it.
pub fn build_component(live: &LiveComponent, owner: IdRef, ctx: &BuildContext) -> ComponentRecord {
    let type_tag = live.type_tag();
    let mut record = ComponentRecord::new(type_tag, owner, live.enabled());

    record.fields = match ComponentKind::from_tag(type_tag) {
        ComponentKind::UiTransform => ui_transform_fields(live, ctx),
        ComponentKind::Sprite => sprite_fields(live, ctx),
        ComponentKind::Button => button_fields(live, ctx),
        ComponentKind::Label => label_fields(live, ctx),
        ComponentKind::Other => generic_fields(live, ctx),
    };

    tracing::debug!("Built {} with {} fields", type_tag, record.fields.len());
    record
}

fn color(r: f64, g: f64, b: f64, a: f64) -> Value {
    to_json(&Color::new(r, g, b, a))
}

fn white() -> Value {
    to_json(&Color::white())
}

fn ui_transform_fields(live: &LiveComponent, ctx: &BuildContext) -> Map<String, Value> {
    let mut fields = Fields::new(live, ctx);
    fields
        .pull_typed("_contentSize", "contentSize", ValueType::Size, to_json(&Size::new(100.0, 100.0)))
        .pull_typed("_anchorPoint", "anchorPoint", ValueType::Vec2, to_json(&Vec2::new(0.5, 0.5)));
    fields.finish()
}

fn sprite_fields(live: &LiveComponent, ctx: &BuildContext) -> Map<String, Value> {
    let mut fields = Fields::new(live, ctx);
    fields
        .pull("_customMaterial", "customMaterial", Value::Null)
        .fixed("_srcBlendFactor", json!(2))
        .fixed("_dstBlendFactor", json!(4))
        .pull_typed("_color", "color", ValueType::Color, white())
        .pull("_spriteFrame", "spriteFrame", Value::Null)
        .pull("_type", "type", json!(0))
        .pull("_fillType", "fillType", json!(0))
        .pull("_sizeMode", "sizeMode", json!(1))
        .pull_typed("_fillCenter", "fillCenter", ValueType::Vec2, to_json(&Vec2::new(0.0, 0.0)))
        .pull("_fillStart", "fillStart", json!(0))
        .pull("_fillRange", "fillRange", json!(0))
        .pull("_isTrimmedMode", "trim", json!(true))
        .pull("_useGrayscale", "grayscale", json!(false))
        .fixed("_atlas", Value::Null);
    fields.finish()
}

fn button_fields(live: &LiveComponent, ctx: &BuildContext) -> Map<String, Value> {
    let mut fields = Fields::new(live, ctx);
    fields
        .fixed("clickEvents", json!([]))
        .pull("_interactable", "interactable", json!(true))
        .pull("_transition", "transition", json!(3))
        .pull_typed("_normalColor", "normalColor", ValueType::Color, color(214.0, 214.0, 214.0, 255.0))
        .pull_typed("_hoverColor", "hoverColor", ValueType::Color, color(211.0, 211.0, 211.0, 255.0))
        .pull_typed("_pressedColor", "pressedColor", ValueType::Color, white())
        .pull_typed("_disabledColor", "disabledColor", ValueType::Color, color(124.0, 124.0, 124.0, 255.0))
        .pull("_normalSprite", "normalSprite", Value::Null)
        .pull("_hoverSprite", "hoverSprite", Value::Null)
        .pull("_pressedSprite", "pressedSprite", Value::Null)
        .pull("_disabledSprite", "disabledSprite", Value::Null)
        .pull("_duration", "duration", json!(0.1))
        .pull("_zoomScale", "zoomScale", json!(1.2))
        .pull("_target", "target", Value::Null);
    fields.finish()
}

fn label_fields(live: &LiveComponent, ctx: &BuildContext) -> Map<String, Value> {
    let mut fields = Fields::new(live, ctx);
    let font_size = fields.live_value("fontSize").unwrap_or_else(|| json!(20));
    fields
        .pull("_string", "string", json!("label"))
        .pull("_horizontalAlign", "horizontalAlign", json!(1))
        .pull("_verticalAlign", "verticalAlign", json!(1))
        .fixed("_actualFontSize", font_size.clone())
        .fixed("_fontSize", font_size)
        .pull("_fontFamily", "fontFamily", json!("Arial"))
        .pull("_lineHeight", "lineHeight", json!(25))
        .pull("_overflow", "overflow", json!(0))
        .pull("_enableWrapText", "enableWrapText", json!(true))
        .pull("_font", "font", Value::Null)
        .pull("_isSystemFontUsed", "isSystemFontUsed", json!(true))
        .fixed("_spacingX", json!(0))
        .fixed("_isItalic", json!(false))
        .fixed("_isBold", json!(false))
        .fixed("_isUnderline", json!(false))
        .fixed("_underlineHeight", json!(2))
        .pull("_cacheMode", "cacheMode", json!(0))
        .pull_typed("_color", "color", ValueType::Color, white());
    fields.finish()
}

/// Copy only allow-listed properties, in snapshot order. Header keys are
/// never copied even when allow-listed.
fn generic_fields(live: &LiveComponent, ctx: &BuildContext) -> Map<String, Value> {
    let allowed = &ctx.config().generic_fields;
    live.properties
        .iter()
        .filter(|(key, _)| allowed.iter().any(|a| a == *key))
        .filter(|(key, _)| {
            let reserved = COMPONENT_HEADER_KEYS.contains(&key.as_str());
            if reserved {
                tracing::warn!("Skipping property '{}' on {}: it is a record header key", key, live.type_tag());
            }
            !reserved
        })
        .map(|(key, descriptor)| (key.clone(), resolve(descriptor, ctx)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SerializerConfig;

    fn component(value: Value) -> LiveComponent {
        serde_json::from_value(value).unwrap()
    }

    fn ctx() -> BuildContext {
        BuildContext::new(SerializerConfig::default())
    }

    #[test]
    fn test_shared_header() {
        let live = component(json!({"type": "cc.UITransform", "enabled": {"value": false}}));
        let record = build_component(&live, IdRef::new(1), &ctx());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["__type__"], "cc.UITransform");
        assert_eq!(value["_name"], "");
        assert_eq!(value["node"], json!({"__id__": 1}));
        assert_eq!(value["_enabled"], false);
        assert!(value["__prefab"].is_null());
        assert_eq!(value["_id"], "");
    }

    #[test]
    fn test_ui_transform_defaults_and_overrides() {
        let defaults = build_component(&component(json!({"type": "cc.UITransform"})), IdRef::new(1), &ctx());
        assert_eq!(
            defaults.fields["_contentSize"],
            json!({"__type__": "cc.Size", "width": 100, "height": 100})
        );
        assert_eq!(
            defaults.fields["_anchorPoint"],
            json!({"__type__": "cc.Vec2", "x": 0.5, "y": 0.5})
        );

        let live = component(json!({
            "type": "cc.UITransform",
            "properties": {
                "contentSize": {"value": {"width": 300, "height": 80}, "type": "cc.Size"},
                "anchorPoint": {"value": {"x": 0, "y": 1}}
            }
        }));
        let record = build_component(&live, IdRef::new(1), &ctx());
        assert_eq!(
            record.fields["_contentSize"],
            json!({"__type__": "cc.Size", "width": 300, "height": 80})
        );
        assert_eq!(
            record.fields["_anchorPoint"],
            json!({"__type__": "cc.Vec2", "x": 0, "y": 1})
        );
    }

    #[test]
    fn test_sprite_color_is_clamped() {
        let live = component(json!({
            "type": "cc.Sprite",
            "properties": {
                "color": {"value": {"r": 10, "g": 999, "b": -5}, "type": "cc.Color"},
                "sizeMode": {"value": 0, "type": "Enum"}
            }
        }));
        let record = build_component(&live, IdRef::new(1), &ctx());
        assert_eq!(
            record.fields["_color"],
            json!({"__type__": "cc.Color", "r": 10, "g": 255, "b": 0, "a": 255})
        );
        assert_eq!(record.fields["_sizeMode"], json!(0));
        assert_eq!(record.fields["_srcBlendFactor"], json!(2));
        assert!(record.fields["_spriteFrame"].is_null());
    }

    #[test]
    fn test_sprite_field_order() {
        let record = build_component(&component(json!({"type": "cc.Sprite"})), IdRef::new(1), &ctx());
        let keys: Vec<&str> = record.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.first(), Some(&"_customMaterial"));
        assert_eq!(keys.last(), Some(&"_atlas"));
        assert_eq!(keys.len(), 14);
    }

    #[test]
    fn test_button_target_resolves_registered_node() {
        let mut ctx = ctx();
        ctx.register_node("target-node", 1);
        let live = component(json!({
            "type": "cc.Button",
            "properties": {
                "target": {"value": {"uuid": "target-node"}, "type": "cc.Node"},
                "zoomScale": {"value": 1.1}
            }
        }));
        let record = build_component(&live, IdRef::new(2), &ctx);
        assert_eq!(record.fields["_target"], json!({"__id__": 1}));
        assert_eq!(record.fields["_zoomScale"], json!(1.1));
        assert_eq!(record.fields["clickEvents"], json!([]));
        assert_eq!(record.fields["_normalColor"]["r"], json!(214));
    }

    #[test]
    fn test_label_font_size_mirrors_actual_size() {
        let live = component(json!({
            "__type__": "cc.Label",
            "properties": {
                "string": {"value": "Play"},
                "fontSize": {"value": 32, "type": "Number"}
            }
        }));
        let record = build_component(&live, IdRef::new(1), &ctx());
        assert_eq!(record.fields["_string"], json!("Play"));
        assert_eq!(record.fields["_fontSize"], json!(32));
        assert_eq!(record.fields["_actualFontSize"], json!(32));
        assert_eq!(record.fields["_fontFamily"], json!("Arial"));
    }

    #[test]
    fn test_generic_components_copy_only_allow_list() {
        let live = component(json!({
            "type": "game.Spinner",
            "properties": {
                "color": {"value": {"r": 1, "g": 2, "b": 3, "a": 4}, "type": "cc.Color"},
                "_liveHandle": {"value": 12345},
                "speed": {"value": 3}
            }
        }));
        let record = build_component(&live, IdRef::new(1), &ctx());
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields["color"]["a"], json!(4));

        let config = SerializerConfig {
            generic_fields: vec!["speed".to_string()],
            ..Default::default()
        };
        let record = build_component(&live, IdRef::new(1), &BuildContext::new(config));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields["speed"], json!(3));
    }

    #[test]
    fn test_generic_fields_never_shadow_header_keys() {
        let live = component(json!({
            "type": "game.Mover",
            "properties": {
                "node": {"value": {"uuid": "elsewhere"}, "type": "cc.Node"},
                "_id": {"value": "abc"},
                "speed": {"value": 2}
            }
        }));
        let config = SerializerConfig {
            generic_fields: vec!["node".to_string(), "_id".to_string(), "speed".to_string()],
            ..Default::default()
        };
        let record = build_component(&live, IdRef::new(1), &BuildContext::new(config));
        assert_eq!(record.fields.keys().collect::<Vec<_>>(), vec!["speed"]);

        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text.matches("\"node\"").count(), 1);
        assert_eq!(text.matches("\"_id\"").count(), 1);
        assert!(text.contains("\"node\":{\"__id__\":1}"));
        assert!(text.contains("\"_id\":\"\""));
    }
}
