//! Tree walker and build context
//!
//! Walks a live node snapshot and emits the flat record array. Indices are
//! handed out by one monotonic cursor shared by the whole walk:
//!
//! - index 0 is the `cc.Prefab` asset record, index 1 the root node;
//! - a node's children get their indices allocated together, then each child
//!   subtree is filled depth-first in order;
//! - each component is followed immediately by its `cc.CompPrefabInfo`;
//! - a node's `cc.PrefabInfo` comes after everything its subtree allocated.
//!
//! A node is registered by uuid before its children are walked, so a
//! descendant can reference an ancestor, while a reference to a node that has
//! not been visited yet resolves to `null`.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::codec::random_file_tag;
use crate::component::build_component;
use crate::error::PrefabError;
use crate::node::build_node;
use crate::types::{
    CompPrefabInfoRecord, IdRef, LiveNode, PrefabAssetRecord, PrefabInfoRecord, Record,
    SerializerConfig,
};

/// Index of the `cc.Prefab` asset record
pub const ASSET_INDEX: usize = 0;

/// Index of the root node record
pub const ROOT_INDEX: usize = 1;

/// First index handed out by a fresh context
pub const FIRST_FREE_INDEX: usize = 2;

/// Which parts of the live tree to serialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub include_children: bool,
    pub include_components: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_children: true,
            include_components: true,
        }
    }
}

/// Mutable state of one serialization.
///
/// Created per build, threaded through the recursive walk by `&mut`, and
/// consumed by [`BuildContext::finish`].
#[derive(Debug)]
pub struct BuildContext {
    next_index: usize,
    records: Vec<Option<Record>>,
    node_ids: HashMap<String, usize>,
    component_ids: HashMap<String, usize>,
    file_tags: BTreeMap<usize, String>,
    config: SerializerConfig,
}

impl BuildContext {
    pub fn new(config: SerializerConfig) -> Self {
        Self::with_cursor(config, FIRST_FREE_INDEX)
    }

    /// Start the cursor at `next_index` instead of [`FIRST_FREE_INDEX`]
    pub fn with_cursor(config: SerializerConfig, next_index: usize) -> Self {
        Self {
            next_index,
            records: Vec::new(),
            node_ids: HashMap::new(),
            component_ids: HashMap::new(),
            file_tags: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Next index the cursor will hand out
    pub fn cursor(&self) -> usize {
        self.next_index
    }

    /// Hand out the next index
    pub fn allocate(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Make sure slot `index` exists, padding with empty slots
    fn reserve(&mut self, index: usize) {
        if self.records.len() <= index {
            self.records.resize_with(index + 1, || None);
        }
    }

    /// Write `record` into slot `index`
    pub fn place(&mut self, index: usize, record: Record) {
        self.reserve(index);
        self.records[index] = Some(record);
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn register_node(&mut self, uuid: &str, index: usize) {
        self.node_ids.insert(uuid.to_string(), index);
    }

    pub(crate) fn register_component(&mut self, uuid: &str, index: usize) {
        self.component_ids.insert(uuid.to_string(), index);
    }

    pub fn node_index(&self, uuid: &str) -> Option<usize> {
        self.node_ids.get(uuid).copied()
    }

    pub fn component_index(&self, uuid: &str) -> Option<usize> {
        self.component_ids.get(uuid).copied()
    }

    /// File tags of every emitted node, by node index
    pub fn file_tags(&self) -> &BTreeMap<usize, String> {
        &self.file_tags
    }

    /// Check every slot is filled and linked, and hand back the records
    pub fn finish(self) -> Result<BuiltRecords, PrefabError> {
        let mut records = Vec::with_capacity(self.records.len());
        for (index, slot) in self.records.into_iter().enumerate() {
            let record = slot.ok_or(PrefabError::UnfilledSlot(index))?;
            let linked = match &record {
                Record::Node(node) => node.prefab.is_some(),
                Record::Component(component) => component.prefab.is_some(),
                _ => true,
            };
            if !linked {
                return Err(PrefabError::UnlinkedMetadata(index));
            }
            records.push(record);
        }

        Ok(BuiltRecords {
            records,
            node_ids: self.node_ids,
            component_ids: self.component_ids,
            file_tags: self.file_tags,
        })
    }
}

/// Output of a finished build
#[derive(Debug, Clone)]
pub struct BuiltRecords {
    pub records: Vec<Record>,
    pub node_ids: HashMap<String, usize>,
    pub component_ids: HashMap<String, usize>,
    pub file_tags: BTreeMap<usize, String>,
}

/// Serialize `live` and its subtree into `ctx`.
///
/// `own_index` must already be allocated (or be [`ROOT_INDEX`]). The node's
/// slot is reserved immediately; the record itself is written once its
/// child, component and metadata links are known.
pub fn build_tree(
    live: &LiveNode,
    parent: Option<usize>,
    own_index: usize,
    ctx: &mut BuildContext,
    options: WalkOptions,
    display_name: Option<&str>,
) {
    let mut node = build_node(
        live,
        parent.map(IdRef::new),
        display_name,
        ctx.config.default_layer,
    );
    ctx.reserve(own_index);

    let file_tag = match live.uuid() {
        Some(uuid) => {
            ctx.register_node(uuid, own_index);
            uuid.to_string()
        }
        None => random_file_tag(),
    };
    ctx.file_tags.insert(own_index, file_tag.clone());

    if options.include_children && !live.children.is_empty() {
        let child_indices: Vec<usize> = live.children.iter().map(|_| ctx.allocate()).collect();
        node.children = child_indices.iter().copied().map(IdRef::new).collect();

        for (child, &child_index) in live.children.iter().zip(&child_indices) {
            build_tree(child, Some(own_index), child_index, ctx, options, None);
        }
    }

    if options.include_components {
        for live_component in &live.components {
            let component_index = ctx.allocate();
            node.components.push(IdRef::new(component_index));
            if let Some(uuid) = live_component.uuid() {
                ctx.register_component(uuid, component_index);
            }

            let mut component = build_component(live_component, IdRef::new(own_index), ctx);
            ctx.reserve(component_index);

            let info_index = ctx.allocate();
            ctx.place(info_index, Record::ComponentLink(CompPrefabInfoRecord::new(random_file_tag())));
            component.prefab = Some(IdRef::new(info_index));
            ctx.place(component_index, Record::Component(component));
        }
    }

    let info_index = ctx.allocate();
    ctx.place(
        info_index,
        Record::NodeLink(PrefabInfoRecord::new(
            IdRef::new(ROOT_INDEX),
            IdRef::new(ASSET_INDEX),
            file_tag,
        )),
    );
    node.prefab = Some(IdRef::new(info_index));

    tracing::debug!(
        "Serialized node '{}' at {} ({} children, {} components)",
        node.name,
        own_index,
        node.children.len(),
        node.components.len()
    );
    ctx.place(own_index, Record::Node(node));
}

/// A serialized prefab: the flat record array plus build registries
#[derive(Debug, Clone)]
pub struct PrefabDocument {
    pub name: String,
    pub records: Vec<Record>,
    pub node_ids: HashMap<String, usize>,
    pub component_ids: HashMap<String, usize>,
    pub file_tags: BTreeMap<usize, String>,
}

impl PrefabDocument {
    pub fn node_count(&self) -> usize {
        self.file_tags.len()
    }

    pub fn to_value(&self) -> Result<Value, PrefabError> {
        serde_json::to_value(&self.records).map_err(PrefabError::Encode)
    }

    /// Pretty-printed JSON, as the editor writes prefab files
    pub fn to_json(&self) -> Result<String, PrefabError> {
        serde_json::to_string_pretty(&self.records).map_err(PrefabError::Encode)
    }
}

/// Serialize a live node tree into a prefab named `name`
pub fn serialize_prefab(
    root: &LiveNode,
    name: &str,
    options: WalkOptions,
    config: &SerializerConfig,
) -> Result<PrefabDocument, PrefabError> {
    let mut ctx = BuildContext::new(config.clone());
    ctx.place(
        ASSET_INDEX,
        Record::PrefabAsset(PrefabAssetRecord::new(name, IdRef::new(ROOT_INDEX))),
    );
    build_tree(root, None, ROOT_INDEX, &mut ctx, options, Some(name));

    let built = ctx.finish()?;
    tracing::info!(
        "Serialized prefab '{}': {} records, {} nodes",
        name,
        built.records.len(),
        built.file_tags.len()
    );

    Ok(PrefabDocument {
        name: name.to_string(),
        records: built.records,
        node_ids: built.node_ids,
        component_ids: built.component_ids,
        file_tags: built.file_tags,
    })
}

/// Check that every `{"__id__": n}` in a serialized prefab array points at a
/// non-null slot of that array. Returns the number of references checked.
pub fn validate_references(array: &Value) -> Result<usize, PrefabError> {
    let slots = array.as_array().map(Vec::as_slice).unwrap_or_default();
    let mut checked = 0;
    for (index, slot) in slots.iter().enumerate() {
        if slot.is_null() {
            return Err(PrefabError::UnfilledSlot(index));
        }
        check_refs(slot, index, slots, &mut checked)?;
    }
    Ok(checked)
}

fn check_refs(value: &Value, from: usize, slots: &[Value], checked: &mut usize) -> Result<(), PrefabError> {
    match value {
        Value::Object(map) => {
            if let Some(target) = map.get("__id__") {
                let target = target.as_u64().map(|t| t as usize);
                match target {
                    Some(t) if slots.get(t).is_some_and(|slot| !slot.is_null()) => {
                        *checked += 1;
                    }
                    _ => return Err(PrefabError::DanglingReference { from, target: target.unwrap_or(usize::MAX) }),
                }
            }
            map.values().try_for_each(|v| check_refs(v, from, slots, checked))
        }
        Value::Array(items) => items.iter().try_for_each(|v| check_refs(v, from, slots, checked)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;
    use serde_json::json;

    fn live(value: Value) -> LiveNode {
        LiveNode::from_json(value).unwrap()
    }

    fn serialize(value: Value) -> PrefabDocument {
        serialize_prefab(&live(value), "Test", WalkOptions::default(), &SerializerConfig::default()).unwrap()
    }

    fn kinds(doc: &PrefabDocument) -> Vec<RecordKind> {
        doc.records.iter().map(Record::kind).collect()
    }

    #[test]
    fn test_single_node_layout() {
        let doc = serialize(json!({"uuid": "root-uuid", "name": "Ignored"}));
        assert_eq!(kinds(&doc), vec![RecordKind::PrefabAsset, RecordKind::Node, RecordKind::NodeLink]);

        let value = doc.to_value().unwrap();
        assert_eq!(value[0]["__type__"], "cc.Prefab");
        assert_eq!(value[0]["_name"], "Test");
        assert_eq!(value[0]["data"], json!({"__id__": 1}));
        assert_eq!(value[1]["_name"], "Test");
        assert!(value[1]["_parent"].is_null());
        assert_eq!(value[1]["_prefab"], json!({"__id__": 2}));
        assert_eq!(value[2]["root"], json!({"__id__": 1}));
        assert_eq!(value[2]["asset"], json!({"__id__": 0}));
        assert_eq!(value[2]["fileId"], "root-uuid");
    }

    #[test]
    fn test_children_allocated_before_recursion() {
        // root -> [a -> [a1], b]
        let doc = serialize(json!({
            "children": [
                {"name": "a", "children": [{"name": "a1"}]},
                {"name": "b"}
            ]
        }));
        let value = doc.to_value().unwrap();

        // a and b take 2 and 3 before a's subtree is walked
        assert_eq!(value[1]["_children"], json!([{"__id__": 2}, {"__id__": 3}]));
        assert_eq!(value[2]["_name"], "a");
        assert_eq!(value[3]["_name"], "b");
        // a1 at 4, its info at 5, then a's info at 6, b's info at 7, root's at 8
        assert_eq!(value[2]["_children"], json!([{"__id__": 4}]));
        assert_eq!(value[4]["_name"], "a1");
        assert_eq!(value[4]["_parent"], json!({"__id__": 2}));
        assert_eq!(value[4]["_prefab"], json!({"__id__": 5}));
        assert_eq!(value[2]["_prefab"], json!({"__id__": 6}));
        assert_eq!(value[3]["_prefab"], json!({"__id__": 7}));
        assert_eq!(value[1]["_prefab"], json!({"__id__": 8}));
        assert_eq!(doc.records.len(), 9);
    }

    #[test]
    fn test_component_info_follows_component() {
        let doc = serialize(json!({
            "components": [
                {"type": "cc.UITransform"},
                {"type": "cc.Label", "uuid": "label-uuid"}
            ]
        }));
        assert_eq!(
            kinds(&doc),
            vec![
                RecordKind::PrefabAsset,
                RecordKind::Node,
                RecordKind::Component,
                RecordKind::ComponentLink,
                RecordKind::Component,
                RecordKind::ComponentLink,
                RecordKind::NodeLink,
            ]
        );
        let value = doc.to_value().unwrap();
        assert_eq!(value[1]["_components"], json!([{"__id__": 2}, {"__id__": 4}]));
        assert_eq!(value[2]["node"], json!({"__id__": 1}));
        assert_eq!(value[2]["__prefab"], json!({"__id__": 3}));
        assert_eq!(value[4]["__prefab"], json!({"__id__": 5}));
        assert_eq!(value[5]["__type__"], "cc.CompPrefabInfo");
        assert_eq!(value[5]["fileId"].as_str().unwrap().len(), 22);
        assert_eq!(doc.component_ids.get("label-uuid"), Some(&4));
    }

    #[test]
    fn test_root_pointer_is_fixed_at_every_depth() {
        let doc = serialize(json!({
            "children": [{"children": [{"children": [{}]}]}, {}]
        }));
        let value = doc.to_value().unwrap();
        let infos: Vec<&Value> = value
            .as_array()
            .unwrap()
            .iter()
            .filter(|r| r["__type__"] == "cc.PrefabInfo")
            .collect();
        assert_eq!(infos.len(), 5);
        for info in infos {
            assert_eq!(info["root"], json!({"__id__": 1}));
            assert_eq!(info["asset"], json!({"__id__": 0}));
            assert!(info["instance"].is_null());
        }
        assert_eq!(doc.file_tags.len(), 5);
        assert_eq!(doc.node_count(), 5);
    }

    #[test]
    fn test_file_tags_one_per_node() {
        let doc = serialize(json!({
            "uuid": "root",
            "children": [{"uuid": "kid"}, {}],
            "components": [{"type": "cc.Sprite"}]
        }));
        let node_indices: Vec<usize> = doc
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind() == RecordKind::Node)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(doc.file_tags.keys().copied().collect::<Vec<_>>(), node_indices);
        assert_eq!(doc.file_tags[&1], "root");
        assert_eq!(doc.file_tags[&2], "kid");
        assert_eq!(doc.file_tags[&3].len(), 22);
    }

    #[test]
    fn test_no_dangling_references() {
        let doc = serialize(json!({
            "uuid": "root",
            "children": [
                {"uuid": "a", "components": [{"type": "cc.Button", "properties": {
                    "target": {"value": {"uuid": "root"}, "type": "cc.Node"}
                }}]},
                {"uuid": "b", "children": [{"uuid": "b1"}]}
            ],
            "components": [{"type": "cc.UITransform"}]
        }));
        let value = doc.to_value().unwrap();
        let checked = validate_references(&value).unwrap();
        assert!(checked > 10);
    }

    #[test]
    fn test_ancestor_reference_resolves() {
        let doc = serialize(json!({
            "uuid": "root",
            "children": [{
                "uuid": "child",
                "components": [{"type": "cc.Button", "properties": {
                    "target": {"value": {"uuid": "root"}, "type": "cc.Node"}
                }}]
            }]
        }));
        let button = doc.records.iter().find_map(Record::as_component).unwrap();
        assert_eq!(button.fields["_target"], json!({"__id__": 1}));
        assert_eq!(doc.node_ids.get("root"), Some(&1));
    }

    #[test]
    fn test_unvisited_sibling_reference_is_null() {
        // the first child's component points into the third child's subtree
        let doc = serialize(json!({
            "uuid": "root",
            "children": [
                {"uuid": "first", "components": [{"type": "cc.Button", "properties": {
                    "target": {"value": {"uuid": "third-leaf"}, "type": "cc.Node"}
                }}]},
                {"uuid": "second"},
                {"uuid": "third", "children": [{"uuid": "third-leaf"}]}
            ]
        }));
        let button = doc.records.iter().find_map(Record::as_component).unwrap();
        assert!(button.fields["_target"].is_null());
        assert!(doc.node_ids.contains_key("third-leaf"));
        validate_references(&doc.to_value().unwrap()).unwrap();
    }

    #[test]
    fn test_earlier_component_reference_resolves() {
        let doc = serialize(json!({
            "components": [
                {"type": "cc.Label", "uuid": "label-1"},
                {"type": "game.Binder", "properties": {
                    "target": {"type": "cc.Label", "value": {"uuid": "label-1"}}
                }}
            ]
        }));
        let value = doc.to_value().unwrap();

        // root 1, label 2, label info 3, binder 4
        assert_eq!(value[2]["__type__"], "cc.Label");
        assert_eq!(value[4]["__type__"], "game.Binder");
        assert_eq!(value[4]["target"], json!({"__id__": 2}));
        assert_eq!(doc.component_ids["label-1"], 2);
        validate_references(&value).unwrap();
    }

    #[test]
    fn test_later_component_reference_is_null() {
        let doc = serialize(json!({
            "components": [
                {"type": "game.Binder", "properties": {
                    "target": {"type": "cc.Label", "value": {"uuid": "label-later"}}
                }},
                {"type": "cc.Label", "uuid": "label-later"}
            ]
        }));
        let value = doc.to_value().unwrap();

        assert_eq!(value[2]["__type__"], "game.Binder");
        assert!(value[2]["target"].is_null());
        assert_eq!(doc.component_ids["label-later"], 4);
        validate_references(&value).unwrap();
    }

    #[test]
    fn test_second_child_component_color_is_clamped() {
        let doc = serialize(json!({
            "children": [
                {"name": "first"},
                {"name": "second", "components": [{"type": "cc.Sprite", "properties": {
                    "color": {"value": {"r": 10, "g": 999, "b": -5}, "type": "cc.Color"}
                }}]}
            ]
        }));
        let sprite = doc.records.iter().find_map(Record::as_component).unwrap();
        assert_eq!(
            sprite.fields["_color"],
            json!({"__type__": "cc.Color", "r": 10, "g": 255, "b": 0, "a": 255})
        );
    }

    #[test]
    fn test_excluding_children_and_components() {
        let options = WalkOptions {
            include_children: false,
            include_components: false,
        };
        let doc = serialize_prefab(
            &live(json!({"children": [{}, {}], "components": [{"type": "cc.Sprite"}]})),
            "Flat",
            options,
            &SerializerConfig::default(),
        )
        .unwrap();
        assert_eq!(kinds(&doc), vec![RecordKind::PrefabAsset, RecordKind::Node, RecordKind::NodeLink]);
        let root = doc.records[1].as_node().unwrap();
        assert!(root.children.is_empty());
        assert!(root.components.is_empty());
    }

    #[test]
    fn test_walk_is_structurally_idempotent() {
        let tree = live(json!({
            "uuid": "root",
            "children": [{"children": [{}]}, {"uuid": "b", "components": [{"type": "cc.Label"}]}]
        }));

        let run = || {
            let mut ctx = BuildContext::with_cursor(SerializerConfig::default(), 10);
            build_tree(&tree, None, 9, &mut ctx, WalkOptions::default(), None);
            let cursor = ctx.cursor();
            let mut value = serde_json::to_value(
                ctx.records.iter().map(|r| r.as_ref().map(|r| serde_json::to_value(r).unwrap())).collect::<Vec<_>>(),
            )
            .unwrap();
            // random tags may differ between runs
            for slot in value.as_array_mut().unwrap() {
                if let Some(obj) = slot.as_object_mut() {
                    obj.remove("fileId");
                }
            }
            (cursor, value)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_cursor_only_moves_forward() {
        let mut ctx = BuildContext::new(SerializerConfig::default());
        let a = ctx.allocate();
        let b = ctx.allocate();
        assert_eq!((a, b), (2, 3));
        assert_eq!(ctx.cursor(), 4);
    }

    #[test]
    fn test_finish_rejects_gaps() {
        let mut ctx = BuildContext::new(SerializerConfig::default());
        ctx.place(3, Record::ComponentLink(CompPrefabInfoRecord::new("x")));
        assert!(matches!(ctx.finish(), Err(PrefabError::UnfilledSlot(0))));
    }

    #[test]
    fn test_validate_references_detects_dangling() {
        let array = json!([
            {"__type__": "cc.Prefab", "data": {"__id__": 1}},
            {"__type__": "cc.Node", "_children": [{"__id__": 7}]}
        ]);
        assert!(matches!(
            validate_references(&array),
            Err(PrefabError::DanglingReference { from: 1, target: 7 })
        ));
    }
}
