//! Node record builder

use crate::types::{IdRef, LiveNode, NodeRecord};

/// Name used when neither the caller nor the snapshot names the node
pub const FALLBACK_NODE_NAME: &str = "Node";

/// Build the record for one live node.
///
/// Children, components and the metadata link start empty; the tree walker
/// fills them once their indices are known.
pub fn build_node(
    live: &LiveNode,
    parent: Option<IdRef>,
    display_name: Option<&str>,
    default_layer: u32,
) -> NodeRecord {
    let name = display_name
        .or_else(|| live.name())
        .unwrap_or(FALLBACK_NODE_NAME);

    let mut record = NodeRecord::new(name, parent);
    record.active = live.active();
    record.layer = live.layer(default_layer);
    record.position = live.position();
    record.rotation = live.rotation();
    record.scale = live.scale();
    record.euler = live.euler();
    record
}
