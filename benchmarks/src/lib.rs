//! Scene snapshot fixtures for the prefab benchmarks

use serde_json::{json, Value};

/// Snapshot of a UI panel `depth` levels deep with `breadth` children per node.
/// Every node carries a transform, a sprite and a label; leaves also carry a
/// button whose target points back at the root.
pub fn ui_panel(depth: usize, breadth: usize) -> Value {
    let mut counter = 0;
    panel_node(depth, breadth, &mut counter)
}

fn panel_node(depth: usize, breadth: usize, counter: &mut usize) -> Value {
    let id = *counter;
    *counter += 1;

    let mut components = vec![
        json!({"type": "cc.UITransform", "uuid": format!("ui-{}", id),
            "properties": {"contentSize": {"value": {"width": 120, "height": 40}}}}),
        json!({"type": "cc.Sprite", "uuid": format!("sprite-{}", id),
            "properties": {
                "spriteFrame": {"type": "cc.SpriteFrame",
                    "value": {"uuid": "0123456789abcdef0123456789abcdef@f9941"}},
                "color": {"value": {"r": 255, "g": 200, "b": 120, "a": 255}}
            }}),
        json!({"type": "cc.Label", "uuid": format!("label-{}", id),
            "properties": {"string": {"value": format!("Item {}", id)}, "fontSize": {"value": 24}}}),
    ];

    let children: Vec<Value> = if depth == 0 {
        components.push(json!({"type": "cc.Button", "uuid": format!("button-{}", id),
            "properties": {"target": {"type": "cc.Node", "value": {"uuid": "node-0"}}}}));
        Vec::new()
    } else {
        (0..breadth)
            .map(|_| panel_node(depth - 1, breadth, counter))
            .collect()
    };

    json!({
        "uuid": format!("node-{}", id),
        "name": {"value": format!("Node{}", id)},
        "position": {"value": {"x": id as f64, "y": 0.5, "z": 0}},
        "scale": {"value": {"x": 1, "y": 1, "z": 1}},
        "children": children,
        "components": components,
    })
}

/// Number of nodes in `ui_panel(depth, breadth)`
pub fn node_count(depth: usize, breadth: usize) -> usize {
    (0..=depth).map(|level| breadth.pow(level as u32)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefab_core::LiveNode;

    #[test]
    fn test_fixture_size() {
        let tree = LiveNode::from_json(ui_panel(2, 3)).unwrap();
        assert_eq!(tree.subtree_len(), node_count(2, 3));
        assert_eq!(node_count(2, 3), 13);
    }
}
