use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use trace_trees::layout::LayoutConfig;
use trace_trees::{Engine, TreeConfig, TreeKind};

fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

#[test]
fn bst_snapshot_has_no_engine_fields() {
    let mut tree = TreeConfig::new(TreeKind::Bst).build().unwrap();
    tree.insert(10);
    tree.insert(5);

    assert_eq!(
        parse(&tree.snapshot().to_json().unwrap()),
        json!({
            "kind": "bst",
            "nodes": [
                { "id": 0, "keys": [10], "x": 0.0, "y": 0.0, "state": "default" },
                { "id": 1, "keys": [5], "x": -35.0, "y": 80.0, "state": "default" },
            ],
            "edges": [{ "parent": 0, "child": 1 }],
        })
    );
}

#[test]
fn engine_fields_are_serialized() {
    let mut avl = TreeConfig::new(TreeKind::Avl).build().unwrap();
    avl.insert(1);
    let node = &parse(&avl.snapshot().to_json().unwrap())["nodes"][0];
    assert_eq!(node["height"], json!(1));
    assert_eq!(node["balanceFactor"], json!(0));

    let mut rb = TreeConfig::new(TreeKind::RedBlack).build().unwrap();
    rb.insert(1);
    let snapshot = parse(&rb.snapshot().to_json().unwrap());
    assert_eq!(snapshot["kind"], json!("red-black"));
    assert_eq!(snapshot["nodes"][0]["color"], json!("BLACK"));

    let mut btree = TreeConfig::new(TreeKind::BTree).build().unwrap();
    btree.insert(1);
    btree.insert(2);
    btree.search(&2);
    let node = &parse(&btree.snapshot().to_json().unwrap())["nodes"][0];
    assert_eq!(node["keys"], json!([1, 2]));
    assert_eq!(node["foundKey"], json!(2));
    assert_eq!(node["state"], json!("found"));
}

#[test]
fn traces_serialize_for_renderers() {
    let mut tree = TreeConfig::new(TreeKind::RedBlack).build().unwrap();
    tree.insert(10);
    tree.insert(5);
    let trace = tree.search(&5);

    let kinds: Vec<Value> = parse(&trace.to_json().unwrap())
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["kind"].clone())
        .collect();
    assert_eq!(
        kinds,
        vec![
            json!("highlight"),
            json!("compare"),
            json!("path"),
            json!("highlight"),
            json!("found"),
            json!("success-path"),
        ]
    );

    let last = &parse(&trace.to_json().unwrap())[5];
    assert_eq!(last["message"], json!("Path taken: 10 → 5"));
    assert_eq!(last["nodes"], json!([{ "id": 0, "keys": [10] }, { "id": 1, "keys": [5] }]));
}

#[test]
fn layout_config_is_honored() {
    let config = TreeConfig::from_json(
        r#"{ "kind": "avl", "layout": { "level_height": 100, "node_width": 10, "sibling_gap": 0 } }"#,
    )
    .unwrap();
    assert_eq!(config.layout.key_width, LayoutConfig::default().key_width);

    let mut tree = config.build::<i32>().unwrap();
    for key in [2, 1, 3] {
        tree.insert(key);
    }
    let positions: Vec<_> = tree
        .snapshot()
        .nodes
        .iter()
        .map(|node| (node.keys[0], node.x, node.y))
        .collect();

    assert_eq!(positions, vec![(2, 0.0, 0.0), (1, -5.0, 100.0), (3, 5.0, 100.0)]);
}
