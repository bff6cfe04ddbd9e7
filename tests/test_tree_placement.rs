mod common;

use bitgpt_core::catalog::MATRIX_TREE_CAPACITY;
use bitgpt_core::model::Program;
use bitgpt_core::tree::MatrixTrees;

use common::Harness;

// ── Binary: strict BFS fill and the tree queries behind it ──────────

#[test]
fn binary_slot_trees_fill_breadth_first() {
    let mut h = Harness::new();
    h.join_binary("a", "mother");
    h.join_binary("b", "a");
    h.join_binary("c", "a");
    h.join_binary("d", "a");

    let trees = &h.engine.binary_trees;
    // Slot-1 tree: b and c take a's two positions, d spills to a's first
    // child by BFS.
    assert_eq!(trees.bfs_index_under(1, "a", "b"), Some(0));
    assert_eq!(trees.bfs_index_under(1, "a", "c"), Some(1));
    assert_eq!(trees.bfs_index_under(1, "a", "d"), Some(2));
    assert_eq!(trees.bfs_index_under(1, "a", "nobody"), None);

    assert_eq!(trees.subtree_count(1, "a"), 3);
    assert_eq!(trees.count_at_depth(1, "a", 1), 2);
    assert_eq!(trees.count_at_depth(1, "a", 2), 1);

    let d = trees.node(1, "d").expect("d placed");
    assert_eq!(d.parent_id, "b");
    assert_eq!(d.position, 0);
    assert_eq!(trees.ancestor(1, "d", 2), Some("a".to_string()));
    assert_eq!(trees.level_of(1, "d", "a"), Some(2));

    // The view total matches the subtree.
    assert_eq!(
        h.engine.tree_total(Program::Binary, "a", 1).expect("total"),
        3
    );
    let page = h
        .engine
        .tree_view(Program::Binary, "a", 1, 0, 2)
        .expect("page");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].user_id, "b");
    assert_eq!(page[1].user_id, "c");
}

// ── Sweepover: placement climbs past uplines without the slot ───────

#[test]
fn sweepover_skips_uplines_without_the_slot() {
    let mut h = Harness::new();
    h.join_matrix("carol", "mother");
    h.join_matrix("dan", "carol");

    // Dan upgrades to slot 2; Carol holds slot 1 only, so the placement
    // sweeps up to Mother.
    let ts = h.ts();
    h.engine
        .upgrade("dan", Program::Matrix, 2, 22.0, None, ts)
        .expect("upgrade");

    assert!(h.engine.matrix_trees.member_index("mother", 2, "dan").is_some());
    assert!(!h.engine.matrix_trees.has_tree("carol", 2));
    // The upgrade opened Dan's own slot-2 tree.
    assert!(h.engine.matrix_trees.has_tree("dan", 2));
}

// ── Matrix: strict BFS order and the 39-member cap (I5) ─────────────

#[test]
fn matrix_generations_cap_at_thirty_nine() {
    let mut trees = MatrixTrees::new();
    trees.ensure_tree("owner", 1);
    for i in 0..MATRIX_TREE_CAPACITY {
        let name = format!("m{i}");
        assert!(trees.commit_place("owner", 1, &name, i as u64).is_some());
    }
    assert_eq!(trees.member_count("owner", 1), MATRIX_TREE_CAPACITY);
    assert!(
        trees.preview_place("owner", 1).is_none(),
        "a full generation refuses further placement"
    );

    // Level 1 fills first, then pairs off under the earliest members.
    let members = trees
        .current_generation("owner", 1)
        .expect("tree")
        .members("owner");
    assert_eq!(members[0].parent_id, "owner");
    assert_eq!(members[2].position, 2);
    assert_eq!(members[3].parent_id, "m0");
    assert_eq!(members[4].position, 1);
    assert_eq!(members[12].parent_id, "m3");
}
