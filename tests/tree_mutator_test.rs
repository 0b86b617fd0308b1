//! Tests for inserts, moves and deletes through MenuTree

use rstest::{fixture, rstest};

use menutree::application::{CrossPartitionPolicy, MenuTree, TreeError};
use menutree::domain::{LinkTarget, MenuEntry, Node, Partition, PathCodec, Position};
use menutree::infrastructure::MemoryStore;
use menutree::util::testing;

type Tree = MenuTree<MemoryStore<MenuEntry>>;

fn entry(title: &str) -> MenuEntry {
    MenuEntry::new(title, format!("/{}", title.to_lowercase()), LinkTarget::SameWindow).unwrap()
}

fn titles(nodes: &[Node<MenuEntry>]) -> Vec<String> {
    nodes.iter().map(|n| n.payload.title.clone()).collect()
}

fn weights(nodes: &[Node<MenuEntry>]) -> Vec<u32> {
    nodes.iter().map(|n| n.sort_weight).collect()
}

/// (path, depth, child_count, sort_weight, title) of every node, in path order.
fn state(tree: &Tree, partition: &Partition) -> Vec<(String, usize, usize, u32, String)> {
    let mut rows = Vec::new();
    for root in tree.root_nodes(partition.id).unwrap() {
        rows.push(root.clone());
        rows.extend(tree.descendants(&root).unwrap());
    }
    let mut rows: Vec<_> = rows
        .into_iter()
        .map(|n| {
            (
                n.path.as_str().to_string(),
                n.depth,
                n.child_count,
                n.sort_weight,
                n.payload.title,
            )
        })
        .collect();
    rows.sort();
    rows
}

fn add_root(tree: &mut Tree, menu: &Partition, title: &str) -> Node<MenuEntry> {
    tree.insert_child(None, menu.id, entry(title)).unwrap()
}

fn add_child(tree: &mut Tree, menu: &Partition, parent: &Node<MenuEntry>, title: &str) -> Node<MenuEntry> {
    tree.insert_child(Some(parent), menu.id, entry(title)).unwrap()
}

/// Menu `menu1` with root children A, B, C.
#[fixture]
fn abc() -> (Tree, Partition) {
    testing::init_test_setup();
    let mut tree = MenuTree::with_store(MemoryStore::new());
    let menu = tree.create_partition("menu1", "Menu one", None).unwrap();
    for title in ["A", "B", "C"] {
        add_root(&mut tree, &menu, title);
    }
    (tree, menu)
}

fn root(tree: &Tree, menu: &Partition, title: &str) -> Node<MenuEntry> {
    tree.root_nodes(menu.id)
        .unwrap()
        .into_iter()
        .find(|n| n.payload.title == title)
        .unwrap()
}

// ============================================================
// Insert
// ============================================================

#[rstest]
fn given_empty_menu_when_inserting_roots_then_paths_and_weights_follow_insertion_order() {
    let mut tree = MenuTree::with_store(MemoryStore::new());
    let menu = tree.create_partition("main", "Main", None).unwrap();

    let a = add_root(&mut tree, &menu, "A");
    let b = add_root(&mut tree, &menu, "B");

    assert_eq!(a.path.as_str(), "0001");
    assert_eq!(b.path.as_str(), "0002");
    assert_eq!(a.depth, 1);
    assert_eq!(weights(&tree.root_nodes(menu.id).unwrap()), vec![0, 1]);
}

#[rstest]
fn given_parent_when_inserting_child_then_parent_child_count_increments(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");

    let a1 = add_child(&mut tree, &menu, &a, "A1");

    assert_eq!(a1.path.as_str(), "00010001");
    assert_eq!(a1.depth, 2);
    assert_eq!(tree.node(a.id).unwrap().child_count, 1);
}

#[rstest]
#[case(Position::Before, vec!["A", "X", "B", "C"])]
#[case(Position::After, vec!["A", "B", "X", "C"])]
fn given_target_when_inserting_sibling_then_lands_next_to_target(
    abc: (Tree, Partition),
    #[case] position: Position,
    #[case] expected: Vec<&str>,
) {
    let (mut tree, menu) = abc;
    let b = root(&tree, &menu, "B");

    tree.insert_relative(&b, position, entry("X")).unwrap();

    let roots = tree.root_nodes(menu.id).unwrap();
    assert_eq!(titles(&roots), expected);
    assert_eq!(weights(&roots), vec![0, 1, 2, 3]);
}

#[rstest]
fn given_parent_with_children_when_inserting_first_child_then_weight_follows_last_child(
    abc: (Tree, Partition),
) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    add_child(&mut tree, &menu, &a, "A1");
    add_child(&mut tree, &menu, &a, "A2");

    let a = tree.node(a.id).unwrap();
    let a0 = tree.insert_relative(&a, Position::FirstChild, entry("A0")).unwrap();

    let a = tree.node(a.id).unwrap();
    let children = tree.children_of(&a).unwrap();
    assert_eq!(titles(&children), vec!["A1", "A2", "A0"]);
    assert_eq!(weights(&children), vec![0, 1, 2]);
    assert_eq!(a0.sort_weight, 2);
    assert_eq!(a.child_count, 3);
}

#[rstest]
fn given_parent_in_other_menu_when_inserting_child_then_partition_mismatch(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let other = tree.create_partition("footer", "Footer", None).unwrap();
    let a = root(&tree, &menu, "A");

    let result = tree.insert_child(Some(&a), other.id, entry("X"));

    assert!(matches!(result, Err(TreeError::PartitionMismatch { .. })));
    assert!(tree.root_nodes(other.id).unwrap().is_empty());
}

#[rstest]
fn given_codec_with_tiny_capacity_when_children_exceed_it_then_path_overflow() {
    let codec = PathCodec::new(1, "012").unwrap();
    let mut tree = MenuTree::new(MemoryStore::new(), codec, CrossPartitionPolicy::Reject);
    let menu = tree.create_partition("main", "Main", None).unwrap();
    add_root(&mut tree, &menu, "A");
    add_root(&mut tree, &menu, "B");

    let result = tree.insert_child(None, menu.id, entry("C"));

    assert!(matches!(
        result,
        Err(TreeError::Domain(menutree::domain::DomainError::PathOverflow { .. }))
    ));
    assert_eq!(tree.root_nodes(menu.id).unwrap().len(), 2);
}

// ============================================================
// Move
// ============================================================

/// Moving A after C reorders the root group to B, C, A with dense weights.
#[rstest]
fn given_abc_when_moving_a_after_c_then_order_is_bca(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let c = root(&tree, &menu, "C");

    tree.move_node(&a, &c, Position::After).unwrap();

    let roots = tree.root_nodes(menu.id).unwrap();
    assert_eq!(titles(&roots), vec!["B", "C", "A"]);
    assert_eq!(weights(&roots), vec![0, 1, 2]);
    // same parent: paths stay
    assert_eq!(tree.node(a.id).unwrap().path.as_str(), "0001");
}

#[rstest]
fn given_abc_when_moving_c_before_a_then_order_is_cab(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let c = root(&tree, &menu, "C");

    tree.move_node(&c, &a, Position::Before).unwrap();

    assert_eq!(titles(&tree.root_nodes(menu.id).unwrap()), vec!["C", "A", "B"]);
}

#[rstest]
fn given_last_child_when_moving_to_last_child_of_same_parent_then_state_unchanged(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    add_child(&mut tree, &menu, &a, "A1");
    let a2 = add_child(&mut tree, &menu, &a, "A2");
    let before = state(&tree, &menu);

    let a = tree.node(a.id).unwrap();
    tree.move_node(&a2, &a, Position::LastChild).unwrap();

    assert_eq!(state(&tree, &menu), before);
}

#[rstest]
fn given_node_when_moving_onto_itself_then_nothing_changes(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let b = root(&tree, &menu, "B");
    let before = state(&tree, &menu);

    tree.move_node(&b, &b, Position::After).unwrap();

    assert_eq!(state(&tree, &menu), before);
}

/// Moving A (with child A1) under B rewrites both paths and shifts depths by one.
#[rstest]
#[case(Position::FirstChild)]
#[case(Position::LastChild)]
fn given_parent_with_children_when_moving_root_in_as_child_then_lands_after_last_child(
    abc: (Tree, Partition),
    #[case] position: Position,
) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    add_child(&mut tree, &menu, &a, "A1");
    add_child(&mut tree, &menu, &a, "A2");
    let c = root(&tree, &menu, "C");
    let a = tree.node(a.id).unwrap();

    tree.move_node(&c, &a, position).unwrap();

    let a = tree.node(a.id).unwrap();
    let children = tree.children_of(&a).unwrap();
    assert_eq!(titles(&children), vec!["A1", "A2", "C"]);
    assert_eq!(weights(&children), vec![0, 1, 2]);
    assert_eq!(a.child_count, 3);
}

#[rstest]
fn given_subtree_when_moving_under_sibling_then_paths_and_depths_follow(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let a1 = add_child(&mut tree, &menu, &a, "A1");
    let b = root(&tree, &menu, "B");
    let (a_depth, a1_depth) = (tree.node(a.id).unwrap().depth, a1.depth);

    let a = tree.node(a.id).unwrap();
    tree.move_node(&a, &b, Position::LastChild).unwrap();

    let a = tree.node(a.id).unwrap();
    let a1 = tree.node(a1.id).unwrap();
    let b = tree.node(b.id).unwrap();
    assert!(a.path.starts_with(&b.path));
    assert!(a1.path.starts_with(&a.path));
    assert_eq!(a.path.as_str(), "00020001");
    assert_eq!(a1.path.as_str(), "000200010001");
    assert_eq!(a.depth, a_depth + 1);
    assert_eq!(a1.depth, a1_depth + 1);
    assert_eq!(b.child_count, 1);
    assert_eq!(a.child_count, 1);

    let roots = tree.root_nodes(menu.id).unwrap();
    assert_eq!(titles(&roots), vec!["B", "C"]);
    assert_eq!(weights(&roots), vec![0, 1]);
}

#[rstest]
fn given_child_when_moving_before_root_then_becomes_root_and_old_parent_shrinks(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let a1 = add_child(&mut tree, &menu, &a, "A1");
    let b = root(&tree, &menu, "B");

    tree.move_node(&a1, &b, Position::Before).unwrap();

    let roots = tree.root_nodes(menu.id).unwrap();
    assert_eq!(titles(&roots), vec!["A", "A1", "B", "C"]);
    assert_eq!(weights(&roots), vec![0, 1, 2, 3]);
    assert_eq!(tree.node(a1.id).unwrap().path.as_str(), "0004");
    assert_eq!(tree.node(a1.id).unwrap().depth, 1);
    assert_eq!(tree.node(a.id).unwrap().child_count, 0);
}

#[rstest]
fn given_subtree_when_moving_below_own_descendant_then_rejected(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let a1 = add_child(&mut tree, &menu, &a, "A1");
    let before = state(&tree, &menu);

    let a = tree.node(a.id).unwrap();
    let result = tree.move_node(&a, &a1, Position::FirstChild);

    assert!(matches!(result, Err(TreeError::InvalidMoveToDescendant { .. })));
    assert_eq!(state(&tree, &menu), before);
}

#[rstest]
fn given_target_in_other_menu_when_moving_then_rejected_by_default(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let other = tree.create_partition("footer", "Footer", None).unwrap();
    let x = add_root(&mut tree, &other, "X");
    let a = root(&tree, &menu, "A");

    let result = tree.move_node(&a, &x, Position::LastChild);

    assert!(matches!(result, Err(TreeError::CrossPartitionMove { .. })));
    assert_eq!(tree.node(a.id).unwrap().partition, menu.id);
    assert_eq!(tree.node(x.id).unwrap().child_count, 0);
}

#[rstest]
fn given_ignore_policy_when_moving_across_menus_then_noop() {
    let mut tree = MenuTree::new(MemoryStore::new(), PathCodec::default(), CrossPartitionPolicy::Ignore);
    let menu = tree.create_partition("main", "Main", None).unwrap();
    let other = tree.create_partition("footer", "Footer", None).unwrap();
    let a = add_root(&mut tree, &menu, "A");
    let x = add_root(&mut tree, &other, "X");
    let (before_main, before_footer) = (state(&tree, &menu), state(&tree, &other));

    tree.move_node(&a, &x, Position::FirstChild).unwrap();

    assert_eq!(state(&tree, &menu), before_main);
    assert_eq!(state(&tree, &other), before_footer);
}

// ============================================================
// Delete
// ============================================================

#[rstest]
fn given_subtree_when_deleting_then_removes_exactly_it_and_compacts_siblings(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let x = add_child(&mut tree, &menu, &a, "X");
    let y = add_child(&mut tree, &menu, &a, "Y");
    add_child(&mut tree, &menu, &y, "Y1");
    add_child(&mut tree, &menu, &a, "Z");

    let removed = tree.delete_subtree(&y).unwrap();

    assert_eq!(removed, 2);
    let a = tree.node(a.id).unwrap();
    assert_eq!(a.child_count, 2);
    let children = tree.children_of(&a).unwrap();
    assert_eq!(titles(&children), vec!["X", "Z"]);
    assert_eq!(weights(&children), vec![0, 1]);
    assert!(matches!(tree.node(y.id), Err(TreeError::TargetNotFound(_))));
    assert_eq!(tree.node(x.id).unwrap().payload.title, "X");
    assert_eq!(tree.store().node_count(), 5);
}

#[rstest]
fn given_root_when_deleting_then_root_group_renumbered(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let b = root(&tree, &menu, "B");

    tree.delete_subtree(&b).unwrap();

    let roots = tree.root_nodes(menu.id).unwrap();
    assert_eq!(titles(&roots), vec!["A", "C"]);
    assert_eq!(weights(&roots), vec![0, 1]);
}

#[rstest]
fn given_deleted_node_when_operating_on_stale_copy_then_target_not_found(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let b = root(&tree, &menu, "B");
    tree.delete_subtree(&a).unwrap();

    assert!(matches!(
        tree.move_node(&a, &b, Position::After),
        Err(TreeError::TargetNotFound(id)) if id == a.id
    ));
    assert!(matches!(tree.delete_subtree(&a), Err(TreeError::TargetNotFound(_))));
    assert!(matches!(
        tree.insert_relative(&a, Position::After, entry("X")),
        Err(TreeError::TargetNotFound(_))
    ));
}

// ============================================================
// Payload, reads
// ============================================================

#[rstest]
fn given_node_when_updating_payload_then_structure_untouched(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let b = root(&tree, &menu, "B");
    let before: Vec<_> = state(&tree, &menu).into_iter().map(|r| (r.0, r.3)).collect();

    let updated = tree
        .update_payload(&b, MenuEntry::new("Blog", "/blog", LinkTarget::NewWindow).unwrap())
        .unwrap();

    assert_eq!(updated.payload.title, "Blog");
    assert_eq!(updated.payload.target, LinkTarget::NewWindow);
    let after: Vec<_> = state(&tree, &menu).into_iter().map(|r| (r.0, r.3)).collect();
    assert_eq!(after, before);
}

#[rstest]
fn given_nested_node_when_resolving_ancestors_then_root_first(abc: (Tree, Partition)) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let a1 = add_child(&mut tree, &menu, &a, "A1");
    let mut a11 = add_child(&mut tree, &menu, &a1, "A11");

    let ancestors = tree.ancestors(&mut a11).unwrap();
    let parent = tree.parent_of(&mut a11).unwrap().unwrap();

    assert_eq!(titles(&ancestors), vec!["A", "A1"]);
    assert_eq!(parent.id, a1.id);
    assert!(a11.parent.is_cached());
}

#[rstest]
fn given_unknown_identifier_when_listing_items_then_empty(abc: (Tree, Partition)) {
    let (tree, _) = abc;

    assert!(tree.items_for("nope").unwrap().is_empty());
    assert_eq!(titles(&tree.items_for("menu1").unwrap()), vec!["A", "B", "C"]);
}

#[rstest]
fn given_leaf_when_listing_children_then_empty_is_valid(abc: (Tree, Partition)) {
    let (tree, menu) = abc;
    let a = root(&tree, &menu, "A");

    assert!(tree.children_of(&a).unwrap().is_empty());
}

#[rstest]
fn given_raw_path_when_malformed_then_domain_error(abc: (Tree, Partition)) {
    let (tree, menu) = abc;

    let err = tree.find_by_path(menu.id, "001").unwrap_err();

    assert!(err.is_malformed_path());
    assert_eq!(tree.find_by_path(menu.id, "0002").unwrap().payload.title, "B");
}

// ============================================================
// Whole-tree invariants after a mixed workload
// ============================================================

#[rstest]
fn given_mixed_operations_when_done_then_depths_match_paths_and_weights_strictly_increase(
    abc: (Tree, Partition),
) {
    let (mut tree, menu) = abc;
    let a = root(&tree, &menu, "A");
    let b = root(&tree, &menu, "B");
    let c = root(&tree, &menu, "C");
    let a1 = add_child(&mut tree, &menu, &a, "A1");
    let a2 = add_child(&mut tree, &menu, &a, "A2");
    add_child(&mut tree, &menu, &a1, "A11");
    tree.insert_relative(&a2, Position::Before, entry("A15")).unwrap();
    tree.move_node(&c, &a1, Position::FirstChild).unwrap();
    tree.move_node(&a2, &b, Position::After).unwrap();
    let a = tree.node(a.id).unwrap();
    tree.move_node(&a, &b, Position::LastChild).unwrap();
    let a1 = tree.node(a1.id).unwrap();
    tree.delete_subtree(&a1).unwrap();

    let step = tree.codec().step_length();
    let mut groups = vec![None];
    while let Some(parent) = groups.pop() {
        let children = match &parent {
            None => tree.root_nodes(menu.id).unwrap(),
            Some(node) => tree.children_of(node).unwrap(),
        };
        if let Some(node) = &parent {
            assert_eq!(node.child_count, children.len(), "child count of {}", node.path);
        }
        assert!(children.windows(2).all(|w| w[0].sort_weight < w[1].sort_weight));
        for child in children {
            assert_eq!(child.depth, child.path.len() / step, "depth of {}", child.path);
            groups.push(Some(child));
        }
    }
    assert!(tree.find_problems(menu.id).unwrap().is_clean());
}
