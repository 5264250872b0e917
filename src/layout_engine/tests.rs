use crate::common::config::Settings;
use crate::layout_engine::{ContainerTree, InsertKind, Orientation};
use crate::model::container::{ContainerConfig, ContainerKind, RenderHandle};
use crate::model::tree::NodeId;

const H: Orientation = Orientation::Horizontal;
const V: Orientation = Orientation::Vertical;

fn leaf(id: &str) -> ContainerConfig {
    ContainerConfig::iframe(format!("https://{id}.test")).id(id)
}

fn simple(id: &str, orientation: Orientation) -> ContainerConfig {
    ContainerConfig::simple(orientation).id(id)
}

fn root(orientation: Orientation) -> ContainerConfig {
    ContainerConfig::root(orientation).id("root")
}

fn build(config: ContainerConfig) -> ContainerTree {
    let tree = ContainerTree::from_config(config).unwrap();
    tree.check_invariants().unwrap();
    tree
}

fn node(tree: &ContainerTree, id: &str) -> NodeId {
    tree.find_by_id(id).unwrap_or_else(|| panic!("no container {id}\n{}", tree.draw_tree()))
}

/// Compact description of the tree, e.g. `root(h)[a, s(v)[b, c]]`.
/// Generated ids of synthesized wrappers print as `~`.
fn shape(tree: &ContainerTree) -> String {
    fn go(tree: &ContainerTree, node: NodeId, out: &mut String) {
        let c = tree.container(node).unwrap();
        let generated = c.kind == ContainerKind::Simple && c.id.as_str().len() == 36;
        out.push_str(if generated { "~" } else { c.id.as_str() });
        let children = tree.children(node);
        if children.is_empty() && c.kind != ContainerKind::Simple && c.kind != ContainerKind::Root
        {
            return;
        }
        out.push_str(match c.orientation {
            Orientation::Horizontal => "(h)[",
            Orientation::Vertical => "(v)[",
        });
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            go(tree, child, out);
        }
        out.push(']');
    }
    let mut out = String::new();
    go(tree, tree.root(), &mut out);
    out
}

fn move_to(tree: &mut ContainerTree, source: &str, target: &str, kind: InsertKind) -> bool {
    let source = node(tree, source);
    let target = node(tree, target);
    let parent = tree.parent(target).unwrap_or(target);
    let index = target.index_in_parent(tree.map()).unwrap_or_default();
    let moved = tree.move_node(source, target, parent, index, kind);
    tree.check_invariants().unwrap();
    moved
}

mod search {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tree() -> ContainerTree {
        build(root(H).children([
            simple("s", V).children([leaf("dup"), leaf("x")]),
            ContainerConfig::iframe("https://late.test").id("dup"),
            ContainerConfig::new(ContainerKind::Wrapper).id("w").child(leaf("y")),
        ]))
    }

    #[test]
    fn first_match_in_document_order() {
        let tree = tree();
        let s = node(&tree, "s");
        let found = tree.find_by_id("dup").unwrap();
        assert_eq!(Some(s), tree.parent(found));
        // The root is visited before `s` and also has a direct child "dup".
        assert_eq!(Some(tree.root()), tree.find_parent_by_id("dup"));
        assert_eq!(None, tree.find_by_id("missing"));
    }

    #[test]
    fn find_by_url() {
        let tree = tree();
        let late = tree.find_by_url("https://late.test").unwrap();
        assert_eq!(Some(tree.root()), tree.parent(late));
        assert_eq!(Some(node(&tree, "y")), tree.find_by_url("https://y.test"));
        assert_eq!(None, tree.find_by_url("https://nowhere.test"));
    }

    #[test]
    fn find_by_kind() {
        let tree = tree();
        assert_eq!(Some(tree.root()), tree.find_first_by_kind(ContainerKind::Root));
        assert_eq!(Some(node(&tree, "w")), tree.find_first_by_kind(ContainerKind::Wrapper));
        assert_eq!(None, tree.find_first_by_kind(ContainerKind::Placeholder));

        let urls: Vec<_> = tree
            .find_all_by_kind(ContainerKind::Iframe)
            .into_iter()
            .map(|n| tree.container(n).unwrap().url().unwrap().to_owned())
            .collect();
        assert_eq!(
            vec![
                "https://dup.test",
                "https://x.test",
                "https://late.test",
                "https://y.test"
            ],
            urls
        );
    }

    #[test]
    fn root_has_no_parent_to_find() {
        let tree = tree();
        assert_eq!(None, tree.find_parent_by_id("root"));
    }
}

mod pruning {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn nested_and_adjacent_empty_containers_go_in_one_pass() {
        let mut tree = build(root(H).children([
            simple("s1", V).children([simple("s2", H), simple("s3", H)]),
            leaf("a"),
            simple("s4", V),
            ContainerConfig::new(ContainerKind::Wrapper).id("w"),
        ]));
        assert_eq!(4, tree.remove_empty_nodes());
        assert_eq!("root(h)[a, w]", shape(&tree));
        assert_eq!(0, tree.remove_empty_nodes());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn empty_root_survives() {
        let mut tree = build(ContainerConfig::simple(H).id("root"));
        assert_eq!(0, tree.remove_empty_nodes());
        assert_eq!(1, tree.len());
    }

    #[test]
    fn collapse_dissolves_whole_chains() {
        let mut tree = build(root(H).children([
            simple("s1", V).child(simple("s2", H).child(simple("s3", V).child(leaf("a")))),
            leaf("b"),
        ]));
        assert_eq!(3, tree.collapse_unnecessary_nesting());
        assert_eq!("root(h)[a, b]", shape(&tree));
        assert_eq!(0, tree.collapse_unnecessary_nesting());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn collapse_spares_wrappers_and_multi_child_containers() {
        let mut tree = build(root(H).children([
            ContainerConfig::new(ContainerKind::Wrapper).id("w").child(leaf("a")),
            simple("s", V).children([leaf("b"), simple("t", H).child(leaf("c"))]),
        ]));
        assert_eq!(1, tree.collapse_unnecessary_nesting());
        assert_eq!("root(h)[w(h)[a], s(v)[b, c]]", shape(&tree));
    }

    #[test]
    fn collapse_keeps_slot_position() {
        let mut tree = build(root(H).children([
            leaf("a"),
            simple("s", V).child(leaf("b")),
            leaf("c"),
        ]));
        tree.collapse_unnecessary_nesting();
        assert_eq!("root(h)[a, b, c]", shape(&tree));
    }

    #[test]
    fn same_orientation_check() {
        let mut tree =
            build(root(H).children([leaf("x"), simple("s", H).children([leaf("a"), leaf("b")])]));
        let s = node(&tree, "s");
        assert!(tree.check_simple_and_clean(s, true));
        assert_eq!("root(h)[x, b, a]", shape(&tree));

        let mut tree = build(root(H).child(simple("s", V).children([leaf("a"), leaf("b")])));
        let s = node(&tree, "s");
        assert!(!tree.check_simple_and_clean(s, false));
        assert!(!tree.check_simple_and_clean(tree.root(), false));
    }
}

mod moving {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn left_into_vertical_pair_with_placeholder_flips_and_merges() {
        let mut tree = build(root(H).children([
            leaf("x"),
            simple("s", V).children([leaf("a"), leaf("b")]),
        ]));
        assert!(move_to(&mut tree, "a", "b", InsertKind::Left));
        assert_eq!("root(h)[x, a, b]", shape(&tree));
        assert_eq!(None, tree.find_first_by_kind(ContainerKind::Placeholder));
    }

    #[test]
    fn flipped_parent_stays_when_ancestor_differs() {
        let mut tree = build(root(V).children([
            leaf("x"),
            simple("s", V).children([leaf("b"), leaf("a")]),
        ]));
        assert!(move_to(&mut tree, "a", "b", InsertKind::Right));
        assert_eq!("root(v)[x, s(h)[b, a]]", shape(&tree));
    }

    #[test]
    fn top_and_bottom_flip_horizontal_pairs() {
        let mut tree = build(root(H).children([
            leaf("x"),
            simple("s", H).children([leaf("a"), leaf("b")]),
        ]));
        assert!(move_to(&mut tree, "a", "b", InsertKind::Top));
        assert_eq!("root(h)[x, s(v)[a, b]]", shape(&tree));

        assert!(move_to(&mut tree, "a", "b", InsertKind::Bottom));
        assert_eq!("root(h)[x, s(v)[b, a]]", shape(&tree));
    }

    #[test]
    fn same_orientation_inserts_beside_target() {
        let mut tree = build(root(H).children([leaf("a"), leaf("b"), leaf("c")]));
        assert!(move_to(&mut tree, "a", "c", InsertKind::Right));
        assert_eq!("root(h)[b, c, a]", shape(&tree));

        assert!(move_to(&mut tree, "a", "b", InsertKind::Left));
        assert_eq!("root(h)[a, b, c]", shape(&tree));
    }

    #[test]
    fn perpendicular_drop_wraps_target() {
        let mut tree = build(root(H).children([
            leaf("a"),
            leaf("b"),
            ContainerConfig::iframe("https://c.test").id("c").ratio(40.0).min_size(10.0),
        ]));
        assert!(move_to(&mut tree, "a", "c", InsertKind::Top));
        assert_eq!("root(h)[b, ~(v)[a, c]]", shape(&tree));

        let wrapper = tree.parent(node(&tree, "c")).unwrap();
        let w = tree.container(wrapper).unwrap();
        assert_eq!(ContainerKind::Simple, w.kind);
        assert_eq!(Some(40.0), w.ratio);
        assert_eq!(Some(10.0), w.min_size);
        assert!(w.content.is_empty());
        assert!(w.drag.is_empty());
        assert_eq!(Some(40.0), tree.container(node(&tree, "c")).unwrap().ratio);

        assert_eq!(vec![60.0, 40.0], tree.allocate(tree.root()).unwrap().widths);
        assert_eq!(vec![60.0, 40.0], tree.allocate(wrapper).unwrap().heights);
    }

    #[test]
    fn wrapper_order_follows_insert_kind() {
        for (kind, expected) in [
            (InsertKind::Top, "root(h)[b, ~(v)[a, c], d]"),
            (InsertKind::Bottom, "root(h)[b, ~(v)[c, a], d]"),
        ] {
            let mut tree = build(root(H).children([leaf("a"), leaf("b"), leaf("c"), leaf("d")]));
            assert!(move_to(&mut tree, "a", "c", kind));
            assert_eq!(expected, shape(&tree), "{kind:?}");
        }
        for (kind, expected) in [
            (InsertKind::Left, "root(v)[b, ~(h)[a, c], d]"),
            (InsertKind::Right, "root(v)[b, ~(h)[c, a], d]"),
        ] {
            let mut tree = build(root(V).children([leaf("a"), leaf("b"), leaf("c"), leaf("d")]));
            assert!(move_to(&mut tree, "a", "c", kind));
            assert_eq!(expected, shape(&tree), "{kind:?}");
        }
    }

    #[test]
    fn dropping_beside_the_root_wraps_it() {
        let mut tree = build(root(V).children([leaf("a"), leaf("b"), leaf("c")]));
        let (a, r) = (node(&tree, "a"), tree.root());
        assert!(tree.move_node(a, r, r, 0, InsertKind::Left));
        tree.check_invariants().unwrap();
        assert_eq!("~(h)[a, root(v)[b, c]]", shape(&tree));
        assert_eq!(None, tree.parent(tree.root()));
    }

    #[test]
    fn emptied_container_collapses_after_move() {
        let mut tree = build(root(H).children([
            leaf("a"),
            simple("s", V).children([leaf("b"), leaf("c")]),
        ]));
        assert!(move_to(&mut tree, "b", "a", InsertKind::Right));
        assert_eq!("root(h)[a, b, c]", shape(&tree));
    }

    #[test]
    fn settings_control_housekeeping() {
        let mut settings = Settings::default();
        settings.tree.collapse_after_move = false;
        let mut tree = ContainerTree::with_settings(
            root(H).children([leaf("a"), simple("s", V).children([leaf("b"), leaf("c")])]),
            &settings,
        )
        .unwrap();
        assert!(move_to(&mut tree, "b", "a", InsertKind::Right));
        assert_eq!("root(h)[a, b, s(v)[c]]", shape(&tree));

        settings.tree.prune_empty_after_move = true;
        let mut tree = ContainerTree::with_settings(
            root(H).children([leaf("a"), simple("s", V).child(leaf("b")), simple("e", H)]),
            &settings,
        )
        .unwrap();
        assert!(move_to(&mut tree, "b", "a", InsertKind::Left));
        assert_eq!("root(h)[b, a]", shape(&tree));
    }

    #[test]
    fn moved_subtree_keeps_identity_and_handle() {
        let handle = RenderHandle::new(String::from("chart"));
        let mut tree = build(root(H).children([
            leaf("a"),
            simple("s", V).children([
                ContainerConfig::component(handle.clone()).id("chart"),
                leaf("b"),
                leaf("c"),
            ]),
        ]));
        let chart = node(&tree, "chart");
        assert!(move_to(&mut tree, "chart", "a", InsertKind::Left));
        assert_eq!("root(h)[chart, a, s(v)[b, c]]", shape(&tree));
        assert_eq!(chart, node(&tree, "chart"));
        assert!(tree.container(chart).unwrap().handle().is_some_and(|h| h.same_as(&handle)));
        assert_eq!(1, tree.to_config().children[0].count());
    }

    #[test]
    fn middle_swaps_handles() {
        let (one, two) = (RenderHandle::new(1u8), RenderHandle::new(2u8));
        let mut tree = build(root(H).children([
            ContainerConfig::component(one.clone()).id("p"),
            ContainerConfig::component(two.clone()).id("q"),
        ]));
        assert!(move_to(&mut tree, "p", "q", InsertKind::Middle));
        let p = tree.container(node(&tree, "p")).unwrap();
        assert!(p.handle().is_some_and(|h| h.same_as(&two)));
        let q = tree.container(node(&tree, "q")).unwrap();
        assert!(q.handle().is_some_and(|h| h.same_as(&one)));
        assert_eq!("root(h)[p, q]", shape(&tree));
    }

    #[test]
    fn moving_into_own_subtree_is_refused() {
        let mut tree = build(root(H).children([
            leaf("a"),
            simple("s", V).children([leaf("b"), simple("t", H).children([leaf("c"), leaf("d")])]),
        ]));
        let before = shape(&tree);
        assert!(!move_to(&mut tree, "s", "c", InsertKind::Left));
        assert!(!move_to(&mut tree, "s", "t", InsertKind::Bottom));
        assert_eq!(before, shape(&tree));
    }

    #[test]
    fn middle_swaps_with_own_descendant() {
        let mut tree = build(root(H).children([
            leaf("a"),
            ContainerConfig::new(ContainerKind::Wrapper)
                .id("w")
                .url("https://w.test")
                .children([leaf("c"), leaf("d")]),
        ]));
        assert!(move_to(&mut tree, "w", "c", InsertKind::Middle));
        assert_eq!(Some("https://c.test"), tree.container(node(&tree, "w")).unwrap().url());
        assert_eq!(Some("https://w.test"), tree.container(node(&tree, "c")).unwrap().url());
        assert_eq!("root(h)[a, w(h)[c, d]]", shape(&tree));
    }

    #[test]
    fn stale_nodes_are_ignored() {
        let mut tree = build(root(H).children([leaf("a"), leaf("b")]));
        let a = node(&tree, "a");
        let b = node(&tree, "b");
        let r = tree.root();
        tree.remove_by_id("a").unwrap();
        assert!(!tree.move_node(a, b, r, 0, InsertKind::Left));
        assert!(!tree.move_node(b, a, r, 0, InsertKind::Left));
        assert_eq!("root(h)[b]", shape(&tree));
    }

    #[test_log::test]
    fn tree_is_drawn_after_move_when_enabled() {
        let mut settings = Settings::default();
        settings.tree.log_tree_after_move = true;
        let mut tree =
            ContainerTree::with_settings(root(H).children([leaf("a"), leaf("b")]), &settings)
                .unwrap();
        // A two-child parent holding the placeholder flips instead of wrapping.
        assert!(move_to(&mut tree, "b", "a", InsertKind::Top));
        assert_eq!("root(v)[b, a]", shape(&tree));
    }

    #[test]
    fn index_past_the_end_is_clamped() {
        let mut tree = build(root(H).children([leaf("a"), leaf("b"), leaf("c")]));
        let (a, c, r) = (node(&tree, "a"), node(&tree, "c"), tree.root());
        assert!(tree.move_node(a, c, r, 42, InsertKind::Left));
        tree.check_invariants().unwrap();
        assert_eq!("root(h)[b, c, a]", shape(&tree));
    }
}
