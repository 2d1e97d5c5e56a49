//! Integration tests - full pipeline from rule text to pulled geometry
//!
//! Exercises the engine facade end to end: stylesheet registration,
//! cascade resolution, dirty tracking and the push/calculate/pull
//! round trip through the flex solver.

use strata_engine::UiEngine;
use strata_style::{Color, Keyword, Length, PropertyId};
use strata_tree::PseudoFlags;

#[test]
fn universal_rule_reaches_late_nodes() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let early = engine.create_node("button").unwrap();
    engine.append_child(root, early).unwrap();

    engine.add_stylesheet("* { width: 150px; }");

    // Added after the sheet loads but before the next pass.
    let late = engine.create_node("label").unwrap();
    engine.append_child(root, late).unwrap();

    engine.layout(800.0, 600.0).unwrap();

    for node in [root, early, late] {
        let bag = engine.resolve_style(node);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(150.0)));
    }
}

#[test]
fn class_scoped_rule() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let styled = engine.create_node("button").unwrap();
    let plain = engine.create_node("button").unwrap();
    engine.append_child(root, styled).unwrap();
    engine.append_child(root, plain).unwrap();
    engine.add_class(styled, "button");

    engine.add_stylesheet(
        ".button { background-color: #ff0000; width: 200px; height: 50px; }",
    );
    engine.layout(800.0, 600.0).unwrap();

    let bag = engine.resolve_style(styled);
    let background = bag.color(PropertyId::BackgroundColor).unwrap();
    assert_eq!(background.to_f32_array(), [1.0, 0.0, 0.0, 1.0]);
    let rect = engine.box_of(styled).unwrap();
    assert_eq!((rect.width, rect.height), (200.0, 50.0));

    let bag = engine.resolve_style(plain);
    assert_eq!(bag.color(PropertyId::BackgroundColor), Some(Color::TRANSPARENT));
    assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));
}

#[test]
fn hover_pseudo_state_gates_width() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let button = engine.create_node("button").unwrap();
    engine.append_child(root, button).unwrap();
    engine.add_class(button, "button");

    engine.add_stylesheet(".button:hover { width: 120px; }");

    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(button).length(PropertyId::Width),
        Some(Length::AUTO)
    );

    engine.set_pseudo(button, PseudoFlags::HOVER, true);
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(button).length(PropertyId::Width),
        Some(Length::px(120.0))
    );
    assert_eq!(engine.box_of(button).unwrap().width, 120.0);

    engine.set_pseudo(button, PseudoFlags::HOVER, false);
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(button).length(PropertyId::Width),
        Some(Length::AUTO)
    );
}

#[test]
fn class_toggle_dirties_leaf_only() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let panel = engine.create_node("panel").unwrap();
    let leaf = engine.create_node("button").unwrap();
    let sibling = engine.create_node("button").unwrap();
    engine.append_child(root, panel).unwrap();
    engine.append_child(panel, leaf).unwrap();
    engine.append_child(panel, sibling).unwrap();

    // Settle every dirty flag.
    engine.layout(800.0, 600.0).unwrap();
    assert!(!engine.tree().get(leaf).unwrap().style_dirty());

    engine.toggle_class(leaf, "selected");
    let tree = engine.tree();
    assert!(tree.get(leaf).unwrap().style_dirty());
    assert!(!tree.get(sibling).unwrap().style_dirty());
    assert!(!tree.get(panel).unwrap().style_dirty());
    assert!(!tree.get(root).unwrap().style_dirty());
}

#[test]
fn scroll_container_round_trip() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let viewport = engine.create_node("panel").unwrap();
    let content = engine.create_node("panel").unwrap();
    engine.append_child(root, viewport).unwrap();
    engine.append_child(viewport, content).unwrap();

    engine.set_inline_style(viewport, Some("width: 400px; height: 300px; overflow: scroll"));
    engine.set_inline_style(
        content,
        Some("flex-direction: column; width: 400px; height: 600px"),
    );

    engine.layout(400.0, 300.0).unwrap();

    assert_eq!(engine.box_of(content).unwrap().height, 600.0);
    // Scrollable extent is child height minus container height.
    let extent = engine.scroll_extent_of(viewport).unwrap();
    assert_eq!(extent.height, 300.0);
    assert_eq!(extent.width, 0.0);
}

#[test]
fn resolve_is_idempotent_when_clean() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let node = engine.create_node("button").unwrap();
    engine.append_child(root, node).unwrap();
    engine.add_stylesheet("button { width: 90px; padding: 4px 8px; }");

    let first = engine.resolve_style(node);
    let second = engine.resolve_style(node);
    assert_eq!(first, second);
}

#[test]
fn inline_style_beats_id_rule() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let node = engine.create_node("button").unwrap();
    engine.append_child(root, node).unwrap();
    engine.set_id(node, Some("send"));
    engine.add_stylesheet("#send { width: 500px; }");
    engine.set_inline_style(node, Some("width: 42px"));

    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(engine.box_of(node).unwrap().width, 42.0);
}

#[test]
fn inherited_color_flows_down() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let panel = engine.create_node("panel").unwrap();
    let label = engine.create_node("label").unwrap();
    engine.append_child(root, panel).unwrap();
    engine.append_child(panel, label).unwrap();
    engine.add_class(panel, "warning");

    engine.add_stylesheet(".warning { color: #ff8800; font-size: 18px; }");

    let bag = engine.resolve_style(label);
    assert_eq!(bag.color(PropertyId::Color), Some(Color::rgb(0xff, 0x88, 0x00)));
    assert_eq!(bag.length(PropertyId::FontSize), Some(Length::px(18.0)));
    // Non-inherited fields stay at their defaults.
    assert_eq!(bag.color(PropertyId::BackgroundColor), Some(Color::TRANSPARENT));
}

#[test]
fn parent_change_refreshes_child_inherited_fields() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let panel = engine.create_node("panel").unwrap();
    let label = engine.create_node("label").unwrap();
    engine.append_child(root, panel).unwrap();
    engine.append_child(panel, label).unwrap();

    engine.add_stylesheet(".hot { color: #ff0000; }");
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(label).color(PropertyId::Color),
        Some(Color::BLACK)
    );

    // Only the panel is touched; the label must still pick up the new
    // inherited color.
    engine.add_class(panel, "hot");
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(label).color(PropertyId::Color),
        Some(Color::rgb(255, 0, 0))
    );
}

#[test]
fn variables_resolve_at_parse_time() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let node = engine.create_node("button").unwrap();
    engine.append_child(root, node).unwrap();

    engine.add_stylesheet(
        r#"
        $gutter: 12px;
        $accent: #3366ff;
        button { margin: $gutter; background-color: $accent; }
        "#,
    );

    let bag = engine.resolve_style(node);
    assert_eq!(bag.length(PropertyId::MarginLeft), Some(Length::px(12.0)));
    assert_eq!(
        bag.color(PropertyId::BackgroundColor),
        Some(Color::rgb(0x33, 0x66, 0xff))
    );
}

#[test]
fn sheet_removal_reverts_styles() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let node = engine.create_node("button").unwrap();
    engine.append_child(root, node).unwrap();

    let sheet = engine.add_stylesheet("button { width: 64px; }");
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(engine.box_of(node).unwrap().width, 64.0);

    assert!(engine.remove_stylesheet(sheet));
    engine.layout(800.0, 600.0).unwrap();
    assert_eq!(
        engine.resolve_style(node).length(PropertyId::Width),
        Some(Length::AUTO)
    );
}

#[test]
fn later_sheet_wins_specificity_tie() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let node = engine.create_node("button").unwrap();
    engine.append_child(root, node).unwrap();
    engine.add_class(node, "chip");

    engine.add_stylesheet(".chip { width: 100px; }");
    engine.add_stylesheet(".chip { width: 140px; }");

    let bag = engine.resolve_style(node);
    assert_eq!(bag.length(PropertyId::Width), Some(Length::px(140.0)));
}

#[test]
fn removal_releases_geometry_and_handles() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let panel = engine.create_node("panel").unwrap();
    let child = engine.create_node("button").unwrap();
    engine.append_child(root, panel).unwrap();
    engine.append_child(panel, child).unwrap();

    engine.layout(800.0, 600.0).unwrap();
    assert!(engine.box_of(child).is_some());

    engine.remove_node(panel).unwrap();
    assert!(engine.box_of(panel).is_none());
    assert!(engine.box_of(child).is_none());
    assert!(engine.tree().get(panel).is_none());

    // The next pass runs cleanly without the removed subtree.
    engine.layout(800.0, 600.0).unwrap();
}

#[test]
fn root_removal_is_rejected() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    assert!(engine.remove_node(root).is_err());
}

#[test]
fn descendant_combinator_with_layout() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let dialog = engine.create_node("dialog").unwrap();
    let row = engine.create_node("row").unwrap();
    let button = engine.create_node("button").unwrap();
    engine.append_child(root, dialog).unwrap();
    engine.append_child(dialog, row).unwrap();
    engine.append_child(row, button).unwrap();

    let stray = engine.create_node("button").unwrap();
    engine.append_child(root, stray).unwrap();

    engine.add_stylesheet("dialog button { width: 88px; height: 24px; }");
    engine.layout(800.0, 600.0).unwrap();

    assert_eq!(engine.box_of(button).unwrap().width, 88.0);
    assert_eq!(
        engine.resolve_style(stray).length(PropertyId::Width),
        Some(Length::AUTO)
    );
}

#[test]
fn geometry_offsets_accumulate() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let outer = engine.create_node("panel").unwrap();
    let inner = engine.create_node("panel").unwrap();
    engine.append_child(root, outer).unwrap();
    engine.append_child(outer, inner).unwrap();

    engine.set_inline_style(
        outer,
        Some("width: 200px; height: 200px; padding: 10px 20px"),
    );
    engine.set_inline_style(inner, Some("width: 50px; height: 40px"));

    engine.layout(400.0, 400.0).unwrap();

    let outer_box = engine.box_of(outer).unwrap();
    let content = engine.content_box_of(outer).unwrap();
    assert_eq!((outer_box.x, outer_box.y), (0.0, 0.0));
    assert_eq!((content.x, content.y), (20.0, 10.0));
    assert_eq!((content.width, content.height), (160.0, 180.0));

    // The child sits at the container's content origin, in absolute
    // coordinates.
    let inner_box = engine.box_of(inner).unwrap();
    assert_eq!((inner_box.x, inner_box.y), (20.0, 10.0));

    assert_eq!(engine.hit_test(25.0, 15.0), Some(inner));
    assert_eq!(engine.hit_test(5.0, 5.0), Some(outer));
}

#[test]
fn display_none_collapses_in_engine() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let hidden = engine.create_node("panel").unwrap();
    let child = engine.create_node("button").unwrap();
    engine.append_child(root, hidden).unwrap();
    engine.append_child(hidden, child).unwrap();

    engine.set_inline_style(hidden, Some("display: none; width: 100px; height: 100px"));
    engine.set_inline_style(child, Some("width: 50px; height: 50px"));
    engine.layout(800.0, 600.0).unwrap();

    assert_eq!(engine.box_of(hidden).unwrap().width, 0.0);
    assert_eq!(engine.box_of(child).unwrap().width, 0.0);

    let bag = engine.resolve_style(hidden);
    assert_eq!(bag.keyword(PropertyId::Display), Some(Keyword::None));
}

#[test]
fn flex_row_distributes_children() {
    let mut engine = UiEngine::new().unwrap();
    let root = engine.root();
    let bar = engine.create_node("toolbar").unwrap();
    engine.append_child(root, bar).unwrap();
    let left = engine.create_node("button").unwrap();
    let right = engine.create_node("button").unwrap();
    engine.append_child(bar, left).unwrap();
    engine.append_child(bar, right).unwrap();

    engine.set_inline_style(bar, Some("width: 300px; height: 40px; gap: 20px"));
    engine.set_inline_style(left, Some("width: 100px"));
    engine.set_inline_style(right, Some("flex-grow: 1"));

    engine.layout(300.0, 40.0).unwrap();

    let left_box = engine.box_of(left).unwrap();
    let right_box = engine.box_of(right).unwrap();
    assert_eq!(left_box.width, 100.0);
    assert_eq!(right_box.x, 120.0);
    assert_eq!(right_box.width, 180.0);
    // align-items defaults to stretch
    assert_eq!(right_box.height, 40.0);
}
