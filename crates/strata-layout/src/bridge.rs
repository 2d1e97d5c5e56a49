//! Layout synchronization bridge
//!
//! Two-phase protocol against the external flex engine (taffy): push
//! resolved property bags onto engine nodes, run one `compute_layout`
//! per pass, then pull computed geometry back in tree child order. The
//! bridge owns the 1:1 handle table; handles are created when a UI node
//! registers and released exactly once when it is destroyed, in the same
//! operation as the tree mutation.

use std::collections::HashMap;

use strata_style::{Keyword, Length, PropertyBag, PropertyId, Unit};
use strata_tree::{NodeId, Tree};
use taffy::{AvailableSpace, TaffyTree};
use thiserror::Error;
use tracing::{debug, trace};

use crate::geometry::{Rect, Size};

/// Bridge failure. Engine-reported errors are stringly wrapped; the
/// engine type stays out of the public surface.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("node {0:?} has no layout handle")]
    UnknownNode(NodeId),
    #[error("node {0:?} is already registered")]
    AlreadyRegistered(NodeId),
    #[error("flex engine error: {0}")]
    Engine(String),
}

/// Geometry pulled back for one node after a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxGeometry {
    /// Border box in absolute coordinates.
    pub border_box: Rect,
    /// Inner box (border box inset by resolved padding).
    pub content_box: Rect,
    /// Overflowing content beyond the border box. Meaningful for
    /// `overflow: scroll` containers; zero when content fits.
    pub scroll_extent: Size,
}

/// Pass phases. `calculate` is not reentrant; out-of-order calls are
/// programming errors and panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Idle,
    Pushing,
    Calculated,
}

/// Owns the external engine instance, the handle table and the pulled
/// geometry.
pub struct LayoutBridge {
    engine: TaffyTree<()>,
    handles: HashMap<NodeId, taffy::NodeId>,
    boxes: HashMap<NodeId, BoxGeometry>,
    state: PassState,
}

impl Default for LayoutBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutBridge {
    pub fn new() -> Self {
        Self {
            engine: TaffyTree::new(),
            handles: HashMap::new(),
            boxes: HashMap::new(),
            state: PassState::Idle,
        }
    }

    fn handle(&self, node: NodeId) -> Result<taffy::NodeId, LayoutError> {
        self.handles
            .get(&node)
            .copied()
            .ok_or(LayoutError::UnknownNode(node))
    }

    /// Create the engine-side twin for a new UI node.
    pub fn register(&mut self, node: NodeId) -> Result<(), LayoutError> {
        debug_assert_eq!(self.state, PassState::Idle);
        if self.handles.contains_key(&node) {
            return Err(LayoutError::AlreadyRegistered(node));
        }
        let handle = self
            .engine
            .new_leaf(taffy::Style::default())
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))?;
        self.handles.insert(node, handle);
        Ok(())
    }

    /// Mirror a tree insertion on the engine side. Must run in the same
    /// operation as the tree mutation so both child orders stay equal.
    pub fn link_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<(), LayoutError> {
        debug_assert_eq!(self.state, PassState::Idle);
        let parent_handle = self.handle(parent)?;
        let child_handle = self.handle(child)?;
        self.engine
            .insert_child_at_index(parent_handle, index, child_handle)
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))
    }

    /// Mirror a tree detach on the engine side.
    pub fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        debug_assert_eq!(self.state, PassState::Idle);
        let parent_handle = self.handle(parent)?;
        let child_handle = self.handle(child)?;
        self.engine
            .remove_child(parent_handle, child_handle)
            .map(|_| ())
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))
    }

    /// Free a destroyed node's engine handle. Exactly once per node.
    pub fn release(&mut self, node: NodeId) -> Result<(), LayoutError> {
        debug_assert_eq!(self.state, PassState::Idle);
        let handle = self
            .handles
            .remove(&node)
            .ok_or(LayoutError::UnknownNode(node))?;
        self.boxes.remove(&node);
        self.engine
            .remove(handle)
            .map(|_| ())
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))
    }

    pub fn is_registered(&self, node: NodeId) -> bool {
        self.handles.contains_key(&node)
    }

    /// Begin a layout pass. Panics if a pass is already in progress.
    pub fn begin_pass(&mut self) {
        assert_eq!(
            self.state,
            PassState::Idle,
            "layout pass already in progress"
        );
        self.state = PassState::Pushing;
    }

    /// Push a resolved bag onto the engine node. Called once per
    /// style-dirty node per pass, between `begin_pass` and `calculate`.
    ///
    /// `in_scroll_container` applies the solver's scroll-container rule:
    /// children of an `overflow: scroll` node keep their size instead of
    /// shrinking to fit, so overflow becomes scrollable extent.
    pub fn push_to_engine(
        &mut self,
        node: NodeId,
        bag: &PropertyBag,
        in_scroll_container: bool,
    ) -> Result<(), LayoutError> {
        assert_eq!(
            self.state,
            PassState::Pushing,
            "push outside the push phase"
        );
        let handle = self.handle(node)?;
        let style = style_from_bag(bag, in_scroll_container);
        trace!(node = ?node, "push style");
        self.engine
            .set_style(handle, style)
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))
    }

    /// Run the solver once for the whole pass. Panics when invoked
    /// outside the push phase or twice in one pass.
    pub fn calculate(&mut self, root: NodeId, width: f32, height: f32) -> Result<(), LayoutError> {
        assert_eq!(
            self.state,
            PassState::Pushing,
            "calculate invoked outside an active push phase"
        );
        let handle = self.handle(root)?;
        self.engine
            .compute_layout(
                handle,
                taffy::Size {
                    width: AvailableSpace::Definite(width),
                    height: AvailableSpace::Definite(height),
                },
            )
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))?;
        self.state = PassState::Calculated;
        debug!(width, height, "layout calculated");
        Ok(())
    }

    /// Read geometry back for `node` and its subtree, recursing in the
    /// tree's child order (which matches the engine's by construction).
    pub fn pull_from_engine(
        &mut self,
        tree: &Tree,
        node: NodeId,
        parent_x: f32,
        parent_y: f32,
    ) -> Result<(), LayoutError> {
        assert_eq!(
            self.state,
            PassState::Calculated,
            "pull before calculate"
        );
        self.pull_node(tree, node, parent_x, parent_y)
    }

    fn pull_node(
        &mut self,
        tree: &Tree,
        node: NodeId,
        parent_x: f32,
        parent_y: f32,
    ) -> Result<(), LayoutError> {
        let handle = self.handle(node)?;
        let layout = *self
            .engine
            .layout(handle)
            .map_err(|e| LayoutError::Engine(format!("{e:?}")))?;

        let x = parent_x + layout.location.x;
        let y = parent_y + layout.location.y;
        let border_box = Rect::from_xywh(x, y, layout.size.width, layout.size.height);
        let content_box = Rect::from_xywh(
            x + layout.padding.left,
            y + layout.padding.top,
            (layout.size.width - layout.padding.left - layout.padding.right).max(0.0),
            (layout.size.height - layout.padding.top - layout.padding.bottom).max(0.0),
        );
        let scroll_extent = Size::new(
            (layout.content_size.width - layout.size.width).max(0.0),
            (layout.content_size.height - layout.size.height).max(0.0),
        );
        self.boxes.insert(
            node,
            BoxGeometry {
                border_box,
                content_box,
                scroll_extent,
            },
        );

        let children: Vec<NodeId> = tree
            .get(node)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.pull_node(tree, child, x, y)?;
        }
        Ok(())
    }

    /// End the pass, making the bridge ready for the next one.
    pub fn end_pass(&mut self) {
        assert_eq!(self.state, PassState::Calculated, "end_pass before calculate");
        self.state = PassState::Idle;
    }

    /// Geometry from the last completed pass.
    pub fn box_of(&self, node: NodeId) -> Option<&BoxGeometry> {
        self.boxes.get(&node)
    }
}

impl std::fmt::Debug for LayoutBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutBridge")
            .field("handles", &self.handles.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Map a resolved property bag onto an engine style. The bag arrives
/// default-filled from the cascade, so unset lookups only occur for
/// bags built by hand.
fn style_from_bag(bag: &PropertyBag, in_scroll_container: bool) -> taffy::Style {
    let display = match bag.keyword(PropertyId::Display) {
        Some(Keyword::None) => taffy::Display::None,
        _ => taffy::Display::Flex,
    };

    let overflow = match bag.keyword(PropertyId::Overflow) {
        Some(Keyword::Scroll) | Some(Keyword::Auto) => taffy::Overflow::Scroll,
        Some(Keyword::Hidden) => taffy::Overflow::Hidden,
        _ => taffy::Overflow::Visible,
    };

    let flex_direction = match bag.keyword(PropertyId::FlexDirection) {
        Some(Keyword::Column) => taffy::FlexDirection::Column,
        Some(Keyword::ColumnReverse) => taffy::FlexDirection::ColumnReverse,
        Some(Keyword::RowReverse) => taffy::FlexDirection::RowReverse,
        _ => taffy::FlexDirection::Row,
    };

    let flex_wrap = match bag.keyword(PropertyId::FlexWrap) {
        Some(Keyword::Wrap) => taffy::FlexWrap::Wrap,
        Some(Keyword::WrapReverse) => taffy::FlexWrap::WrapReverse,
        _ => taffy::FlexWrap::NoWrap,
    };

    let flex_shrink = if in_scroll_container {
        // Scroll containers measure children against unbounded space;
        // overflow surfaces as scrollable extent instead of shrinkage.
        0.0
    } else {
        bag.number(PropertyId::FlexShrink).unwrap_or(1.0)
    };

    taffy::Style {
        display,
        overflow: taffy::Point {
            x: overflow,
            y: overflow,
        },
        size: taffy::Size {
            width: dimension(bag.length(PropertyId::Width)),
            height: dimension(bag.length(PropertyId::Height)),
        },
        min_size: taffy::Size {
            width: dimension(bag.length(PropertyId::MinWidth)),
            height: dimension(bag.length(PropertyId::MinHeight)),
        },
        max_size: taffy::Size {
            width: dimension(bag.length(PropertyId::MaxWidth)),
            height: dimension(bag.length(PropertyId::MaxHeight)),
        },
        margin: taffy::Rect {
            top: length_percentage_auto(bag.length(PropertyId::MarginTop)),
            right: length_percentage_auto(bag.length(PropertyId::MarginRight)),
            bottom: length_percentage_auto(bag.length(PropertyId::MarginBottom)),
            left: length_percentage_auto(bag.length(PropertyId::MarginLeft)),
        },
        padding: taffy::Rect {
            top: length_percentage(bag.length(PropertyId::PaddingTop)),
            right: length_percentage(bag.length(PropertyId::PaddingRight)),
            bottom: length_percentage(bag.length(PropertyId::PaddingBottom)),
            left: length_percentage(bag.length(PropertyId::PaddingLeft)),
        },
        border: taffy::Rect {
            top: length_percentage(bag.length(PropertyId::BorderTopWidth)),
            right: length_percentage(bag.length(PropertyId::BorderRightWidth)),
            bottom: length_percentage(bag.length(PropertyId::BorderBottomWidth)),
            left: length_percentage(bag.length(PropertyId::BorderLeftWidth)),
        },
        gap: taffy::Size {
            width: length_percentage(bag.length(PropertyId::ColumnGap)),
            height: length_percentage(bag.length(PropertyId::RowGap)),
        },
        justify_content: justify_content(bag.keyword(PropertyId::JustifyContent)),
        align_items: align_items(bag.keyword(PropertyId::AlignItems)),
        align_self: align_self(bag.keyword(PropertyId::AlignSelf)),
        align_content: align_content(bag.keyword(PropertyId::AlignContent)),
        flex_direction,
        flex_wrap,
        flex_grow: bag.number(PropertyId::FlexGrow).unwrap_or(0.0),
        flex_shrink,
        flex_basis: dimension(bag.length(PropertyId::FlexBasis)),
        ..taffy::Style::default()
    }
}

fn dimension(length: Option<Length>) -> taffy::Dimension {
    match length {
        Some(l) => match l.unit {
            Unit::Px => taffy::Dimension::Length(l.value),
            Unit::Percent => taffy::Dimension::Percent(l.value / 100.0),
            Unit::Auto => taffy::Dimension::Auto,
        },
        // Unset maps to auto
        None => taffy::Dimension::Auto,
    }
}

fn length_percentage(length: Option<Length>) -> taffy::LengthPercentage {
    match length {
        Some(l) => match l.unit {
            Unit::Px => taffy::LengthPercentage::Length(l.value),
            Unit::Percent => taffy::LengthPercentage::Percent(l.value / 100.0),
            Unit::Auto => taffy::LengthPercentage::Length(0.0),
        },
        None => taffy::LengthPercentage::Length(0.0),
    }
}

fn length_percentage_auto(length: Option<Length>) -> taffy::LengthPercentageAuto {
    match length {
        Some(l) => match l.unit {
            Unit::Px => taffy::LengthPercentageAuto::Length(l.value),
            Unit::Percent => taffy::LengthPercentageAuto::Percent(l.value / 100.0),
            Unit::Auto => taffy::LengthPercentageAuto::Auto,
        },
        None => taffy::LengthPercentageAuto::Length(0.0),
    }
}

fn justify_content(keyword: Option<Keyword>) -> Option<taffy::JustifyContent> {
    Some(match keyword? {
        Keyword::FlexStart => taffy::JustifyContent::FlexStart,
        Keyword::FlexEnd => taffy::JustifyContent::FlexEnd,
        Keyword::Center => taffy::JustifyContent::Center,
        Keyword::SpaceBetween => taffy::JustifyContent::SpaceBetween,
        Keyword::SpaceAround => taffy::JustifyContent::SpaceAround,
        Keyword::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
        _ => return None,
    })
}

fn align_items(keyword: Option<Keyword>) -> Option<taffy::AlignItems> {
    Some(match keyword? {
        Keyword::FlexStart => taffy::AlignItems::FlexStart,
        Keyword::FlexEnd => taffy::AlignItems::FlexEnd,
        Keyword::Center => taffy::AlignItems::Center,
        Keyword::Baseline => taffy::AlignItems::Baseline,
        Keyword::Stretch => taffy::AlignItems::Stretch,
        _ => return None,
    })
}

fn align_self(keyword: Option<Keyword>) -> Option<taffy::AlignSelf> {
    match keyword? {
        // `auto` defers to the container's align-items
        Keyword::Auto => None,
        other => align_items(Some(other)),
    }
}

fn align_content(keyword: Option<Keyword>) -> Option<taffy::AlignContent> {
    Some(match keyword? {
        Keyword::FlexStart => taffy::AlignContent::FlexStart,
        Keyword::FlexEnd => taffy::AlignContent::FlexEnd,
        Keyword::Center => taffy::AlignContent::Center,
        Keyword::Stretch => taffy::AlignContent::Stretch,
        Keyword::SpaceBetween => taffy::AlignContent::SpaceBetween,
        Keyword::SpaceAround => taffy::AlignContent::SpaceAround,
        Keyword::SpaceEvenly => taffy::AlignContent::SpaceEvenly,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(declarations: &str) -> PropertyBag {
        let mut bag = PropertyBag::parse_declarations(declarations);
        bag.fill_defaults();
        bag
    }

    fn linked_pair() -> (Tree, LayoutBridge, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.create_node("panel");
        let child = tree.create_node("button");
        tree.append_child(root, child);

        let mut bridge = LayoutBridge::new();
        bridge.register(root).unwrap();
        bridge.register(child).unwrap();
        bridge.link_child(root, child, 0).unwrap();
        (tree, bridge, root, child)
    }

    #[test]
    fn push_calculate_pull_round_trip() {
        let (tree, mut bridge, root, child) = linked_pair();

        bridge.begin_pass();
        bridge
            .push_to_engine(root, &resolved("width: 200px; height: 100px; padding: 10px"), false)
            .unwrap();
        bridge
            .push_to_engine(child, &resolved("width: 50px; height: 20px"), false)
            .unwrap();
        bridge.calculate(root, 200.0, 100.0).unwrap();
        bridge.pull_from_engine(&tree, root, 0.0, 0.0).unwrap();
        bridge.end_pass();

        let root_box = bridge.box_of(root).unwrap();
        assert_eq!(root_box.border_box, Rect::from_xywh(0.0, 0.0, 200.0, 100.0));
        assert_eq!(root_box.content_box, Rect::from_xywh(10.0, 10.0, 180.0, 80.0));

        let child_box = bridge.box_of(child).unwrap();
        assert_eq!(child_box.border_box.x, 10.0);
        assert_eq!(child_box.border_box.y, 10.0);
        assert_eq!(child_box.border_box.width, 50.0);
        assert_eq!(child_box.border_box.height, 20.0);
    }

    #[test]
    fn display_none_collapses_subtree() {
        let (tree, mut bridge, root, child) = linked_pair();

        bridge.begin_pass();
        bridge
            .push_to_engine(root, &resolved("width: 100px; height: 100px"), false)
            .unwrap();
        bridge
            .push_to_engine(child, &resolved("display: none; width: 50px; height: 50px"), false)
            .unwrap();
        bridge.calculate(root, 100.0, 100.0).unwrap();
        bridge.pull_from_engine(&tree, root, 0.0, 0.0).unwrap();
        bridge.end_pass();

        let child_box = bridge.box_of(child).unwrap();
        assert_eq!(child_box.border_box.width, 0.0);
        assert_eq!(child_box.border_box.height, 0.0);
    }

    #[test]
    fn scroll_container_preserves_child_extent() {
        let (tree, mut bridge, root, child) = linked_pair();

        bridge.begin_pass();
        bridge
            .push_to_engine(
                root,
                &resolved("width: 400px; height: 300px; overflow: scroll"),
                false,
            )
            .unwrap();
        bridge
            .push_to_engine(
                child,
                &resolved("flex-direction: column; width: 400px; height: 600px"),
                true,
            )
            .unwrap();
        bridge.calculate(root, 400.0, 300.0).unwrap();
        bridge.pull_from_engine(&tree, root, 0.0, 0.0).unwrap();
        bridge.end_pass();

        let child_box = bridge.box_of(child).unwrap();
        assert_eq!(child_box.border_box.height, 600.0);

        let root_box = bridge.box_of(root).unwrap();
        assert_eq!(root_box.scroll_extent.height, 300.0);
        assert_eq!(root_box.scroll_extent.width, 0.0);
    }

    #[test]
    #[should_panic(expected = "calculate invoked outside an active push phase")]
    fn calculate_without_pass_panics() {
        let (_tree, mut bridge, root, _child) = linked_pair();
        let _ = bridge.calculate(root, 100.0, 100.0);
    }

    #[test]
    #[should_panic(expected = "layout pass already in progress")]
    fn reentrant_pass_panics() {
        let (_tree, mut bridge, _root, _child) = linked_pair();
        bridge.begin_pass();
        bridge.begin_pass();
    }

    #[test]
    fn release_frees_handle_once() {
        let (mut tree, mut bridge, root, child) = linked_pair();
        tree.remove(child);
        bridge.unlink_child(root, child).unwrap();
        bridge.release(child).unwrap();
        assert!(!bridge.is_registered(child));
        assert!(matches!(
            bridge.release(child),
            Err(LayoutError::UnknownNode(_))
        ));
    }
}
