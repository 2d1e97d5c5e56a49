//! Strata engine facade
//!
//! [`UiEngine`] owns the node tree, the stylesheet registry, the cascade
//! cache and the layout bridge, and keeps their lifecycles paired: every
//! UI node has exactly one engine-side twin, created on construction and
//! released in the same operation that destroys the node. The registry
//! is a plain owned value; clearing it between sessions is an explicit
//! method, not a global side effect.

use std::collections::HashSet;

use strata_layout::{LayoutBridge, LayoutError};
use strata_style::{
    Keyword, PropertyBag, PropertyId, RuleSet, SheetId, StyleRegistry, StyleResolver,
    StylesheetError,
};
use strata_tree::{NodeId, PseudoFlags, Tree};
use thiserror::Error;
use tracing::debug_span;

pub use strata_layout::{BoxGeometry, Rect, Size};
pub use strata_style as style;
pub use strata_tree as tree;

/// Engine-level failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("the root node cannot be removed")]
    RemoveRoot,
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Stylesheet(#[from] StylesheetError),
}

/// The style-resolution-and-layout engine.
pub struct UiEngine {
    tree: Tree,
    registry: StyleRegistry,
    resolver: StyleResolver,
    bridge: LayoutBridge,
    root: NodeId,
    /// Nodes that have had at least one style pushed to the engine.
    pushed: HashSet<NodeId>,
}

impl UiEngine {
    pub fn new() -> Result<Self, EngineError> {
        let mut tree = Tree::new();
        let mut bridge = LayoutBridge::new();
        let root = tree.create_node("root");
        bridge.register(root)?;
        Ok(Self {
            tree,
            registry: StyleRegistry::new(),
            resolver: StyleResolver::new(),
            bridge,
            root,
            pushed: HashSet::new(),
        })
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read-only view of the node tree (consumed by hit-testing,
    /// painting, widget logic).
    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    // ---- node lifecycle -------------------------------------------------

    /// Create a detached node and its engine twin.
    pub fn create_node(&mut self, tag: impl Into<String>) -> Result<NodeId, EngineError> {
        let node = self.tree.create_node(tag);
        self.bridge.register(node)?;
        Ok(node)
    }

    /// Append `child` as the last child of `parent`, mirroring the link
    /// on the engine side in the same operation.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), EngineError> {
        let index = self
            .tree
            .get(parent)
            .map(|n| n.children().len())
            .unwrap_or(0);
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` under `parent`. The engine child order
    /// must always equal the tree child order, so both sides move
    /// together or not at all.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), EngineError> {
        let old_parent = self.tree.get(child).map(|n| n.parent());
        if let Some(old) = old_parent {
            if !old.is_none() {
                self.bridge.unlink_child(old, child)?;
            }
        }
        self.tree.insert_child(parent, index, child);
        let index = self.tree.sibling_index(child).unwrap_or(index);
        self.bridge.link_child(parent, child, index)?;
        Ok(())
    }

    /// Destroy a node and its subtree. Engine handles are unlinked and
    /// released here, in the same operation, so tree and engine can
    /// never disagree about children.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), EngineError> {
        if node == self.root {
            return Err(EngineError::RemoveRoot);
        }
        let removed = self.tree.remove(node);
        for id in removed {
            self.bridge.release(id)?;
            self.resolver.forget(id);
            self.pushed.remove(&id);
        }
        Ok(())
    }

    // ---- style facet mutators (lazy: only dirty flags flip) -------------

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        self.tree.add_class(node, class);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.tree.remove_class(node, class);
    }

    pub fn toggle_class(&mut self, node: NodeId, class: &str) {
        self.tree.toggle_class(node, class);
    }

    pub fn set_id(&mut self, node: NodeId, id: Option<&str>) {
        self.tree.set_id(node, id);
    }

    pub fn set_pseudo(&mut self, node: NodeId, flag: PseudoFlags, on: bool) {
        self.tree.set_pseudo(node, flag, on);
    }

    pub fn set_inline_style(&mut self, node: NodeId, declarations: Option<&str>) {
        self.tree.set_inline_style(node, declarations);
    }

    // ---- stylesheet registry --------------------------------------------

    /// Register a sheet parsed permissively: malformed rules are dropped
    /// with a warning, a broken sheet contributes zero rules.
    pub fn add_stylesheet(&mut self, source: &str) -> SheetId {
        self.registry.add(RuleSet::parse(source))
    }

    /// Register a sheet, failing loudly on the first malformed rule.
    pub fn add_stylesheet_strict(&mut self, source: &str) -> Result<SheetId, EngineError> {
        let sheet = RuleSet::parse_strict(source)?;
        Ok(self.registry.add(sheet))
    }

    pub fn remove_stylesheet(&mut self, id: SheetId) -> bool {
        self.registry.remove(id)
    }

    /// Explicit between-sessions reset of every registered sheet.
    pub fn clear_stylesheets(&mut self) {
        self.registry.clear();
    }

    // ---- resolution & layout --------------------------------------------

    /// Resolve the final property bag for one node, resolving its
    /// ancestor chain first so inherited fields are current.
    pub fn resolve_style(&mut self, node: NodeId) -> PropertyBag {
        let mut chain = Vec::new();
        let mut current = node;
        while !current.is_none() {
            chain.push(current);
            current = self
                .tree
                .get(current)
                .map(|n| n.parent())
                .unwrap_or(NodeId::NONE);
        }
        chain.reverse();

        let mut inherited: Option<PropertyBag> = None;
        let mut parent_changed = false;
        let mut last = PropertyBag::new();
        for id in chain {
            let (bag, resolution) = self.resolver.build_final(
                &self.tree,
                id,
                &self.registry,
                inherited.as_ref(),
                parent_changed,
            );
            self.tree.clear_style_dirty(id);
            if resolution.layout_changed {
                self.tree.mark_layout_dirty(id);
            }
            parent_changed = resolution.changed;
            inherited = Some(bag.clone());
            last = bag;
        }
        last
    }

    /// Run one layout pass: pre-order resolve-and-push, a single solver
    /// calculate with the viewport size, then a pre-order geometry pull.
    pub fn layout(&mut self, width: f32, height: f32) -> Result<(), EngineError> {
        let _span = debug_span!("layout", width, height).entered();
        self.bridge.begin_pass();
        self.push_walk(self.root, None, false, false, false)?;
        self.bridge.calculate(self.root, width, height)?;
        self.bridge.pull_from_engine(&self.tree, self.root, 0.0, 0.0)?;
        self.bridge.end_pass();
        for id in self.tree.preorder(self.root) {
            self.tree.clear_layout_dirty(id);
        }
        Ok(())
    }

    fn push_walk(
        &mut self,
        node: NodeId,
        inherited: Option<&PropertyBag>,
        parent_changed: bool,
        parent_layout_changed: bool,
        in_scroll_container: bool,
    ) -> Result<(), EngineError> {
        let (bag, resolution) = self.resolver.build_final(
            &self.tree,
            node,
            &self.registry,
            inherited,
            parent_changed,
        );
        self.tree.clear_style_dirty(node);
        if resolution.layout_changed {
            self.tree.mark_layout_dirty(node);
        }

        // Re-push when this node's layout inputs changed, when the
        // parent's did (the scroll-container rule reads parent state),
        // or on the node's first pass.
        if resolution.layout_changed || parent_layout_changed || !self.pushed.contains(&node) {
            self.bridge.push_to_engine(node, &bag, in_scroll_container)?;
            self.pushed.insert(node);
        }

        let child_in_scroll = matches!(
            bag.keyword(PropertyId::Overflow),
            Some(Keyword::Scroll) | Some(Keyword::Auto)
        );
        let children: Vec<NodeId> = self
            .tree
            .get(node)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.push_walk(
                child,
                Some(&bag),
                resolution.changed,
                resolution.layout_changed || parent_layout_changed,
                child_in_scroll,
            )?;
        }
        Ok(())
    }

    // ---- geometry readback ----------------------------------------------

    /// Border box from the last pass, absolute coordinates.
    pub fn box_of(&self, node: NodeId) -> Option<Rect> {
        self.bridge.box_of(node).map(|b| b.border_box)
    }

    /// Inner (padding-inset) box from the last pass.
    pub fn content_box_of(&self, node: NodeId) -> Option<Rect> {
        self.bridge.box_of(node).map(|b| b.content_box)
    }

    /// Scrollable extent beyond the border box (for scroll containers).
    pub fn scroll_extent_of(&self, node: NodeId) -> Option<Size> {
        self.bridge.box_of(node).map(|b| b.scroll_extent)
    }

    /// Full geometry record from the last pass.
    pub fn geometry_of(&self, node: NodeId) -> Option<&BoxGeometry> {
        self.bridge.box_of(node)
    }

    /// Topmost node whose border box contains the point (hit testing).
    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        let mut hit = None;
        for id in self.tree.preorder(self.root) {
            if let Some(rect) = self.box_of(id) {
                if rect.contains_point(x, y) {
                    hit = Some(id);
                }
            }
        }
        hit
    }
}

impl std::fmt::Debug for UiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiEngine")
            .field("nodes", &self.tree.len())
            .field("sheets", &self.registry.len())
            .finish()
    }
}
