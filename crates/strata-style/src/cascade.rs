//! Style cascade & resolver
//!
//! Computes the final property bag for a node by:
//! 1. Matching rule selectors (broadphase prefilter, then full test)
//! 2. Sorting matches by specificity and registration order
//! 3. Merging declaration bags field by field, inline last
//! 4. Applying parent inheritance and declared defaults
//!
//! The registry is an owned value passed into every resolve; there is no
//! global stylesheet state. Resolved bags are cached per node and only
//! committed after a successful resolve.

use std::collections::HashMap;

use strata_tree::{NodeId, PseudoFlags, Tree};
use tracing::{debug, trace};

use crate::bag::PropertyBag;
use crate::sheet::RuleSet;

/// Handle for a registered stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(u64);

/// Ordered stylesheet registry owned by the application root.
///
/// Every mutation bumps the generation counter, which stales every
/// node's cached match state tree-wide without touching the nodes.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    sheets: Vec<(SheetId, RuleSet)>,
    next_id: u64,
    generation: u64,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sheet. Later sheets win cascade ties against earlier
    /// ones (standard last-registered-wins ordering).
    pub fn add(&mut self, sheet: RuleSet) -> SheetId {
        let id = SheetId(self.next_id);
        self.next_id += 1;
        self.sheets.push((id, sheet));
        self.generation += 1;
        debug!(sheet = id.0, generation = self.generation, "stylesheet registered");
        id
    }

    pub fn remove(&mut self, id: SheetId) -> bool {
        let before = self.sheets.len();
        self.sheets.retain(|(sid, _)| *sid != id);
        let removed = self.sheets.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Drop every registered sheet (explicit between-sessions reset).
    pub fn clear(&mut self) {
        if !self.sheets.is_empty() {
            self.sheets.clear();
            self.generation += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sheets(&self) -> impl Iterator<Item = &RuleSet> {
        self.sheets.iter().map(|(_, sheet)| sheet)
    }
}

/// Outcome of a resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolution {
    /// The final bag differs from the previously cached one.
    pub changed: bool,
    /// A layout-affecting field differs; the caller should mark the node
    /// layout-dirty and propagate upward.
    pub layout_changed: bool,
}

#[derive(Debug)]
struct CacheEntry {
    bag: PropertyBag,
    generation: u64,
}

/// Per-node cascade cache and the `build_final` algorithm.
#[derive(Debug, Default)]
pub struct StyleResolver {
    cache: HashMap<NodeId, CacheEntry>,
}

impl StyleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached final bag, if the node has ever been resolved.
    pub fn cached(&self, node: NodeId) -> Option<&PropertyBag> {
        self.cache.get(&node).map(|entry| &entry.bag)
    }

    /// Drop cached state for a destroyed node so a reused arena slot
    /// never sees stale style.
    pub fn forget(&mut self, node: NodeId) {
        self.cache.remove(&node);
    }

    /// Resolve the final property bag for `node`.
    ///
    /// Returns the cached bag with `changed = false` when the node is
    /// clean and no stylesheet changed since the last resolve. `force`
    /// re-resolves a clean node (used when the parent's bag changed and
    /// inherited fields may be stale).
    pub fn build_final(
        &mut self,
        tree: &Tree,
        node: NodeId,
        registry: &StyleRegistry,
        inherited: Option<&PropertyBag>,
        force: bool,
    ) -> (PropertyBag, Resolution) {
        let dirty = tree.get(node).map(|n| n.style_dirty()).unwrap_or(false);
        if let Some(entry) = self.cache.get(&node) {
            if !dirty && !force && entry.generation == registry.generation() {
                return (entry.bag.clone(), Resolution::default());
            }
        }

        // Collect matching rules across all sheets in registration
        // order. The running index is the cascade tie-break key: equal
        // specificity resolves to the later-registered declaration.
        let mut matches: Vec<(i64, u32, &PropertyBag)> = Vec::new();
        let mut order: u32 = 0;
        for sheet in registry.sheets() {
            for rule in &sheet.rules {
                let specificity = rule
                    .selectors
                    .iter()
                    .filter(|sel| {
                        sel.matches_broadphase(tree, node)
                            && sel.matches(tree, node, PseudoFlags::empty())
                    })
                    .map(|sel| sel.specificity())
                    .max();
                if let Some(specificity) = specificity {
                    matches.push((specificity, order, &rule.declarations));
                }
                order += 1;
            }
        }

        // Ascending stable sort: later entries overlay earlier ones, so
        // the highest (specificity, order) pair wins per field.
        matches.sort_by_key(|&(specificity, order, _)| (specificity, order));
        trace!(node = ?node, matches = matches.len(), "cascade");

        let mut bag = PropertyBag::new();
        for (_, _, declarations) in &matches {
            bag.overlay(declarations);
        }

        // Inline declarations always win over stylesheet rules.
        if let Some(text) = tree.get(node).and_then(|n| n.inline_style()) {
            let inline = PropertyBag::parse_declarations(text);
            bag.overlay(&inline);
        }

        if let Some(parent_bag) = inherited {
            bag.apply_inherited(parent_bag);
        }
        bag.fill_defaults();

        let resolution = match self.cache.get(&node) {
            Some(entry) => Resolution {
                changed: entry.bag != bag,
                layout_changed: entry.bag.layout_fields_differ(&bag),
            },
            None => Resolution {
                changed: true,
                layout_changed: true,
            },
        };

        self.cache.insert(
            node,
            CacheEntry {
                bag: bag.clone(),
                generation: registry.generation(),
            },
        );

        (bag, resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyId;
    use crate::value::{Color, Length};

    fn resolve(
        resolver: &mut StyleResolver,
        tree: &mut Tree,
        node: NodeId,
        registry: &StyleRegistry,
        inherited: Option<&PropertyBag>,
    ) -> (PropertyBag, Resolution) {
        let out = resolver.build_final(tree, node, registry, inherited, false);
        tree.clear_style_dirty(node);
        out
    }

    #[test]
    fn universal_rule_applies_everywhere() {
        let mut tree = Tree::new();
        let root = tree.create_node("panel");
        let child = tree.create_node("button");
        tree.append_child(root, child);

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse("* { width: 150px; }"));

        let mut resolver = StyleResolver::new();
        for node in [root, child] {
            let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
            assert_eq!(bag.length(PropertyId::Width), Some(Length::px(150.0)));
        }

        // A node added after the rule set loads still picks it up.
        let late = tree.create_node("label");
        tree.append_child(root, late);
        let (bag, _) = resolve(&mut resolver, &mut tree, late, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(150.0)));
    }

    #[test]
    fn class_scoping() {
        let mut tree = Tree::new();
        let root = tree.create_node("panel");
        let styled = tree.create_node("button");
        let plain = tree.create_node("button");
        tree.append_child(root, styled);
        tree.append_child(root, plain);
        tree.add_class(styled, "button");

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse(
            ".button { background-color: #ff0000; width: 200px; height: 50px; }",
        ));

        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, styled, &registry, None);
        assert_eq!(bag.color(PropertyId::BackgroundColor), Some(Color::rgb(255, 0, 0)));
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(200.0)));
        assert_eq!(bag.length(PropertyId::Height), Some(Length::px(50.0)));

        let (bag, _) = resolve(&mut resolver, &mut tree, plain, &registry, None);
        assert_eq!(bag.color(PropertyId::BackgroundColor), Some(Color::TRANSPARENT));
        assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));
    }

    #[test]
    fn idempotent_when_clean() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse("button { width: 80px; }"));

        let mut resolver = StyleResolver::new();
        let (first, res) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert!(res.changed);
        let (second, res) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert!(!res.changed);
        assert!(!res.layout_changed);
        assert_eq!(first, second);
    }

    #[test]
    fn pseudo_state_gates_rule() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        tree.add_class(node, "button");

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse(".button:hover { width: 120px; }"));

        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));

        tree.set_pseudo(node, PseudoFlags::HOVER, true);
        let (bag, res) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(120.0)));
        assert!(res.changed && res.layout_changed);

        tree.set_pseudo(node, PseudoFlags::HOVER, false);
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));
    }

    #[test]
    fn specificity_beats_order_ties_go_to_later() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        tree.add_class(node, "big");

        let mut registry = StyleRegistry::new();
        // The class selector outweighs the later element selector.
        registry.add(RuleSet::parse(
            ".big { width: 300px; } button { width: 100px; }",
        ));
        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(300.0)));

        // Equal specificity: the later-registered sheet wins the tie.
        registry.add(RuleSet::parse(".big { width: 320px; }"));
        let (bag, _) = resolver.build_final(&tree, node, &registry, None, false);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(320.0)));
    }

    #[test]
    fn merge_is_per_field_not_per_rule() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        tree.add_class(node, "accent");

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse(
            "button { width: 100px; height: 30px; } .accent { width: 200px; }",
        ));
        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        // The higher-specificity rule wins width but the element rule's
        // height survives.
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(200.0)));
        assert_eq!(bag.length(PropertyId::Height), Some(Length::px(30.0)));
    }

    #[test]
    fn inline_beats_everything() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        tree.set_id(node, Some("send"));
        tree.set_inline_style(node, Some("width: 42px"));

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse("#send { width: 500px; }"));
        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(42.0)));
    }

    #[test]
    fn inheritance_fills_unset_only() {
        let mut tree = Tree::new();
        let node = tree.create_node("label");

        let mut parent_bag = PropertyBag::new();
        parent_bag.set("color", "#00ff00");
        parent_bag.set("font-size", "20px");
        parent_bag.fill_defaults();

        let mut registry = StyleRegistry::new();
        registry.add(RuleSet::parse("label { color: #0000ff; }"));
        let mut resolver = StyleResolver::new();
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, Some(&parent_bag));
        assert_eq!(bag.color(PropertyId::Color), Some(Color::rgb(0, 0, 255)));
        assert_eq!(bag.length(PropertyId::FontSize), Some(Length::px(20.0)));
    }

    #[test]
    fn registry_generation_stales_cache_tree_wide() {
        let mut tree = Tree::new();
        let node = tree.create_node("button");
        let mut registry = StyleRegistry::new();
        let mut resolver = StyleResolver::new();

        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));

        // The node is clean, but registering a sheet must still reach it.
        let id = registry.add(RuleSet::parse("button { width: 77px; }"));
        let (bag, res) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(77.0)));
        assert!(res.changed);

        // Removing it restores the default.
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        let (bag, _) = resolve(&mut resolver, &mut tree, node, &registry, None);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::AUTO));
    }
}
