//! UI Node - style-relevant facet
//!
//! A node carries everything selector matching and cascading read: tag
//! name, class set, optional id, pseudo-state bitset and the raw inline
//! declaration text. Mutators live on [`crate::Tree`] so dirty flags are
//! kept consistent.

use crate::NodeId;
use bitflags::bitflags;

bitflags! {
    /// Pseudo-class state bits plus the two generated pseudo-element
    /// markers. Selector matching treats required bits as a subset test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PseudoFlags: u16 {
        const HOVER    = 1 << 0;
        const ACTIVE   = 1 << 1;
        const FOCUS    = 1 << 2;
        const DISABLED = 1 << 3;
        const CHECKED  = 1 << 4;
        /// Node is a generated ::before child
        const BEFORE   = 1 << 5;
        /// Node is a generated ::after child
        const AFTER    = 1 << 6;
    }
}

impl PseudoFlags {
    /// Parse a single pseudo-class/pseudo-element name (without colons).
    pub fn from_pseudo_name(name: &str) -> Option<Self> {
        Some(match name {
            "hover" => Self::HOVER,
            "active" => Self::ACTIVE,
            "focus" => Self::FOCUS,
            "disabled" => Self::DISABLED,
            "checked" => Self::CHECKED,
            "before" => Self::BEFORE,
            "after" => Self::AFTER,
            _ => return None,
        })
    }

    /// Bits marking generated pseudo-element nodes.
    pub fn pseudo_elements() -> Self {
        Self::BEFORE | Self::AFTER
    }
}

/// A node in the UI tree.
///
/// Parent links are plain indices (weak); children are an owned, ordered
/// index list. The two dirty flags are independent: `style_dirty` defers
/// cascade recomputation, `layout_dirty` defers engine geometry.
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: NodeId,
    pub(crate) children: Vec<NodeId>,

    pub(crate) tag: String,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) pseudo: PseudoFlags,
    pub(crate) inline_style: Option<String>,

    pub(crate) style_dirty: bool,
    pub(crate) layout_dirty: bool,
}

impl Node {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            parent: NodeId::NONE,
            children: Vec::new(),
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            pseudo: PseudoFlags::empty(),
            inline_style: None,
            // New nodes have never been resolved
            style_dirty: true,
            layout_dirty: true,
        }
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    #[inline]
    pub fn pseudo(&self) -> PseudoFlags {
        self.pseudo
    }

    #[inline]
    pub fn inline_style(&self) -> Option<&str> {
        self.inline_style.as_deref()
    }

    #[inline]
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn style_dirty(&self) -> bool {
        self.style_dirty
    }

    #[inline]
    pub fn layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    /// True for generated ::before/::after nodes.
    pub fn is_pseudo_element(&self) -> bool {
        self.pseudo.intersects(PseudoFlags::pseudo_elements())
    }
}
