//! Strata style system
//!
//! Selector compilation and matching, typed property bags, rule sets
//! with variable substitution, and the specificity cascade.

mod bag;
mod cascade;
mod property;
mod selector;
mod sheet;
mod value;

pub use bag::PropertyBag;
pub use cascade::{Resolution, SheetId, StyleRegistry, StyleResolver};
pub use property::{PropertyId, PropertyKind};
pub use selector::{Combinator, NthExpr, Selector, SelectorError};
pub use sheet::{Rule, RuleSet, StylesheetError};
pub use value::{Color, Keyword, Length, StyleValue, Unit};

// Re-exported so selector call sites share one flag type with the tree.
pub use strata_tree::PseudoFlags;
