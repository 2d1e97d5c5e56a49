//! Selector engine
//!
//! Compiled selector representation with combinator links, functional
//! pseudo-classes and cached specificity, plus the two-phase match test:
//! a cheap broadphase filter over tag/id/class and the full recursive
//! walk over ancestors and siblings.

use strata_tree::{NodeId, PseudoFlags, Tree};
use thiserror::Error;

/// Selector compilation failure. Invalid syntax drops the whole rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unbalanced parentheses in '{0}'")]
    Unbalanced(String),
    #[error("dangling combinator in '{0}'")]
    DanglingCombinator(String),
    #[error("unknown pseudo-class ':{0}'")]
    UnknownPseudo(String),
    #[error("invalid nth-child expression '{0}'")]
    InvalidNth(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
}

/// Relation between a selector and its `parent` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor
    Descendant,
    /// `>`: immediate parent
    Child,
    /// `+`: immediately preceding sibling
    AdjacentSibling,
    /// `~`: any preceding sibling
    GeneralSibling,
}

/// An+B expression for `:nth-child()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpr {
    pub a: i32,
    pub b: i32,
}

impl NthExpr {
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// Parse `odd`, `even`, `3`, `2n`, `2n+1`, `-n+3`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase().replace(' ', "");
        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }
        if let Ok(b) = s.parse::<i32>() {
            return Some(Self { a: 0, b });
        }
        let n_pos = s.find('n')?;
        let a_str = &s[..n_pos];
        let a = match a_str {
            "" | "+" => 1,
            "-" => -1,
            _ => a_str.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() { 0 } else { rest.parse().ok()? };
        Some(Self { a, b })
    }

    /// Check a 1-based sibling position.
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

/// A compiled selector. Owns its sub-selectors; the only upward link is
/// the `parent` combinator chain, also owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    element: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    pseudo: PseudoFlags,
    nth_child: Option<NthExpr>,
    parent: Option<Box<(Combinator, Selector)>>,
    not: Vec<Selector>,
    has: Vec<(Combinator, Selector)>,
    any_of: Vec<Selector>,
    specificity: i64,
}

impl Selector {
    /// Compile a selector from text. The specificity score is computed
    /// here, once, and cached.
    pub fn compile(text: &str) -> Result<Selector, SelectorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SelectorError::Empty);
        }
        let segments = split_combinators(text)?;
        // Fold left to right: each compound hangs the chain built so far
        // off its own parent link. The rightmost compound is the subject.
        let mut chain: Option<Selector> = None;
        for (combinator, compound) in segments {
            let mut current = parse_compound(&compound)?;
            if let Some(ancestor) = chain.take() {
                let comb =
                    combinator.ok_or_else(|| SelectorError::DanglingCombinator(text.to_string()))?;
                current.parent = Some(Box::new((comb, ancestor)));
            }
            chain = Some(current);
        }
        let mut selector = chain.ok_or(SelectorError::Empty)?;
        selector.cache_specificity();
        Ok(selector)
    }

    fn cache_specificity(&mut self) {
        if let Some(link) = self.parent.as_mut() {
            link.1.cache_specificity();
        }
        for sub in self
            .not
            .iter_mut()
            .chain(self.any_of.iter_mut())
            .chain(self.has.iter_mut().map(|(_, s)| s))
        {
            sub.cache_specificity();
        }
        self.specificity = self.compute_specificity();
    }

    fn compute_specificity(&self) -> i64 {
        let mut score = 0i64;
        if self.id.is_some() {
            score += 1000;
        }
        if self.element.is_some() {
            score += 1;
        }
        score += 10 * self.classes.len() as i64;
        score += 10 * self.pseudo.bits().count_ones() as i64;
        if self.nth_child.is_some() {
            score += 10;
        }
        score += self.not.iter().map(|s| s.specificity).max().unwrap_or(0);
        score += self.any_of.iter().map(|s| s.specificity).max().unwrap_or(0);
        score += self.has.iter().map(|(_, s)| s.specificity).max().unwrap_or(0);
        if let Some(link) = &self.parent {
            score += link.1.specificity;
        }
        score
    }

    /// Cached specificity score. Pure function of the compiled selector,
    /// independent of any node.
    #[inline]
    pub fn specificity(&self) -> i64 {
        self.specificity
    }

    /// Cheap prefilter over element name, id and class membership only.
    /// Never produces a false negative for the full test.
    pub fn matches_broadphase(&self, tree: &Tree, node: NodeId) -> bool {
        let Some(n) = tree.get(node) else {
            return false;
        };
        if let Some(element) = &self.element {
            if !n.tag().eq_ignore_ascii_case(element) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if n.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| n.has_class(class))
    }

    /// Full match test. A combinator that finds no matching ancestor or
    /// sibling is a normal non-match, not an error.
    pub fn matches(&self, tree: &Tree, node: NodeId, forced: PseudoFlags) -> bool {
        let Some(n) = tree.get(node) else {
            return false;
        };

        // Generated ::before/::after nodes redirect the test to their
        // parent with the pseudo-element flag injected.
        if n.is_pseudo_element() && !forced.intersects(PseudoFlags::pseudo_elements()) {
            let flag = n.pseudo() & PseudoFlags::pseudo_elements();
            let parent = n.parent();
            if parent.is_none() {
                return false;
            }
            return self.matches(tree, parent, forced | flag);
        }

        // Required pseudo flags must all be present (superset match).
        let state = n.pseudo() | forced;
        if !state.contains(self.pseudo) {
            return false;
        }

        if !self.matches_broadphase(tree, node) {
            return false;
        }

        if let Some(nth) = &self.nth_child {
            match tree.sibling_index(node) {
                Some(index) => {
                    if !nth.matches(index as i32 + 1) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        if self.not.iter().any(|sub| sub.matches(tree, node, forced)) {
            return false;
        }

        if !self.any_of.is_empty() && !self.any_of.iter().any(|sub| sub.matches(tree, node, forced)) {
            return false;
        }

        for (combinator, sub) in &self.has {
            if !self.has_matches(tree, node, *combinator, sub) {
                return false;
            }
        }

        if let Some(link) = &self.parent {
            let (combinator, ancestor_sel) = (&link.0, &link.1);
            let found = match combinator {
                Combinator::Child => {
                    let parent = n.parent();
                    !parent.is_none() && ancestor_sel.matches(tree, parent, PseudoFlags::empty())
                }
                Combinator::Descendant => {
                    let mut current = n.parent();
                    let mut hit = false;
                    while !current.is_none() {
                        if ancestor_sel.matches(tree, current, PseudoFlags::empty()) {
                            hit = true;
                            break;
                        }
                        current = tree.get(current).map(|p| p.parent()).unwrap_or(NodeId::NONE);
                    }
                    hit
                }
                Combinator::AdjacentSibling => tree
                    .prev_sibling(node)
                    .is_some_and(|sib| ancestor_sel.matches(tree, sib, PseudoFlags::empty())),
                Combinator::GeneralSibling => tree
                    .preceding_siblings(node)
                    .iter()
                    .any(|&sib| ancestor_sel.matches(tree, sib, PseudoFlags::empty())),
            };
            if !found {
                return false;
            }
        }

        true
    }

    /// `:has()` tests forward relations: descendants, children or
    /// following siblings depending on the sub-selector's combinator.
    fn has_matches(&self, tree: &Tree, node: NodeId, combinator: Combinator, sub: &Selector) -> bool {
        let Some(n) = tree.get(node) else {
            return false;
        };
        match combinator {
            Combinator::Descendant => {
                let mut stack: Vec<NodeId> = n.children().to_vec();
                while let Some(current) = stack.pop() {
                    if sub.matches(tree, current, PseudoFlags::empty()) {
                        return true;
                    }
                    if let Some(c) = tree.get(current) {
                        stack.extend_from_slice(c.children());
                    }
                }
                false
            }
            Combinator::Child => n
                .children()
                .iter()
                .any(|&child| sub.matches(tree, child, PseudoFlags::empty())),
            Combinator::AdjacentSibling => tree
                .following_siblings(node)
                .first()
                .is_some_and(|&sib| sub.matches(tree, sib, PseudoFlags::empty())),
            Combinator::GeneralSibling => tree
                .following_siblings(node)
                .iter()
                .any(|&sib| sub.matches(tree, sib, PseudoFlags::empty())),
        }
    }
}

/// Split selector text into `(combinator-to-left, compound)` segments at
/// the top parenthesis level. The first segment carries no combinator.
fn split_combinators(text: &str) -> Result<Vec<(Option<Combinator>, String)>, SelectorError> {
    let mut segments: Vec<(Option<Combinator>, String)> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut current = String::new();
    let mut depth = 0usize;

    fn flush(
        segments: &mut Vec<(Option<Combinator>, String)>,
        pending: &mut Option<Combinator>,
        current: &mut String,
    ) {
        if current.is_empty() {
            return;
        }
        let combinator = if segments.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        segments.push((combinator, std::mem::take(current)));
    }

    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::Unbalanced(text.to_string()))?;
                current.push(ch);
            }
            '>' | '+' | '~' if depth == 0 => {
                flush(&mut segments, &mut pending, &mut current);
                if pending.is_some() || segments.is_empty() {
                    return Err(SelectorError::DanglingCombinator(text.to_string()));
                }
                pending = Some(match ch {
                    '>' => Combinator::Child,
                    '+' => Combinator::AdjacentSibling,
                    _ => Combinator::GeneralSibling,
                });
            }
            c if c.is_whitespace() && depth == 0 => {
                flush(&mut segments, &mut pending, &mut current);
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(SelectorError::Unbalanced(text.to_string()));
    }
    flush(&mut segments, &mut pending, &mut current);
    if pending.is_some() {
        return Err(SelectorError::DanglingCombinator(text.to_string()));
    }
    if segments.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(segments)
}

/// Parse one compound: `tag`, `*`, `#id`, `.class`, `:pseudo`,
/// `::element`, `:not(...)`, `:has(...)`, `:is(...)`, `:nth-child(...)`.
fn parse_compound(text: &str) -> Result<Selector, SelectorError> {
    let mut selector = Selector {
        element: None,
        id: None,
        classes: Vec::new(),
        pseudo: PseudoFlags::empty(),
        nth_child: None,
        parent: None,
        not: Vec::new(),
        has: Vec::new(),
        any_of: Vec::new(),
        specificity: 0,
    };

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;

    let read_ident = |chars: &[char], mut i: usize| -> (String, usize) {
        let start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '-' || chars[i] == '_') {
            i += 1;
        }
        (chars[start..i].iter().collect(), i)
    };

    while i < chars.len() {
        match chars[i] {
            '*' => {
                i += 1;
            }
            '#' => {
                let (ident, next) = read_ident(&chars, i + 1);
                if ident.is_empty() {
                    return Err(SelectorError::UnexpectedToken(text.to_string()));
                }
                selector.id = Some(ident);
                i = next;
            }
            '.' => {
                let (ident, next) = read_ident(&chars, i + 1);
                if ident.is_empty() {
                    return Err(SelectorError::UnexpectedToken(text.to_string()));
                }
                selector.classes.push(ident);
                i = next;
            }
            ':' => {
                let double = i + 1 < chars.len() && chars[i + 1] == ':';
                let name_start = if double { i + 2 } else { i + 1 };
                let (name, next) = read_ident(&chars, name_start);
                if name.is_empty() {
                    return Err(SelectorError::UnexpectedToken(text.to_string()));
                }
                if next < chars.len() && chars[next] == '(' {
                    let (body, after) = read_parenthesized(&chars, next, text)?;
                    i = after;
                    match name.as_str() {
                        "not" => {
                            for alt in split_top_level_commas(&body) {
                                selector.not.push(Selector::compile(&alt)?);
                            }
                        }
                        "is" => {
                            for alt in split_top_level_commas(&body) {
                                selector.any_of.push(Selector::compile(&alt)?);
                            }
                        }
                        "has" => {
                            for alt in split_top_level_commas(&body) {
                                let (combinator, rest) = strip_leading_combinator(&alt);
                                selector.has.push((combinator, Selector::compile(&rest)?));
                            }
                        }
                        "nth-child" => {
                            let expr = NthExpr::parse(&body)
                                .ok_or_else(|| SelectorError::InvalidNth(body.clone()))?;
                            selector.nth_child = Some(expr);
                        }
                        other => return Err(SelectorError::UnknownPseudo(other.to_string())),
                    }
                } else {
                    i = next;
                    let flag = PseudoFlags::from_pseudo_name(&name)
                        .ok_or_else(|| SelectorError::UnknownPseudo(name.clone()))?;
                    selector.pseudo |= flag;
                }
            }
            c if c.is_alphabetic() => {
                let (ident, next) = read_ident(&chars, i);
                selector.element = Some(ident.to_ascii_lowercase());
                i = next;
            }
            _ => return Err(SelectorError::UnexpectedToken(text.to_string())),
        }
    }

    Ok(selector)
}

fn read_parenthesized(chars: &[char], open: usize, whole: &str) -> Result<(String, usize), SelectorError> {
    debug_assert_eq!(chars[open], '(');
    let mut depth = 0usize;
    for (offset, &ch) in chars[open..].iter().enumerate() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let body: String = chars[open + 1..open + offset].iter().collect();
                    return Ok((body, open + offset + 1));
                }
            }
            _ => {}
        }
    }
    Err(SelectorError::Unbalanced(whole.to_string()))
}

fn split_top_level_commas(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// `:has(> x)` style leading combinators; plain content means descendant.
fn strip_leading_combinator(text: &str) -> (Combinator, String) {
    let trimmed = text.trim_start();
    match trimmed.chars().next() {
        Some('>') => (Combinator::Child, trimmed[1..].trim_start().to_string()),
        Some('+') => (Combinator::AdjacentSibling, trimmed[1..].trim_start().to_string()),
        Some('~') => (Combinator::GeneralSibling, trimmed[1..].trim_start().to_string()),
        _ => (Combinator::Descendant, trimmed.to_string()),
    }
}
