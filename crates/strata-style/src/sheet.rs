//! Rule sets
//!
//! An ordered collection of (selector-list, declaration-bag) rules parsed
//! from text. `$name` variables are declared at sheet top level and
//! substituted textually, longest name first, before rule parsing; they
//! are never re-resolved at cascade time.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::bag::PropertyBag;
use crate::selector::{Selector, SelectorError};

/// Stylesheet parse failure, surfaced only by the fail-loud entry point.
#[derive(Debug, Error)]
pub enum StylesheetError {
    #[error("unbalanced braces at offset {0}")]
    UnbalancedBraces(usize),
    #[error("rule '{selector}' dropped: {source}")]
    BadSelector {
        selector: String,
        source: SelectorError,
    },
    #[error("declaration '{property}: {value}' dropped")]
    BadDeclaration { property: String, value: String },
}

/// One style rule: a selector list sharing a declaration bag.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: PropertyBag,
    /// Position within the owning sheet; the cascade combines it with
    /// sheet registration order into the global tie-break key.
    pub source_order: u32,
}

/// An ordered rule collection plus the variable table that fed it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    variables: HashMap<String, String>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Parse a sheet permissively: malformed rules and declarations are
    /// logged and skipped, a structurally broken source yields an empty
    /// rule set.
    pub fn parse(source: &str) -> Self {
        match Self::parse_inner(source, false) {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!(%err, "stylesheet discarded");
                Self::new()
            }
        }
    }

    /// Parse a sheet, failing loudly on the first malformed rule or
    /// declaration.
    pub fn parse_strict(source: &str) -> Result<Self, StylesheetError> {
        Self::parse_inner(source, true)
    }

    fn parse_inner(source: &str, strict: bool) -> Result<Self, StylesheetError> {
        let source = strip_comments(source);
        let (variables, source) = extract_variables(&source);
        let source = substitute_variables(&source, &variables);

        let mut sheet = RuleSet {
            rules: Vec::new(),
            variables,
        };

        for block in split_rule_blocks(&source)? {
            let RuleBlock { selectors, body } = block;
            let mut compiled = Vec::new();
            let mut failed = None;
            for text in selectors.split(',') {
                match Selector::compile(text) {
                    Ok(sel) => compiled.push(sel),
                    Err(err) => {
                        failed = Some((text.trim().to_string(), err));
                        break;
                    }
                }
            }
            if let Some((selector, source)) = failed {
                if strict {
                    return Err(StylesheetError::BadSelector { selector, source });
                }
                warn!(%selector, %source, "rule dropped");
                continue;
            }

            let mut declarations = PropertyBag::new();
            for declaration in body.split(';') {
                let declaration = declaration.trim();
                if declaration.is_empty() {
                    continue;
                }
                let Some((property, value)) = declaration.split_once(':') else {
                    if strict {
                        return Err(StylesheetError::BadDeclaration {
                            property: declaration.to_string(),
                            value: String::new(),
                        });
                    }
                    warn!(declaration, "declaration without ':' dropped");
                    continue;
                };
                let (property, value) = (property.trim(), value.trim());
                if value.contains('$') {
                    warn!(property, value, "unresolved variable reference");
                }
                if !declarations.set(property, value) {
                    if strict {
                        return Err(StylesheetError::BadDeclaration {
                            property: property.to_string(),
                            value: value.to_string(),
                        });
                    }
                    warn!(property, value, "declaration dropped");
                }
            }

            let source_order = sheet.rules.len() as u32;
            sheet.rules.push(Rule {
                selectors: compiled,
                declarations,
                source_order,
            });
        }

        debug!(rules = sheet.rules.len(), vars = sheet.variables.len(), "stylesheet parsed");
        Ok(sheet)
    }
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Pull `$name: value;` declarations off the top level, returning the
/// table and the remaining source.
fn extract_variables(source: &str) -> (HashMap<String, String>, String) {
    let mut variables = HashMap::new();
    let mut rest = String::with_capacity(source.len());
    let mut depth = 0usize;
    let mut line_start = true;

    // Variables only occur outside rule bodies; scan statement-wise.
    let mut buffer = String::new();
    for ch in source.chars() {
        match ch {
            '{' => {
                depth += 1;
                buffer.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                buffer.push(ch);
                if depth == 0 {
                    rest.push_str(&buffer);
                    buffer.clear();
                    line_start = true;
                }
            }
            ';' if depth == 0 => {
                let statement = buffer.trim();
                if let Some(var) = statement.strip_prefix('$') {
                    if let Some((name, value)) = var.split_once(':') {
                        variables.insert(name.trim().to_string(), value.trim().to_string());
                    } else {
                        warn!(statement, "malformed variable declaration dropped");
                    }
                } else if !statement.is_empty() {
                    warn!(statement, "stray statement dropped");
                }
                buffer.clear();
                line_start = true;
            }
            _ => {
                if !(line_start && ch.is_whitespace()) {
                    buffer.push(ch);
                    line_start = false;
                }
            }
        }
    }
    rest.push_str(&buffer);
    (variables, rest)
}

/// Longest-name-first textual replace of `$name` tokens, so `$accent`
/// never clobbers the prefix of `$accent-dark`.
fn substitute_variables(source: &str, variables: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let mut out = source.to_string();
    for name in names {
        let token = format!("${name}");
        out = out.replace(&token, &variables[name]);
    }
    out
}

struct RuleBlock {
    selectors: String,
    body: String,
}

fn split_rule_blocks(source: &str) -> Result<Vec<RuleBlock>, StylesheetError> {
    let mut blocks = Vec::new();
    let mut rest = source;
    let mut offset = 0usize;
    loop {
        let Some(open) = rest.find('{') else {
            if rest.trim().is_empty() {
                return Ok(blocks);
            }
            // Trailing junk without a body
            warn!(rest = rest.trim(), "trailing text without rule body dropped");
            return Ok(blocks);
        };
        let close = rest[open..]
            .find('}')
            .ok_or(StylesheetError::UnbalancedBraces(offset + open))?;
        blocks.push(RuleBlock {
            selectors: rest[..open].trim().to_string(),
            body: rest[open + 1..open + close].trim().to_string(),
        });
        offset += open + close + 1;
        rest = &rest[open + close + 1..];
    }
}
