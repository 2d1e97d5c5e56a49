//! Property bag
//!
//! A typed container of optional style properties. Unset is "not
//! specified" and distinct from an explicit default; defaults are only
//! filled by the cascade's last step. Insertions are kind-checked, so a
//! bag can never hold a value that mismatches its property's kind.

use std::collections::HashMap;

use tracing::warn;

use crate::property::{PropertyId, PropertyKind};
use crate::value::{Color, Keyword, Length, StyleValue};

/// Map of set properties. Produced by parsing declarations and by the
/// cascade merge; consumed by the layout bridge and painters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    values: HashMap<PropertyId, StyleValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw declaration list (`prop: value; prop: value`) into a
    /// bag. Malformed declarations are dropped, the rest proceed.
    pub fn parse_declarations(text: &str) -> Self {
        let mut bag = Self::new();
        for declaration in text.split(';') {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                continue;
            }
            let Some((property, value)) = declaration.split_once(':') else {
                warn!(declaration, "declaration without ':' dropped");
                continue;
            };
            if !bag.set(property.trim(), value.trim()) {
                warn!(property = property.trim(), value = value.trim(), "declaration dropped");
            }
        }
        bag
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, id: PropertyId) -> Option<&StyleValue> {
        self.values.get(&id)
    }

    pub fn is_set(&self, id: PropertyId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn length(&self, id: PropertyId) -> Option<Length> {
        self.get(id).and_then(StyleValue::as_length)
    }

    pub fn color(&self, id: PropertyId) -> Option<Color> {
        self.get(id).and_then(StyleValue::as_color)
    }

    pub fn keyword(&self, id: PropertyId) -> Option<Keyword> {
        self.get(id).and_then(StyleValue::as_keyword)
    }

    pub fn number(&self, id: PropertyId) -> Option<f32> {
        self.get(id).and_then(StyleValue::as_number)
    }

    pub fn text(&self, id: PropertyId) -> Option<&str> {
        self.get(id).and_then(StyleValue::as_text)
    }

    /// Set a property from its text name and raw value. Shorthands expand
    /// into their longhands. Returns `false` for unknown names or
    /// unparseable values; never panics (unsupported declarations are
    /// silently dropped at the call site's discretion).
    pub fn set(&mut self, name: &str, raw: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let raw = raw.trim();
        match name.as_str() {
            "padding" => self.set_edges(raw, EDGE_PADDING),
            "margin" => self.set_edges(raw, EDGE_MARGIN),
            "border-width" => self.set_edges(raw, EDGE_BORDER),
            "border" => self.set_border(raw),
            "flex" => self.set_flex(raw),
            "gap" => self.set_gap(raw),
            "background" => self.set_typed(PropertyId::BackgroundColor, raw),
            _ => match PropertyId::from_name(&name) {
                Some(id) => self.set_typed(id, raw),
                None => false,
            },
        }
    }

    /// Kind-checked insert of an already-parsed value.
    pub fn set_value(&mut self, id: PropertyId, value: StyleValue) -> bool {
        let ok = match (&value, id.kind()) {
            (StyleValue::Length(_), PropertyKind::Length) => true,
            (StyleValue::Color(_), PropertyKind::Color) => true,
            (StyleValue::Keyword(k), PropertyKind::Keyword) => id.allows_keyword(*k),
            (StyleValue::Number(_), PropertyKind::Number) => true,
            (StyleValue::Text(_), PropertyKind::Text) => true,
            _ => false,
        };
        if ok {
            self.values.insert(id, value);
        }
        ok
    }

    pub fn unset(&mut self, id: PropertyId) {
        self.values.remove(&id);
    }

    fn set_typed(&mut self, id: PropertyId, raw: &str) -> bool {
        let value = match id.kind() {
            PropertyKind::Length => Length::parse(raw).map(StyleValue::Length),
            PropertyKind::Color => Color::parse(raw).map(StyleValue::Color),
            PropertyKind::Keyword => Keyword::from_str(raw).map(StyleValue::Keyword),
            PropertyKind::Number => parse_number(id, raw).map(StyleValue::Number),
            PropertyKind::Text => Some(StyleValue::Text(raw.trim_matches(['"', '\'']).to_string())),
        };
        match value {
            Some(v) => self.set_value(id, v),
            None => false,
        }
    }

    /// 1-4 value edge shorthand: `a` | `v h` | `t h b` | `t r b l`.
    fn set_edges(&mut self, raw: &str, edges: [PropertyId; 4]) -> bool {
        let parts: Vec<Length> = match raw.split_whitespace().map(Length::parse).collect() {
            Some(parts) => parts,
            None => return false,
        };
        let [top, right, bottom, left] = edges;
        let (t, r, b, l) = match parts.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return false,
        };
        self.set_value(top, StyleValue::Length(t))
            && self.set_value(right, StyleValue::Length(r))
            && self.set_value(bottom, StyleValue::Length(b))
            && self.set_value(left, StyleValue::Length(l))
    }

    /// `border: <width> <color>` in either order, both optional.
    fn set_border(&mut self, raw: &str) -> bool {
        let mut any = false;
        for part in raw.split_whitespace() {
            if let Some(width) = Length::parse(part) {
                for id in EDGE_BORDER {
                    self.set_value(id, StyleValue::Length(width));
                }
                any = true;
            } else if let Some(color) = Color::parse(part) {
                self.set_value(PropertyId::BorderColor, StyleValue::Color(color));
                any = true;
            } else {
                return false;
            }
        }
        any
    }

    /// `flex: <grow> [<shrink> [<basis>]]`.
    fn set_flex(&mut self, raw: &str) -> bool {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        match parts.as_slice() {
            [grow] => self.set_typed(PropertyId::FlexGrow, grow),
            [grow, shrink] => {
                self.set_typed(PropertyId::FlexGrow, grow)
                    && self.set_typed(PropertyId::FlexShrink, shrink)
            }
            [grow, shrink, basis] => {
                self.set_typed(PropertyId::FlexGrow, grow)
                    && self.set_typed(PropertyId::FlexShrink, shrink)
                    && self.set_typed(PropertyId::FlexBasis, basis)
            }
            _ => false,
        }
    }

    /// `gap: <row> [<column>]`.
    fn set_gap(&mut self, raw: &str) -> bool {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        match parts.as_slice() {
            [both] => {
                self.set_typed(PropertyId::RowGap, both)
                    && self.set_typed(PropertyId::ColumnGap, both)
            }
            [row, column] => {
                self.set_typed(PropertyId::RowGap, row)
                    && self.set_typed(PropertyId::ColumnGap, column)
            }
            _ => false,
        }
    }

    /// Overlay only-set fields of `other` onto self (the cascade's `Add`
    /// merge): every field set in `other` wins, unset fields are left
    /// alone.
    pub fn overlay(&mut self, other: &PropertyBag) {
        for (&id, value) in &other.values {
            self.values.insert(id, value.clone());
        }
    }

    /// Copy inheritable parent values into fields still unset here.
    pub fn apply_inherited(&mut self, parent: &PropertyBag) {
        for (&id, value) in &parent.values {
            if id.is_inherited() && !self.values.contains_key(&id) {
                self.values.insert(id, value.clone());
            }
        }
    }

    /// Fill every remaining unset field with its declared default.
    pub fn fill_defaults(&mut self) {
        for &id in PropertyId::ALL {
            self.values.entry(id).or_insert_with(|| id.initial_value());
        }
    }

    /// True when any layout-affecting field differs between two bags.
    pub fn layout_fields_differ(&self, other: &PropertyBag) -> bool {
        PropertyId::ALL
            .iter()
            .filter(|id| id.is_layout_affecting())
            .any(|id| self.values.get(id) != other.values.get(id))
    }
}

const EDGE_PADDING: [PropertyId; 4] = [
    PropertyId::PaddingTop,
    PropertyId::PaddingRight,
    PropertyId::PaddingBottom,
    PropertyId::PaddingLeft,
];

const EDGE_MARGIN: [PropertyId; 4] = [
    PropertyId::MarginTop,
    PropertyId::MarginRight,
    PropertyId::MarginBottom,
    PropertyId::MarginLeft,
];

const EDGE_BORDER: [PropertyId; 4] = [
    PropertyId::BorderTopWidth,
    PropertyId::BorderRightWidth,
    PropertyId::BorderBottomWidth,
    PropertyId::BorderLeftWidth,
];

fn parse_number(id: PropertyId, raw: &str) -> Option<f32> {
    // font-weight accepts its two keyword spellings
    if id == PropertyId::FontWeight {
        match raw {
            "normal" => return Some(400.0),
            "bold" => return Some(700.0),
            _ => {}
        }
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_property_returns_false() {
        let mut bag = PropertyBag::new();
        assert!(!bag.set("perspective-origin", "50%"));
        assert!(bag.is_empty());
    }

    #[test]
    fn kind_mismatch_rejected() {
        let mut bag = PropertyBag::new();
        assert!(!bag.set("width", "red"));
        assert!(!bag.set("color", "10px"));
        assert!(!bag.set("display", "stretch"));
        assert!(bag.is_empty());
    }

    #[test]
    fn padding_two_value_shorthand() {
        let mut bag = PropertyBag::new();
        assert!(bag.set("padding", "10px 20px"));
        assert_eq!(bag.length(PropertyId::PaddingTop), Some(Length::px(10.0)));
        assert_eq!(bag.length(PropertyId::PaddingBottom), Some(Length::px(10.0)));
        assert_eq!(bag.length(PropertyId::PaddingLeft), Some(Length::px(20.0)));
        assert_eq!(bag.length(PropertyId::PaddingRight), Some(Length::px(20.0)));
    }

    #[test]
    fn margin_four_value_shorthand() {
        let mut bag = PropertyBag::new();
        assert!(bag.set("margin", "10px 20px 30px 40px"));
        assert_eq!(bag.length(PropertyId::MarginTop), Some(Length::px(10.0)));
        assert_eq!(bag.length(PropertyId::MarginRight), Some(Length::px(20.0)));
        assert_eq!(bag.length(PropertyId::MarginBottom), Some(Length::px(30.0)));
        assert_eq!(bag.length(PropertyId::MarginLeft), Some(Length::px(40.0)));
    }

    #[test]
    fn flex_and_gap_shorthands() {
        let mut bag = PropertyBag::new();
        assert!(bag.set("flex", "1 0 auto"));
        assert_eq!(bag.number(PropertyId::FlexGrow), Some(1.0));
        assert_eq!(bag.number(PropertyId::FlexShrink), Some(0.0));
        assert_eq!(bag.length(PropertyId::FlexBasis), Some(Length::AUTO));

        assert!(bag.set("gap", "4px 8px"));
        assert_eq!(bag.length(PropertyId::RowGap), Some(Length::px(4.0)));
        assert_eq!(bag.length(PropertyId::ColumnGap), Some(Length::px(8.0)));
    }

    #[test]
    fn border_shorthand() {
        let mut bag = PropertyBag::new();
        assert!(bag.set("border", "2px #00ff00"));
        assert_eq!(bag.length(PropertyId::BorderLeftWidth), Some(Length::px(2.0)));
        assert_eq!(bag.color(PropertyId::BorderColor), Some(Color::rgb(0, 255, 0)));
    }

    #[test]
    fn overlay_is_per_field() {
        let mut base = PropertyBag::new();
        base.set("width", "100px");
        base.set("color", "red");

        let mut over = PropertyBag::new();
        over.set("width", "200px");

        base.overlay(&over);
        assert_eq!(base.length(PropertyId::Width), Some(Length::px(200.0)));
        // Field unset in the overlay survives
        assert_eq!(base.color(PropertyId::Color), Some(Color::rgb(255, 0, 0)));
    }

    #[test]
    fn inherited_fills_only_unset() {
        let mut parent = PropertyBag::new();
        parent.set("color", "blue");
        parent.set("font-size", "18px");
        parent.set("width", "300px");

        let mut child = PropertyBag::new();
        child.set("color", "red");
        child.apply_inherited(&parent);

        assert_eq!(child.color(PropertyId::Color), Some(Color::rgb(255, 0, 0)));
        assert_eq!(child.length(PropertyId::FontSize), Some(Length::px(18.0)));
        // Non-inherited properties never cross the parent boundary
        assert!(child.length(PropertyId::Width).is_none());
    }

    #[test]
    fn fill_defaults_completes_bag() {
        let mut bag = PropertyBag::new();
        bag.set("width", "10px");
        bag.fill_defaults();
        assert_eq!(bag.len(), PropertyId::ALL.len());
        assert_eq!(bag.keyword(PropertyId::Display), Some(Keyword::Flex));
        assert_eq!(bag.number(PropertyId::FlexShrink), Some(1.0));
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(10.0)));
    }

    #[test]
    fn font_weight_keywords() {
        let mut bag = PropertyBag::new();
        assert!(bag.set("font-weight", "bold"));
        assert_eq!(bag.number(PropertyId::FontWeight), Some(700.0));
    }

    #[test]
    fn parse_declarations_skips_bad_entries() {
        let bag = PropertyBag::parse_declarations("width: 10px; nope: 3; height: bogus; color: teal");
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.length(PropertyId::Width), Some(Length::px(10.0)));
        assert_eq!(bag.color(PropertyId::Color), Some(Color::rgb(0, 128, 128)));
    }
}
