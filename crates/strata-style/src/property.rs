//! Property definitions
//!
//! The fixed, enumerable set of longhand properties a bag can hold, with
//! per-property kind, inheritance, layout relevance and initial value.
//! Shorthands (`padding`, `margin`, `border`, `flex`, `gap`, `background`)
//! are expanded at `set` time and never stored.

use crate::value::{Color, Keyword, Length, StyleValue};

/// Longhand property identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropertyId {
    // Display & overflow
    Display,
    Overflow,
    Visibility,

    // Box dimensions
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,

    // Flex container
    FlexDirection,
    FlexWrap,
    JustifyContent,
    AlignItems,
    AlignContent,
    RowGap,
    ColumnGap,

    // Flex item
    FlexGrow,
    FlexShrink,
    FlexBasis,
    AlignSelf,

    // Spacing
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,

    // Border
    BorderTopWidth,
    BorderRightWidth,
    BorderBottomWidth,
    BorderLeftWidth,
    BorderColor,
    BorderRadius,

    // Paint
    Color,
    BackgroundColor,
    Opacity,

    // Typography
    FontFamily,
    FontSize,
    FontWeight,
    LineHeight,
    LetterSpacing,
    TextAlign,

    // Stacking & interaction
    ZIndex,
    Cursor,
}

/// Value kind a property accepts. A bag never stores a value whose kind
/// mismatches its property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Length,
    Color,
    Keyword,
    Number,
    Text,
}

impl PropertyId {
    /// All longhand ids, in declaration order.
    pub const ALL: &'static [PropertyId] = &[
        Self::Display,
        Self::Overflow,
        Self::Visibility,
        Self::Width,
        Self::Height,
        Self::MinWidth,
        Self::MinHeight,
        Self::MaxWidth,
        Self::MaxHeight,
        Self::FlexDirection,
        Self::FlexWrap,
        Self::JustifyContent,
        Self::AlignItems,
        Self::AlignContent,
        Self::RowGap,
        Self::ColumnGap,
        Self::FlexGrow,
        Self::FlexShrink,
        Self::FlexBasis,
        Self::AlignSelf,
        Self::MarginTop,
        Self::MarginRight,
        Self::MarginBottom,
        Self::MarginLeft,
        Self::PaddingTop,
        Self::PaddingRight,
        Self::PaddingBottom,
        Self::PaddingLeft,
        Self::BorderTopWidth,
        Self::BorderRightWidth,
        Self::BorderBottomWidth,
        Self::BorderLeftWidth,
        Self::BorderColor,
        Self::BorderRadius,
        Self::Color,
        Self::BackgroundColor,
        Self::Opacity,
        Self::FontFamily,
        Self::FontSize,
        Self::FontWeight,
        Self::LineHeight,
        Self::LetterSpacing,
        Self::TextAlign,
        Self::ZIndex,
        Self::Cursor,
    ];

    /// Parse a longhand property name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "display" => Self::Display,
            "overflow" => Self::Overflow,
            "visibility" => Self::Visibility,

            "width" => Self::Width,
            "height" => Self::Height,
            "min-width" => Self::MinWidth,
            "min-height" => Self::MinHeight,
            "max-width" => Self::MaxWidth,
            "max-height" => Self::MaxHeight,

            "flex-direction" => Self::FlexDirection,
            "flex-wrap" => Self::FlexWrap,
            "justify-content" => Self::JustifyContent,
            "align-items" => Self::AlignItems,
            "align-content" => Self::AlignContent,
            "row-gap" => Self::RowGap,
            "column-gap" => Self::ColumnGap,

            "flex-grow" => Self::FlexGrow,
            "flex-shrink" => Self::FlexShrink,
            "flex-basis" => Self::FlexBasis,
            "align-self" => Self::AlignSelf,

            "margin-top" => Self::MarginTop,
            "margin-right" => Self::MarginRight,
            "margin-bottom" => Self::MarginBottom,
            "margin-left" => Self::MarginLeft,
            "padding-top" => Self::PaddingTop,
            "padding-right" => Self::PaddingRight,
            "padding-bottom" => Self::PaddingBottom,
            "padding-left" => Self::PaddingLeft,

            "border-top-width" => Self::BorderTopWidth,
            "border-right-width" => Self::BorderRightWidth,
            "border-bottom-width" => Self::BorderBottomWidth,
            "border-left-width" => Self::BorderLeftWidth,
            "border-color" => Self::BorderColor,
            "border-radius" => Self::BorderRadius,

            "color" => Self::Color,
            "background-color" => Self::BackgroundColor,
            "opacity" => Self::Opacity,

            "font-family" => Self::FontFamily,
            "font-size" => Self::FontSize,
            "font-weight" => Self::FontWeight,
            "line-height" => Self::LineHeight,
            "letter-spacing" => Self::LetterSpacing,
            "text-align" => Self::TextAlign,

            "z-index" => Self::ZIndex,
            "cursor" => Self::Cursor,

            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Overflow => "overflow",
            Self::Visibility => "visibility",
            Self::Width => "width",
            Self::Height => "height",
            Self::MinWidth => "min-width",
            Self::MinHeight => "min-height",
            Self::MaxWidth => "max-width",
            Self::MaxHeight => "max-height",
            Self::FlexDirection => "flex-direction",
            Self::FlexWrap => "flex-wrap",
            Self::JustifyContent => "justify-content",
            Self::AlignItems => "align-items",
            Self::AlignContent => "align-content",
            Self::RowGap => "row-gap",
            Self::ColumnGap => "column-gap",
            Self::FlexGrow => "flex-grow",
            Self::FlexShrink => "flex-shrink",
            Self::FlexBasis => "flex-basis",
            Self::AlignSelf => "align-self",
            Self::MarginTop => "margin-top",
            Self::MarginRight => "margin-right",
            Self::MarginBottom => "margin-bottom",
            Self::MarginLeft => "margin-left",
            Self::PaddingTop => "padding-top",
            Self::PaddingRight => "padding-right",
            Self::PaddingBottom => "padding-bottom",
            Self::PaddingLeft => "padding-left",
            Self::BorderTopWidth => "border-top-width",
            Self::BorderRightWidth => "border-right-width",
            Self::BorderBottomWidth => "border-bottom-width",
            Self::BorderLeftWidth => "border-left-width",
            Self::BorderColor => "border-color",
            Self::BorderRadius => "border-radius",
            Self::Color => "color",
            Self::BackgroundColor => "background-color",
            Self::Opacity => "opacity",
            Self::FontFamily => "font-family",
            Self::FontSize => "font-size",
            Self::FontWeight => "font-weight",
            Self::LineHeight => "line-height",
            Self::LetterSpacing => "letter-spacing",
            Self::TextAlign => "text-align",
            Self::ZIndex => "z-index",
            Self::Cursor => "cursor",
        }
    }

    pub fn kind(self) -> PropertyKind {
        match self {
            Self::Display
            | Self::Overflow
            | Self::Visibility
            | Self::FlexDirection
            | Self::FlexWrap
            | Self::JustifyContent
            | Self::AlignItems
            | Self::AlignContent
            | Self::AlignSelf
            | Self::TextAlign => PropertyKind::Keyword,

            Self::Width
            | Self::Height
            | Self::MinWidth
            | Self::MinHeight
            | Self::MaxWidth
            | Self::MaxHeight
            | Self::RowGap
            | Self::ColumnGap
            | Self::FlexBasis
            | Self::MarginTop
            | Self::MarginRight
            | Self::MarginBottom
            | Self::MarginLeft
            | Self::PaddingTop
            | Self::PaddingRight
            | Self::PaddingBottom
            | Self::PaddingLeft
            | Self::BorderTopWidth
            | Self::BorderRightWidth
            | Self::BorderBottomWidth
            | Self::BorderLeftWidth
            | Self::BorderRadius
            | Self::FontSize
            | Self::LetterSpacing => PropertyKind::Length,

            Self::BorderColor | Self::Color | Self::BackgroundColor => PropertyKind::Color,

            Self::Opacity
            | Self::FlexGrow
            | Self::FlexShrink
            | Self::FontWeight
            | Self::LineHeight
            | Self::ZIndex => PropertyKind::Number,

            Self::FontFamily | Self::Cursor => PropertyKind::Text,
        }
    }

    /// Properties propagated from parent to child during cascading.
    pub fn is_inherited(self) -> bool {
        matches!(
            self,
            Self::Color | Self::FontSize | Self::FontFamily | Self::FontWeight
        )
    }

    /// Properties whose change requires a new geometry pass.
    pub fn is_layout_affecting(self) -> bool {
        !matches!(
            self,
            Self::Visibility
                | Self::BorderColor
                | Self::BorderRadius
                | Self::Color
                | Self::BackgroundColor
                | Self::Opacity
                | Self::FontFamily
                | Self::FontWeight
                | Self::LetterSpacing
                | Self::TextAlign
                | Self::ZIndex
                | Self::Cursor
        )
    }

    /// Declared default, used by the cascade's final fill step.
    pub fn initial_value(self) -> StyleValue {
        match self {
            Self::Display => StyleValue::Keyword(Keyword::Flex),
            Self::Overflow => StyleValue::Keyword(Keyword::Visible),
            Self::Visibility => StyleValue::Keyword(Keyword::Visible),

            Self::Width | Self::Height => StyleValue::Length(Length::AUTO),
            Self::MinWidth | Self::MinHeight => StyleValue::Length(Length::AUTO),
            Self::MaxWidth | Self::MaxHeight => StyleValue::Length(Length::AUTO),

            Self::FlexDirection => StyleValue::Keyword(Keyword::Row),
            Self::FlexWrap => StyleValue::Keyword(Keyword::Nowrap),
            Self::JustifyContent => StyleValue::Keyword(Keyword::FlexStart),
            Self::AlignItems => StyleValue::Keyword(Keyword::Stretch),
            Self::AlignContent => StyleValue::Keyword(Keyword::Stretch),
            Self::RowGap | Self::ColumnGap => StyleValue::Length(Length::zero()),

            Self::FlexGrow => StyleValue::Number(0.0),
            Self::FlexShrink => StyleValue::Number(1.0),
            Self::FlexBasis => StyleValue::Length(Length::AUTO),
            Self::AlignSelf => StyleValue::Keyword(Keyword::Auto),

            Self::MarginTop
            | Self::MarginRight
            | Self::MarginBottom
            | Self::MarginLeft
            | Self::PaddingTop
            | Self::PaddingRight
            | Self::PaddingBottom
            | Self::PaddingLeft
            | Self::BorderTopWidth
            | Self::BorderRightWidth
            | Self::BorderBottomWidth
            | Self::BorderLeftWidth
            | Self::BorderRadius => StyleValue::Length(Length::zero()),

            Self::BorderColor => StyleValue::Color(Color::TRANSPARENT),
            Self::Color => StyleValue::Color(Color::BLACK),
            Self::BackgroundColor => StyleValue::Color(Color::TRANSPARENT),
            Self::Opacity => StyleValue::Number(1.0),

            Self::FontFamily => StyleValue::Text("sans-serif".to_string()),
            Self::FontSize => StyleValue::Length(Length::px(14.0)),
            Self::FontWeight => StyleValue::Number(400.0),
            Self::LineHeight => StyleValue::Number(1.2),
            Self::LetterSpacing => StyleValue::Length(Length::zero()),
            Self::TextAlign => StyleValue::Keyword(Keyword::Left),

            Self::ZIndex => StyleValue::Number(0.0),
            Self::Cursor => StyleValue::Text("default".to_string()),
        }
    }

    /// Keyword membership check for enumerated properties.
    pub fn allows_keyword(self, keyword: Keyword) -> bool {
        use Keyword::*;
        match self {
            Self::Display => matches!(keyword, None | Flex),
            Self::Overflow => matches!(keyword, Visible | Hidden | Scroll | Auto),
            Self::Visibility => matches!(keyword, Visible | Hidden),
            Self::FlexDirection => matches!(keyword, Row | RowReverse | Column | ColumnReverse),
            Self::FlexWrap => matches!(keyword, Nowrap | Wrap | WrapReverse),
            Self::JustifyContent => matches!(
                keyword,
                FlexStart | FlexEnd | Center | SpaceBetween | SpaceAround | SpaceEvenly
            ),
            Self::AlignItems => matches!(keyword, FlexStart | FlexEnd | Center | Stretch | Baseline),
            Self::AlignContent => matches!(
                keyword,
                FlexStart | FlexEnd | Center | Stretch | SpaceBetween | SpaceAround | SpaceEvenly
            ),
            Self::AlignSelf => {
                matches!(keyword, Auto | FlexStart | FlexEnd | Center | Stretch | Baseline)
            }
            Self::TextAlign => matches!(keyword, Left | Right | Center | Justify),
            _ => false,
        }
    }
}
