use crate::color::{self, Color};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Visibility rule of the page header and footer bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandDisplay {
    #[default]
    Always,
    Never,
    NotOnFirstPage,
}

impl BandDisplay {
    pub fn is_visible_on(self, page_number: usize) -> bool {
        match self {
            BandDisplay::Always => true,
            BandDisplay::Never => false,
            BandDisplay::NotOnFirstPage => page_number != 1,
        }
    }
}

/// Which slice of an element a fragment represents. Selects the borders and
/// paddings drawn for it: top decorations only on `Complete`/`First`,
/// bottom decorations only on `Complete`/`Last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    #[default]
    Complete,
    First,
    Between,
    Last,
}

impl FragmentKind {
    /// Chooses the kind for a fragment given whether it is the element's
    /// first fragment and whether the element completed with it.
    pub fn for_slice(first: bool, complete: bool) -> Self {
        match (first, complete) {
            (true, true) => FragmentKind::Complete,
            (true, false) => FragmentKind::First,
            (false, true) => FragmentKind::Last,
            (false, false) => FragmentKind::Between,
        }
    }

    pub fn draws_top(self) -> bool {
        matches!(self, FragmentKind::Complete | FragmentKind::First)
    }

    pub fn draws_bottom(self) -> bool {
        matches!(self, FragmentKind::Complete | FragmentKind::Last)
    }
}

/// Border layout of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBorder {
    Grid,
    FrameRow,
    Frame,
    Row,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderStyle {
    #[serde(deserialize_with = "color::deserialize_optional")]
    pub border_color: Option<Color>,
    pub border_width: f32,
    pub border_all: bool,
    pub border_left: bool,
    pub border_top: bool,
    pub border_right: bool,
    pub border_bottom: bool,
}

impl BorderStyle {
    pub fn left(&self) -> bool {
        self.border_all || self.border_left
    }

    pub fn top(&self) -> bool {
        self.border_all || self.border_top
    }

    pub fn right(&self) -> bool {
        self.border_all || self.border_right
    }

    pub fn bottom(&self) -> bool {
        self.border_all || self.border_bottom
    }

    pub fn any(&self) -> bool {
        self.left() || self.top() || self.right() || self.bottom()
    }

    pub fn color(&self) -> Color {
        self.border_color.unwrap_or(Color::BLACK)
    }

    pub fn top_width(&self) -> f32 {
        if self.top() { self.border_width } else { 0.0 }
    }

    pub fn bottom_width(&self) -> f32 {
        if self.bottom() { self.border_width } else { 0.0 }
    }
}

/// Paddings including the width of the borders drawn on each side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    #[serde(flatten)]
    pub border: BorderStyle,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    #[serde(deserialize_with = "color::deserialize_optional")]
    pub text_color: Option<Color>,
    #[serde(deserialize_with = "color::deserialize_optional")]
    pub background_color: Option<Color>,
    pub font: String,
    pub font_size: f32,
    pub line_spacing: f32,
    pub padding_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            border: BorderStyle::default(),
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            horizontal_alignment: HorizontalAlignment::Left,
            vertical_alignment: VerticalAlignment::Top,
            text_color: None,
            background_color: None,
            font: "helvetica".to_string(),
            font_size: 12.0,
            line_spacing: 1.0,
            padding_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
        }
    }
}

impl TextStyle {
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    /// Paddings with the border widths added for each bordered side.
    pub fn padding(&self) -> Padding {
        let width = self.border.border_width;
        let add = |on: bool| if on { width } else { 0.0 };
        Padding {
            left: self.padding_left + add(self.border.left()),
            top: self.padding_top + add(self.border.top()),
            right: self.padding_right + add(self.border.right()),
            bottom: self.padding_bottom + add(self.border.bottom()),
        }
    }

    /// Height of one line. A zero line spacing in a template means single spacing.
    pub fn line_height(&self) -> f32 {
        let spacing = if self.line_spacing > 0.0 { self.line_spacing } else { 1.0 };
        self.font_size * spacing
    }

    pub fn text_color(&self) -> Color {
        self.text_color.unwrap_or(Color::BLACK)
    }
}
