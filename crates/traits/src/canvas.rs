//! Canvas trait for text measurement and drawing.
//!
//! Elements only depend on measurement (`string_width`, `split_lines`) during
//! layout, and on the order of drawing calls during rendering. Everything
//! else about the output format is up to the implementation.

use crate::resource::ResourceError;
use reportflow_types::{Color, Rect, Size, TextStyle};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    #[error("Image '{key}' could not be decoded: {message}")]
    InvalidImage { key: String, message: String },

    #[error("Unsupported image type '{0}'")]
    UnsupportedImageType(String),

    #[error("Barcode content '{0}' cannot be encoded as CODE128")]
    InvalidBarcode(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Font selection used for measuring and drawing text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            bold: false,
            italic: false,
            underline: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

impl From<&TextStyle> for FontSpec {
    fn from(style: &TextStyle) -> Self {
        Self {
            family: style.font.clone(),
            size: style.font_size,
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectMode {
    Fill,
    Stroke,
}

/// Drawing surface used by the layout engine.
///
/// All coordinates are absolute page coordinates in points with the origin
/// in the top left corner.
pub trait Canvas {
    /// Selects the font used by subsequent measurement and text calls.
    fn set_font(&mut self, font: &FontSpec);

    /// Width of `text` in the current font.
    fn string_width(&self, text: &str) -> f32;

    /// Splits `text` into lines no wider than `width` in the current font.
    /// Explicit newlines always start a new line.
    fn split_lines(&self, text: &str, width: f32) -> Vec<String>;

    fn set_text_color(&mut self, color: Color);
    fn set_draw_color(&mut self, color: Color);
    fn set_fill_color(&mut self, color: Color);
    fn set_line_width(&mut self, width: f32);

    /// Draws `text` with its baseline at `y`.
    fn draw_text(&mut self, x: f32, y: f32, text: &str);
    fn draw_rect(&mut self, rect: Rect, mode: RectMode);
    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);

    /// Registers an image under `key` and returns its intrinsic size.
    ///
    /// With `data` set the image is decoded from those bytes, otherwise the
    /// key is resolved by the canvas (e.g. through a resource provider).
    fn register_image(&mut self, key: &str, data: Option<&[u8]>) -> Result<Size, CanvasError>;
    fn draw_image(&mut self, key: &str, rect: Rect);

    /// Registers a CODE128 barcode and returns the key to draw it with.
    fn register_barcode(&mut self, content: &str) -> Result<String, CanvasError>;
    fn draw_barcode(&mut self, key: &str, rect: Rect);

    fn add_link(&mut self, rect: Rect, url: &str);

    /// Starts a new page; drawing calls afterwards target the new page.
    fn add_page(&mut self);
}
