//! A [`Canvas`] that records drawing calls as serializable page commands.
//!
//! Text is measured with fixed per-character metrics, which keeps layout
//! deterministic without loading font files.

use log::{debug, warn};
use reportflow_traits::canvas::{Canvas, CanvasError, FontSpec, RectMode};
use reportflow_traits::resource::ResourceProvider;
use reportflow_types::{Color, Rect, Size};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f32 = 0.5;
const BOLD_CHAR_WIDTH_FACTOR: f32 = 0.55;

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    SetFont {
        family: String,
        size: f32,
        bold: bool,
        italic: bool,
        underline: bool,
    },
    SetTextColor {
        color: Color,
    },
    SetDrawColor {
        color: Color,
    },
    SetFillColor {
        color: Color,
    },
    SetLineWidth {
        width: f32,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
    },
    Rect {
        rect: Rect,
        filled: bool,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Image {
        key: String,
        rect: Rect,
    },
    Barcode {
        key: String,
        rect: Rect,
    },
    Link {
        rect: Rect,
        url: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub commands: Vec<DrawCommand>,
}

/// The recorded output of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Page>,
}

#[derive(Debug)]
pub struct RecordingCanvas {
    page_size: Size,
    pages: Vec<Page>,
    font: FontSpec,
    images: HashMap<String, Size>,
    resources: Option<Arc<dyn ResourceProvider>>,
}

impl RecordingCanvas {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_size: Size::new(page_width, page_height),
            pages: Vec::new(),
            font: FontSpec::new("helvetica", 12.0),
            images: HashMap::new(),
            resources: None,
        }
    }

    /// Resolves images that are referenced by key instead of inline data.
    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn finish(self) -> Document {
        Document {
            page_width: self.page_size.width,
            page_height: self.page_size.height,
            pages: self.pages,
        }
    }

    fn record(&mut self, command: DrawCommand) {
        match self.pages.last_mut() {
            Some(page) => page.commands.push(command),
            None => warn!("Drawing command outside of a page is dropped: {:?}", command),
        }
    }

    fn char_width(&self) -> f32 {
        let factor = if self.font.bold { BOLD_CHAR_WIDTH_FACTOR } else { CHAR_WIDTH_FACTOR };
        self.font.size * factor
    }

    fn decode_size(key: &str, bytes: &[u8]) -> Result<Size, CanvasError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CanvasError::InvalidImage {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        if reader.format().is_none() {
            return Err(CanvasError::UnsupportedImageType(key.to_string()));
        }
        let (width, height) = reader.into_dimensions().map_err(|e| CanvasError::InvalidImage {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Size::new(width as f32, height as f32))
    }

    /// Breaks a word that is wider than `width` on character boundaries.
    fn break_word(&self, word: &str, width: f32, lines: &mut Vec<String>) -> String {
        let mut current = String::new();
        for c in word.chars() {
            current.push(c);
            if current.chars().count() > 1 && self.string_width(&current) > width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
        current
    }
}

impl Canvas for RecordingCanvas {
    fn set_font(&mut self, font: &FontSpec) {
        self.font = font.clone();
        // measuring happens before the first page
        if self.pages.is_empty() {
            return;
        }
        self.record(DrawCommand::SetFont {
            family: font.family.clone(),
            size: font.size,
            bold: font.bold,
            italic: font.italic,
            underline: font.underline,
        });
    }

    fn string_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width()
    }

    fn split_lines(&self, text: &str, width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
                let candidate = if line.is_empty() {
                    word.to_string()
                } else {
                    format!("{} {}", line, word)
                };
                if self.string_width(&candidate) <= width {
                    line = candidate;
                    continue;
                }
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                line = if self.string_width(word) > width {
                    self.break_word(word, width, &mut lines)
                } else {
                    word.to_string()
                };
            }
            lines.push(line);
        }
        lines
    }

    fn set_text_color(&mut self, color: Color) {
        self.record(DrawCommand::SetTextColor { color });
    }

    fn set_draw_color(&mut self, color: Color) {
        self.record(DrawCommand::SetDrawColor { color });
    }

    fn set_fill_color(&mut self, color: Color) {
        self.record(DrawCommand::SetFillColor { color });
    }

    fn set_line_width(&mut self, width: f32) {
        self.record(DrawCommand::SetLineWidth { width });
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        self.record(DrawCommand::Text {
            x,
            y,
            text: text.to_string(),
        });
    }

    fn draw_rect(&mut self, rect: Rect, mode: RectMode) {
        self.record(DrawCommand::Rect {
            rect,
            filled: mode == RectMode::Fill,
        });
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.record(DrawCommand::Line { x1, y1, x2, y2 });
    }

    fn register_image(&mut self, key: &str, data: Option<&[u8]>) -> Result<Size, CanvasError> {
        if let Some(size) = self.images.get(key) {
            return Ok(*size);
        }
        let size = match (data, &self.resources) {
            (Some(bytes), _) => Self::decode_size(key, bytes)?,
            (None, Some(resources)) => {
                let bytes = resources.load(key)?;
                Self::decode_size(key, &bytes)?
            }
            (None, None) => {
                return Err(CanvasError::InvalidImage {
                    key: key.to_string(),
                    message: "no image data and no resource provider".to_string(),
                });
            }
        };
        debug!("Registered image '{}' ({}x{})", key, size.width, size.height);
        self.images.insert(key.to_string(), size);
        Ok(size)
    }

    fn draw_image(&mut self, key: &str, rect: Rect) {
        self.record(DrawCommand::Image {
            key: key.to_string(),
            rect,
        });
    }

    fn register_barcode(&mut self, content: &str) -> Result<String, CanvasError> {
        if content.is_empty() || !content.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(CanvasError::InvalidBarcode(content.to_string()));
        }
        Ok(format!("code128:{}", content))
    }

    fn draw_barcode(&mut self, key: &str, rect: Rect) {
        self.record(DrawCommand::Barcode {
            key: key.to_string(),
            rect,
        });
    }

    fn add_link(&mut self, rect: Rect, url: &str) {
        self.record(DrawCommand::Link {
            rect,
            url: url.to_string(),
        });
    }

    fn add_page(&mut self) {
        self.pages.push(Page::default());
    }
}
