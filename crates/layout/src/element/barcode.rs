use super::ElementBase;
use crate::fragment::Fragment;
use crate::LayoutError;
use reportflow_traits::{Canvas, EvaluationContext, FontSpec};
use reportflow_types::{Color, Rect};

const BARCODE_WIDTH: f32 = 136.0;
/// Part of the declared height reserved for the value caption.
const CAPTION_HEIGHT: f32 = 22.0;

/// A CODE128 barcode.
#[derive(Debug, Clone)]
pub struct BarCodeElement {
    pub base: ElementBase,
    pub content: String,
    pub display_value: bool,

    value: String,
    barcode_key: Option<String>,
}

impl BarCodeElement {
    pub fn new(base: ElementBase, content: impl Into<String>, display_value: bool) -> Self {
        Self {
            base,
            content: content.into(),
            display_value,
            value: String::new(),
            barcode_key: None,
        }
    }

    fn image_height(&self) -> f32 {
        if self.display_value {
            self.base.height - CAPTION_HEIGHT
        } else {
            self.base.height
        }
    }

    pub fn is_printed(&self, ctx: &dyn EvaluationContext) -> Result<bool, LayoutError> {
        if self.value.is_empty() {
            return Ok(false);
        }
        self.base.is_printed(ctx)
    }

    pub fn prepare(&mut self, ctx: &dyn EvaluationContext, canvas: Option<&mut dyn Canvas>) -> Result<(), LayoutError> {
        self.value = ctx.fill_parameters(&self.content, self.base.id, "content", None)?;
        self.barcode_key = None;
        if self.value.is_empty() {
            return Ok(());
        }
        self.base.width = BARCODE_WIDTH;
        if let Some(canvas) = canvas {
            let key = canvas
                .register_barcode(&self.value)
                .map_err(|source| LayoutError::Canvas {
                    element_id: self.base.id,
                    source,
                })?;
            self.barcode_key = Some(key);
        }
        Ok(())
    }

    pub fn next_fragment(&mut self, offset_y: f32, container_height: f32) -> Result<(Option<Fragment>, bool), LayoutError> {
        if !self.base.place_atomic(offset_y, container_height)? {
            return Ok((None, false));
        }
        let block = BarCodeBlock {
            rect: Rect::new(self.base.x, offset_y, self.base.width, self.base.height),
            key: self.barcode_key.clone(),
            image_height: self.image_height(),
            caption: self.display_value.then(|| self.value.clone()),
        };
        Ok((Some(Fragment::BarCode(block)), true))
    }

    pub fn cleanup(&mut self) {
        self.barcode_key = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarCodeBlock {
    pub rect: Rect,
    pub key: Option<String>,
    pub image_height: f32,
    pub caption: Option<String>,
}

impl BarCodeBlock {
    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let Some(key) = &self.key else {
            return;
        };
        let x = offset_x + self.rect.x;
        let y = offset_y + self.rect.y;
        canvas.draw_barcode(key, Rect::new(x, y, self.rect.width, self.image_height));
        if let Some(caption) = &self.caption {
            canvas.set_font(&FontSpec::new("courier", 18.0).bold());
            canvas.set_text_color(Color::BLACK);
            let caption_width = canvas.string_width(caption);
            canvas.draw_text(x + (self.rect.width - caption_width) / 2.0, y + self.image_height + 20.0, caption);
        }
    }
}
