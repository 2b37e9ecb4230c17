use super::ElementBase;
use crate::fragment::Fragment;
use crate::LayoutError;
use reportflow_traits::Canvas;
use reportflow_types::{Color, Rect};

/// A horizontal line; the declared height is the stroke width.
#[derive(Debug, Clone)]
pub struct LineElement {
    pub base: ElementBase,
    pub color: Color,
}

impl LineElement {
    pub fn new(base: ElementBase, color: Color) -> Self {
        Self { base, color }
    }

    pub fn next_fragment(&mut self, offset_y: f32, container_height: f32) -> Result<(Option<Fragment>, bool), LayoutError> {
        if !self.base.place_atomic(offset_y, container_height)? {
            return Ok((None, false));
        }
        let block = LineBlock {
            rect: Rect::new(self.base.x, offset_y, self.base.width, self.base.height),
            color: self.color,
        };
        Ok((Some(Fragment::Line(block)), true))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBlock {
    pub rect: Rect,
    pub color: Color,
}

impl LineBlock {
    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let x = offset_x + self.rect.x;
        let y = offset_y + self.rect.y + self.rect.height / 2.0;
        canvas.set_draw_color(self.color);
        canvas.set_line_width(self.rect.height);
        canvas.draw_line(x, y, x + self.rect.width, y);
    }
}
