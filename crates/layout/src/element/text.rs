use super::ElementBase;
use crate::algorithms::{consume, fits};
use crate::fragment::Fragment;
use crate::painting::paint_background_and_borders;
use crate::LayoutError;
use log::debug;
use reportflow_traits::{value_to_string, Canvas, EvaluationContext, FontSpec};
use reportflow_types::{
    Color, FragmentKind, HorizontalAlignment, Parameter, ParameterType, Rect, TextStyle, VerticalAlignment,
};

/// Text with an optional pattern, link and conditional style. Splits line by
/// line across pages.
#[derive(Debug, Clone)]
pub struct TextElement {
    pub base: ElementBase,
    pub content: String,
    /// `content` is an expression instead of a template string.
    pub eval: bool,
    pub pattern: String,
    pub link: String,
    pub style: TextStyle,
    pub cs_condition: String,
    pub conditional_style: Option<TextStyle>,
    pub always_print_on_same_page: bool,
    pub(crate) in_table: bool,

    used_style: TextStyle,
    resolved_link: Option<String>,
    lines: Vec<String>,
    line_index: usize,
    text_height: f32,
    space_top: f32,
    space_bottom: f32,
    total_height: f32,
}

impl TextElement {
    pub fn new(base: ElementBase, content: impl Into<String>) -> Self {
        Self {
            base,
            content: content.into(),
            eval: false,
            pattern: String::new(),
            link: String::new(),
            style: TextStyle::default(),
            cs_condition: String::new(),
            conditional_style: None,
            always_print_on_same_page: false,
            in_table: false,
            used_style: TextStyle::default(),
            resolved_link: None,
            lines: Vec::new(),
            line_index: 0,
            text_height: 0.0,
            space_top: 0.0,
            space_bottom: 0.0,
            total_height: 0.0,
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_eval(mut self, eval: bool) -> Self {
        self.eval = eval;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_conditional_style(mut self, condition: impl Into<String>, style: TextStyle) -> Self {
        self.cs_condition = condition.into();
        self.conditional_style = Some(style);
        self
    }

    pub fn with_always_print_on_same_page(mut self, always: bool) -> Self {
        self.always_print_on_same_page = always;
        self
    }

    /// Lines produced by the last `prepare`.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn total_height(&self) -> f32 {
        self.total_height
    }

    pub fn used_style(&self) -> &TextStyle {
        &self.used_style
    }

    pub(crate) fn apply_row_background(&mut self, color: Color) {
        if self.used_style.background_color.is_none() {
            self.used_style.background_color = Some(color);
        }
    }

    fn resolve_content(&self, ctx: &dyn EvaluationContext) -> Result<String, LayoutError> {
        let id = self.base.id;
        let pattern = (!self.pattern.is_empty()).then_some(self.pattern.as_str());
        if !self.eval {
            return Ok(ctx.fill_parameters(&self.content, id, "content", pattern)?);
        }
        let value = ctx.evaluate(&self.content, id, "content")?;
        Ok(match pattern {
            Some(pattern) if value.is_number() => {
                let parameter = Parameter::new("", ParameterType::Number);
                ctx.formatted_value(&value, &parameter, Some(pattern), false)
            }
            _ => value_to_string(&value),
        })
    }

    pub fn prepare(&mut self, ctx: &dyn EvaluationContext, canvas: Option<&mut dyn Canvas>) -> Result<(), LayoutError> {
        let id = self.base.id;
        let content = self.resolve_content(ctx)?;

        self.resolved_link = if self.link.is_empty() {
            None
        } else {
            Some(ctx.fill_parameters(&self.link, id, "link", None)?)
        };

        let conditional = !self.cs_condition.is_empty() && ctx.evaluate_condition(&self.cs_condition, id, "cs_condition")?;
        self.used_style = match (&self.conditional_style, conditional) {
            (Some(style), true) => style.clone(),
            _ => self.style.clone(),
        };

        let padding = self.used_style.padding();
        let available_width = self.base.width - padding.left - padding.right;
        self.line_index = 0;

        match canvas {
            Some(canvas) => {
                canvas.set_font(&FontSpec::from(&self.used_style));
                self.lines = if content.is_empty() {
                    Vec::new()
                } else {
                    canvas.split_lines(&content, available_width)
                };
                self.text_height = match self.lines.len() {
                    0 => 0.0,
                    n => (n - 1) as f32 * self.used_style.line_height() + self.used_style.font_size,
                };
                if self.in_table {
                    self.space_top = 0.0;
                    self.space_bottom = 0.0;
                    self.total_height = (self.text_height + padding.top + padding.bottom).max(self.base.height);
                } else {
                    self.set_height(self.base.height);
                }
            }
            None => {
                // Keep one line so emptiness is still known while verifying.
                self.lines = if content.is_empty() { Vec::new() } else { vec![content] };
                self.text_height = 0.0;
                self.total_height = self.base.height;
            }
        }
        Ok(())
    }

    /// Distributes the space between the text and `height` according to the
    /// vertical alignment.
    pub(crate) fn set_height(&mut self, height: f32) {
        self.base.height = height;
        self.space_top = 0.0;
        self.space_bottom = 0.0;
        let padding = self.used_style.padding();
        let total_height = if self.text_height > 0.0 {
            self.text_height + padding.top + padding.bottom
        } else {
            0.0
        };
        if total_height < height {
            let remaining = height - total_height;
            match self.used_style.vertical_alignment {
                VerticalAlignment::Top => self.space_bottom = remaining,
                VerticalAlignment::Middle => {
                    self.space_top = remaining / 2.0;
                    self.space_bottom = remaining / 2.0;
                }
                VerticalAlignment::Bottom => self.space_top = remaining,
            }
        }
        self.total_height = total_height + self.space_top + self.space_bottom;
    }

    /// Height of the lines and spacing not placed yet.
    pub(crate) fn remaining_height(&self) -> f32 {
        if self.base.rendering_complete {
            return 0.0;
        }
        let padding = self.used_style.padding();
        let mut height = self.space_top + self.space_bottom;
        let left = self.lines.len().saturating_sub(self.line_index);
        if left > 0 {
            height += (left - 1) as f32 * self.used_style.line_height() + self.used_style.font_size + padding.bottom;
            if self.line_index == 0 {
                height += padding.top;
            }
        }
        height
    }

    pub fn is_printed(&self, ctx: &dyn EvaluationContext) -> Result<bool, LayoutError> {
        if self.base.remove_empty_element && self.lines.is_empty() {
            return Ok(false);
        }
        self.base.is_printed(ctx)
    }

    pub fn next_fragment(&mut self, offset_y: f32, container_height: f32) -> Result<(Option<Fragment>, bool), LayoutError> {
        let available_height = container_height - offset_y;
        if self.always_print_on_same_page
            && self.base.first_render_element
            && !fits(self.total_height, available_height)
            && offset_y != 0.0
        {
            return Ok((None, false));
        }

        let style = &self.used_style;
        let padding = style.padding();
        let line_height = style.line_height();
        let space_top_before = self.space_top;
        let first_index = self.line_index;

        let mut remaining_height = available_height;
        let mut block_height = 0.0;
        let mut text_height = 0.0;
        let mut text_offset_y = 0.0;

        if self.space_top > 0.0 {
            let taken = consume(&mut self.space_top, remaining_height);
            block_height += taken;
            remaining_height -= taken;
            text_offset_y = taken;
        }

        if self.space_top == 0.0 {
            let mut first_line = true;
            while self.line_index < self.lines.len() {
                let last_line = self.line_index == self.lines.len() - 1;
                let current_line_height = if first_line { style.font_size } else { line_height };
                let mut needed = current_line_height;
                if self.line_index == 0 {
                    needed += padding.top;
                }
                if last_line {
                    needed += padding.bottom;
                }
                if !fits(needed, remaining_height) {
                    break;
                }
                remaining_height -= needed;
                block_height += needed;
                text_height += current_line_height;
                self.line_index += 1;
                first_line = false;
            }
        }

        if self.line_index >= self.lines.len() && self.space_bottom > 0.0 {
            let taken = consume(&mut self.space_bottom, remaining_height);
            block_height += taken;
            remaining_height -= taken;
        }

        if block_height == 0.0 && self.line_index == first_index && first_index < self.lines.len() {
            // Not even one line fits.
            if offset_y != 0.0 {
                self.space_top = space_top_before;
                return Ok((None, false));
            }
            let first_padding = if first_index == 0 { padding.top } else { 0.0 };
            return Err(LayoutError::ElementTooLarge {
                element_id: self.base.id,
                field: "size",
                needed: style.font_size + first_padding,
                available: container_height,
            });
        }

        let complete = self.line_index >= self.lines.len() && self.space_top == 0.0 && self.space_bottom == 0.0;
        if !complete && remaining_height > 0.0 {
            // Draw the block until the end of the container.
            block_height += remaining_height;
        }

        let kind = FragmentKind::for_slice(self.base.first_render_element, complete);
        if kind == FragmentKind::Last && style.vertical_alignment == VerticalAlignment::Bottom {
            let bottom_offset = block_height - padding.bottom - text_height;
            if bottom_offset > 0.0 {
                text_offset_y = bottom_offset;
            }
        }

        debug!(
            "Text {}: lines {}..{} of {} at offset {:.2}, height {:.2} ({:?})",
            self.base.id,
            first_index,
            self.line_index,
            self.lines.len(),
            offset_y,
            block_height,
            kind
        );

        let block = TextBlock {
            rect: Rect::new(self.base.x, offset_y, self.base.width, block_height),
            text_offset_y,
            lines: self.lines[first_index..self.line_index].to_vec(),
            line_height,
            kind,
            style: style.clone(),
            link: self.resolved_link.clone(),
        };
        self.base.first_render_element = false;
        self.base.render_y = offset_y;
        self.base.render_bottom = offset_y + block_height;
        self.base.rendering_complete = complete;
        Ok((Some(Fragment::Text(block)), complete))
    }
}

/// A slice of text lines placed on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub rect: Rect,
    pub text_offset_y: f32,
    pub lines: Vec<String>,
    pub line_height: f32,
    pub kind: FragmentKind,
    pub style: TextStyle,
    pub link: Option<String>,
}

impl TextBlock {
    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let style = &self.style;
        let bounds = Rect::new(offset_x + self.rect.x, offset_y + self.rect.y, self.rect.width, self.rect.height);
        paint_background_and_borders(canvas, bounds, style.background_color, &style.border, self.kind);

        let padding = style.padding();
        let mut y = bounds.y + self.text_offset_y;
        if self.kind.draws_top() {
            y += padding.top;
        }

        let justified = style.horizontal_alignment == HorizontalAlignment::Justify && self.lines.len() > 1;
        let mut font = FontSpec::from(style);
        // Justified words are drawn one by one, the underline is drawn per line instead.
        font.underline = style.underline && !justified;
        canvas.set_font(&font);
        canvas.set_text_color(style.text_color());
        canvas.set_draw_color(style.text_color());

        let x = bounds.x + padding.left;
        let width = self.rect.width - padding.left - padding.right;
        let last_index = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            self.render_line(canvas, line, x, y, width, i == last_index);
            y += self.line_height;
        }
    }

    fn render_line(&self, canvas: &mut dyn Canvas, line: &str, x: f32, y: f32, width: f32, last_line: bool) {
        let style = &self.style;
        let baseline = y + style.font_size * 0.8;
        let mut line_width = 0.0;
        let mut offset_x = 0.0;

        match style.horizontal_alignment {
            HorizontalAlignment::Justify if !last_line => {
                let words: Vec<&str> = line.split_whitespace().collect();
                let word_widths: Vec<f32> = words.iter().map(|w| canvas.string_width(w)).collect();
                let total: f32 = word_widths.iter().sum();
                let word_spacing = if words.len() > 1 {
                    (width - total) / (words.len() - 1) as f32
                } else {
                    0.0
                };
                let mut word_x = x;
                for (word, word_width) in words.iter().zip(&word_widths) {
                    canvas.draw_text(word_x, baseline, word);
                    word_x += word_width + word_spacing;
                }
                line_width = if words.len() > 1 {
                    width
                } else {
                    word_widths.first().copied().unwrap_or(0.0)
                };
                if style.underline {
                    let underline_y = baseline + style.font_size * 0.1;
                    canvas.set_line_width(style.font_size / 20.0);
                    canvas.draw_line(x, underline_y, x + line_width, underline_y);
                }
            }
            HorizontalAlignment::Center | HorizontalAlignment::Right => {
                line_width = canvas.string_width(line);
                let space = width - line_width;
                offset_x = if style.horizontal_alignment == HorizontalAlignment::Center {
                    space / 2.0
                } else {
                    space
                };
                canvas.draw_text(x + offset_x, baseline, line);
            }
            _ => canvas.draw_text(x, baseline, line),
        }

        if style.strikethrough || self.link.is_some() {
            if line_width == 0.0 {
                line_width = canvas.string_width(line);
            }
        }
        if style.strikethrough {
            let strike_y = y + style.font_size * 0.5;
            canvas.set_line_width(style.font_size / 20.0);
            canvas.draw_line(x + offset_x, strike_y, x + offset_x + line_width, strike_y);
        }
        if let Some(link) = &self.link {
            canvas.add_link(Rect::new(x + offset_x, y, line_width, style.font_size), link);
        }
    }
}
