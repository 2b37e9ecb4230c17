use crate::fragment::Fragment;
use reportflow_traits::Canvas;
use reportflow_types::{Color, Rect, TableBorder};

/// The cells of one table row placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBlock {
    pub height: f32,
    pub column_widths: Vec<f32>,
    pub cells: Vec<Fragment>,
}

/// The rows of a table placed on one page, drawn with the table borders.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub rect: Rect,
    pub rows: Vec<RowBlock>,
    pub border: TableBorder,
    pub border_color: Color,
    pub border_width: f32,
    /// No further rows fit on this page.
    pub(crate) full: bool,
    pub(crate) content_rows: usize,
}

impl TableBlock {
    pub(crate) fn new(rect: Rect, border: TableBorder, border_color: Color, border_width: f32) -> Self {
        Self {
            rect,
            rows: Vec::new(),
            border,
            border_color,
            border_width,
            full: false,
            content_rows: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn push_row(&mut self, row: RowBlock) {
        self.rect.height += row.height;
        self.rows.push(row);
    }

    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        for row in &self.rows {
            for cell in &row.cells {
                cell.render(offset_x, offset_y, canvas);
            }
        }
        self.render_borders(offset_x, offset_y, canvas);
    }

    fn render_borders(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let Some(first) = self.rows.first() else {
            return;
        };
        if self.border == TableBorder::None || self.border_width <= 0.0 {
            return;
        }
        canvas.set_draw_color(self.border_color);
        canvas.set_line_width(self.border_width);

        // Vertical lines are drawn inside the outer columns so they align
        // with the borders of elements outside the table.
        let half = self.border_width / 2.0;
        let left = offset_x + self.rect.x;
        let x1 = left + half;
        let x2 = left + first.column_widths.iter().sum::<f32>() - half;
        let y1 = offset_y + self.rect.y;
        let y2 = y1 + self.rect.height;

        if matches!(self.border, TableBorder::Grid | TableBorder::FrameRow | TableBorder::Frame) {
            canvas.draw_line(x1, y1, x1, y2);
            canvas.draw_line(x2, y1, x2, y2);
        }
        canvas.draw_line(x1, y1, x2, y1);
        if self.border != TableBorder::Frame {
            let mut y = y1;
            for row in &self.rows[..self.rows.len() - 1] {
                y += row.height;
                canvas.draw_line(x1, y, x2, y);
            }
        }
        canvas.draw_line(x1, y2, x2, y2);

        if self.border == TableBorder::Grid {
            let mut x = x1;
            for width in &first.column_widths[..first.column_widths.len().saturating_sub(1)] {
                x += width;
                canvas.draw_line(x, y1, x, y2);
            }
        }
    }
}
