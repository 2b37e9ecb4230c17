use reportflow_traits::{Canvas, RectMode};
use reportflow_types::{BorderStyle, Color, FragmentKind, Rect};

/// Draws the background and borders of a rectangular region.
///
/// The top border is only drawn for fragments starting the element and the
/// bottom border only for fragments ending it, so an element split across
/// pages looks open at the break. Used by text blocks and table cells.
pub fn paint_background_and_borders(
    canvas: &mut dyn Canvas,
    bounds: Rect,
    background: Option<Color>,
    border: &BorderStyle,
    kind: FragmentKind,
) {
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return;
    }
    if let Some(color) = background {
        paint_background(canvas, bounds, color);
    }
    paint_borders(canvas, bounds, border, kind);
}

pub fn paint_background(canvas: &mut dyn Canvas, bounds: Rect, color: Color) {
    canvas.set_fill_color(color);
    canvas.draw_rect(bounds, RectMode::Fill);
}

pub fn paint_borders(canvas: &mut dyn Canvas, bounds: Rect, border: &BorderStyle, kind: FragmentKind) {
    if border.border_width <= 0.0 || !border.any() {
        return;
    }

    // Lines are centered on the box edge, half the width is inside.
    let half = border.border_width / 2.0;
    let left = bounds.x + half;
    let right = bounds.right() - half;
    let top = bounds.y + half;
    let bottom = bounds.bottom() - half;

    canvas.set_draw_color(border.color());
    canvas.set_line_width(border.border_width);

    if border.left() {
        canvas.draw_line(left, bounds.y, left, bounds.bottom());
    }
    if border.top() && kind.draws_top() {
        canvas.draw_line(bounds.x, top, bounds.right(), top);
    }
    if border.right() {
        canvas.draw_line(right, bounds.y, right, bounds.bottom());
    }
    if border.bottom() && kind.draws_bottom() {
        canvas.draw_line(bounds.x, bottom, bounds.right(), bottom);
    }
}
