//! A bordered box around its own flow of elements.

use crate::algorithms::fits;
use crate::container::Container;
use crate::element::{Element, ElementBase};
use crate::fragment::Fragment;
use crate::painting::{paint_background, paint_borders};
use crate::LayoutError;
use log::debug;
use reportflow_traits::{Canvas, EvaluationContext};
use reportflow_types::{BorderStyle, Color, FragmentKind, Rect};

/// Layout of the first page that was computed but did not fit below the
/// content already on it.
#[derive(Debug, Clone, Copy)]
struct DeferredLayout {
    complete: bool,
    content_height: f32,
}

/// Frame element. Its children are laid out in a private container without
/// page breaks; positions are relative to the frame's content area.
#[derive(Debug, Clone)]
pub struct FrameElement {
    pub base: ElementBase,
    pub border: BorderStyle,
    pub background_color: Option<Color>,
    /// Shrink to the children instead of keeping the declared height.
    pub shrink_to_content: bool,
    container: Container,

    deferred: Option<DeferredLayout>,
    last_kind: Option<FragmentKind>,
    prev_content_height: f32,
    rendered_height: f32,
}

impl FrameElement {
    pub fn new(base: ElementBase) -> Self {
        let container = Container::new(format!("frame_{}", base.id), base.width, base.height, false);
        Self {
            base,
            border: BorderStyle::default(),
            background_color: None,
            shrink_to_content: false,
            container,
            deferred: None,
            last_kind: None,
            prev_content_height: 0.0,
            rendered_height: 0.0,
        }
    }

    pub fn with_border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn with_background(mut self, color: Option<Color>) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_shrink_to_content(mut self, shrink: bool) -> Self {
        self.shrink_to_content = shrink;
        self
    }

    pub fn with_element(mut self, element: impl Into<Element>) -> Self {
        self.container.add(element);
        self
    }

    pub fn add(&mut self, element: impl Into<Element>) {
        self.container.add(element);
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        self.container.prepare(ctx, canvas, verify_only)?;
        self.deferred = None;
        self.last_kind = None;
        self.prev_content_height = 0.0;
        self.rendered_height = 0.0;
        Ok(())
    }

    /// Height of the frame for the content laid out on the current page. The
    /// declared height is a minimum spread over all pages.
    fn used_height(&self) -> f32 {
        let mut height = self.container.fragments_bottom() + self.border.bottom_width();
        if self.last_kind.is_none() {
            height += self.border.top_width();
        }
        if !self.shrink_to_content {
            height = height.max(self.base.height - self.rendered_height);
        }
        height
    }

    pub fn next_fragment(
        &mut self,
        offset_y: f32,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(Option<Fragment>, bool), LayoutError> {
        let starting = self.last_kind.is_none();
        let available_height = container_height - offset_y;
        // The bottom border is reserved on every page even though it is only
        // drawn on the last one.
        let mut content_height = container_height - self.border.bottom_width();
        if starting {
            content_height -= self.border.top_width();
        }

        if self.base.first_render_element {
            self.base.first_render_element = false;
            let complete = self.container.create_fragments(content_height, ctx, canvas)?;
            let needed = self.used_height();

            if complete && fits(needed, available_height) {
                let block = self.take_block(offset_y, needed, FragmentKind::Complete, content_height);
                return Ok((Some(block), true));
            }
            if offset_y == 0.0 {
                let block = self.take_block(offset_y, available_height, FragmentKind::First, content_height);
                return Ok((Some(block), false));
            }
            debug!(
                "Frame {}: needs {:.2} but only {:.2} left, moving to the next page",
                self.base.id, needed, available_height
            );
            self.deferred = Some(DeferredLayout {
                complete,
                content_height,
            });
            return Ok((None, false));
        }

        let complete = match self.deferred.take() {
            Some(deferred) if deferred.content_height == content_height => deferred.complete,
            Some(_) => {
                // The page geometry changed, the cached layout is stale.
                self.container.prepare(ctx, Some(&mut *canvas), false)?;
                self.container.create_fragments(content_height, ctx, canvas)?
            }
            None => {
                self.container.advance_baseline(self.prev_content_height);
                self.container.create_fragments(content_height, ctx, canvas)?
            }
        };

        let used_height = self.used_height();
        let (height, complete) = if complete && fits(used_height, available_height) {
            (used_height, true)
        } else {
            (available_height, false)
        };
        let kind = FragmentKind::for_slice(starting, complete);
        let block = self.take_block(offset_y, height, kind, content_height);
        Ok((Some(block), complete))
    }

    fn take_block(&mut self, offset_y: f32, height: f32, kind: FragmentKind, content_height: f32) -> Fragment {
        self.base.render_y = offset_y;
        self.base.render_bottom = offset_y + height;
        self.base.rendering_complete = kind.draws_bottom();
        self.last_kind = Some(kind);
        self.prev_content_height = content_height;
        self.rendered_height += height;

        Fragment::Frame(FrameBlock {
            rect: Rect::new(self.base.x, offset_y, self.base.width, height),
            kind,
            border: self.border.clone(),
            background: self.background_color,
            fragments: self.container.take_fragments(),
        })
    }

    pub fn cleanup(&mut self) {
        self.container.cleanup();
    }
}

/// The part of a frame placed on one page with the fragments of its children.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBlock {
    pub rect: Rect,
    pub kind: FragmentKind,
    pub border: BorderStyle,
    pub background: Option<Color>,
    pub fragments: Vec<Fragment>,
}

impl FrameBlock {
    /// Area inside the borders drawn for this slice.
    fn content_rect(&self, bounds: Rect) -> Rect {
        let width = self.border.border_width;
        let mut content = bounds;
        if self.border.left() {
            content.x += width;
            content.width -= width;
        }
        if self.border.right() {
            content.width -= width;
        }
        if self.border.top() && self.kind.draws_top() {
            content.y += width;
            content.height -= width;
        }
        if self.border.bottom() && self.kind.draws_bottom() {
            content.height -= width;
        }
        content
    }

    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let bounds = Rect::new(offset_x + self.rect.x, offset_y + self.rect.y, self.rect.width, self.rect.height);
        let content = self.content_rect(bounds);

        if let Some(color) = self.background {
            paint_background(canvas, content, color);
        }
        for fragment in &self.fragments {
            fragment.render(content.x, content.y, canvas);
        }
        paint_borders(canvas, bounds, &self.border, self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_logger, DrawCall, TestCanvas, TestContext};
    use crate::TextElement;
    use reportflow_traits::RectMode;
    use reportflow_types::{ElementId, TextStyle};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn text(id: u64, y: f32, content: &str) -> TextElement {
        TextElement::new(ElementBase::new(ElementId(id), 0.0, y, 100.0, 10.0), content)
            .with_style(TextStyle::default().with_font_size(10.0))
    }

    fn frame(height: f32) -> FrameElement {
        FrameElement::new(ElementBase::new(ElementId(1), 20.0, 0.0, 100.0, height)).with_element(text(2, 0.0, "inside"))
    }

    fn unwrap_frame(fragment: Option<Fragment>) -> FrameBlock {
        match fragment {
            Some(Fragment::Frame(block)) => block,
            other => panic!("expected a frame block, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_that_fits_is_one_complete_fragment() -> TestResult {
        init_logger();
        let mut ctx = TestContext::default();
        let mut canvas = TestCanvas::default();
        let mut element = frame(150.0);
        element.prepare(&mut ctx, Some(&mut canvas), false)?;

        let (fragment, complete) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let block = unwrap_frame(fragment);
        assert!(complete);
        assert_eq!(block.kind, FragmentKind::Complete);
        assert_eq!(block.rect.height, 150.0);
        assert_eq!(block.fragments.len(), 1);
        Ok(())
    }

    #[test]
    fn test_declared_height_spreads_over_pages() -> TestResult {
        let mut ctx = TestContext::default();
        let mut canvas = TestCanvas::default();
        let mut element = frame(300.0);
        element.prepare(&mut ctx, Some(&mut canvas), false)?;

        let (fragment, complete) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let first = unwrap_frame(fragment);
        assert!(!complete);
        assert_eq!((first.kind, first.rect.height), (FragmentKind::First, 200.0));

        let (fragment, complete) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let last = unwrap_frame(fragment);
        assert!(complete);
        assert_eq!((last.kind, last.rect.height), (FragmentKind::Last, 100.0));
        assert!(last.fragments.is_empty());
        Ok(())
    }

    #[test]
    fn test_deferred_layout_is_reused_on_the_next_page() -> TestResult {
        let mut ctx = TestContext::default();
        let mut canvas = TestCanvas::default();
        let mut element = frame(150.0);
        element.prepare(&mut ctx, Some(&mut canvas), false)?;

        let (fragment, complete) = element.next_fragment(100.0, 200.0, &mut ctx, &mut canvas)?;
        assert!(fragment.is_none());
        assert!(!complete);

        let (fragment, complete) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let block = unwrap_frame(fragment);
        assert!(complete);
        assert_eq!(block.kind, FragmentKind::Complete);
        assert_eq!(block.rect.y, 0.0);
        assert_eq!(block.fragments.len(), 1);
        Ok(())
    }

    #[test]
    fn test_children_continue_below_the_consumed_part() -> TestResult {
        let mut ctx = TestContext::default();
        let mut canvas = TestCanvas::default();
        let mut element = FrameElement::new(ElementBase::new(ElementId(1), 0.0, 0.0, 100.0, 10.0))
            .with_shrink_to_content(true)
            .with_element(text(2, 0.0, "top"))
            .with_element(text(3, 250.0, "bottom"));
        element.prepare(&mut ctx, Some(&mut canvas), false)?;

        let (fragment, _) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let first = unwrap_frame(fragment);
        assert_eq!(first.kind, FragmentKind::First);
        assert_eq!(first.fragments.len(), 1);

        let (fragment, complete) = element.next_fragment(0.0, 200.0, &mut ctx, &mut canvas)?;
        let last = unwrap_frame(fragment);
        assert!(complete);
        assert_eq!(last.fragments.len(), 1);
        assert_eq!(last.fragments[0].render_y(), 50.0);
        assert_eq!(last.rect.height, 60.0);
        Ok(())
    }

    #[test]
    fn test_render_offsets_children_by_the_border() {
        let block = FrameBlock {
            rect: Rect::new(10.0, 5.0, 100.0, 50.0),
            kind: FragmentKind::Complete,
            border: BorderStyle {
                border_width: 2.0,
                border_all: true,
                ..Default::default()
            },
            background: Some(Color::gray(0xee)),
            fragments: Vec::new(),
        };
        let mut canvas = TestCanvas::default();
        block.render(0.0, 100.0, &mut canvas);

        assert_eq!(
            canvas.calls[0],
            DrawCall::Rect(Rect::new(12.0, 107.0, 96.0, 46.0), RectMode::Fill)
        );
        let lines = canvas.calls.iter().filter(|c| matches!(c, DrawCall::Line(..))).count();
        assert_eq!(lines, 4);
    }
}
