//! Document pagination.
//!
//! Pagination runs in two passes. The dry run lays out the content band page
//! by page until it completes, which yields the page count. The render pass
//! then draws one page per iteration: page header, page footer and the
//! content fragments produced for that page by the dry run.

use crate::error::ReportError;
use log::{debug, info};
use reportflow_layout::{Container, LayoutConfig, LayoutError};
use reportflow_traits::{Canvas, EvaluationContext};
use reportflow_types::BandDisplay;

/// A region that is laid out page by page.
pub trait FlowRegion {
    fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError>;

    /// Lays out the next page worth of content. Returns `true` once the
    /// region is complete.
    fn create_fragments(
        &mut self,
        height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<bool, LayoutError>;

    /// Draws the fragments of one page.
    fn render(&mut self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas);

    /// True once every laid out page has been drawn.
    fn is_finished(&self) -> bool;

    fn cleanup(&mut self);
}

impl FlowRegion for Container {
    fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        Container::prepare(self, ctx, canvas, verify_only)
    }

    fn create_fragments(
        &mut self,
        height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<bool, LayoutError> {
        Container::create_fragments(self, height, ctx, canvas)
    }

    fn render(&mut self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        Container::render(self, offset_x, offset_y, canvas)
    }

    fn is_finished(&self) -> bool {
        Container::is_finished(self)
    }

    fn cleanup(&mut self) {
        Container::cleanup(self)
    }
}

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub header_size: f32,
    pub header_display: BandDisplay,
    pub footer_size: f32,
    pub footer_display: BandDisplay,
}

impl PageLayout {
    pub fn header_visible(&self, page_number: usize) -> bool {
        self.header_size > 0.0 && self.header_display.is_visible_on(page_number)
    }

    pub fn footer_visible(&self, page_number: usize) -> bool {
        self.footer_size > 0.0 && self.footer_display.is_visible_on(page_number)
    }

    /// Height left for the content band on the given page (1-based).
    pub fn content_height(&self, page_number: usize) -> f32 {
        let mut height = self.page_height - self.margin_top - self.margin_bottom;
        if self.header_visible(page_number) {
            height -= self.header_size;
        }
        if self.footer_visible(page_number) {
            height -= self.footer_size;
        }
        height
    }
}

pub struct DocumentPaginator {
    layout: PageLayout,
    config: LayoutConfig,
}

impl DocumentPaginator {
    pub fn new(layout: PageLayout) -> Self {
        Self::with_config(layout, LayoutConfig::default())
    }

    pub fn with_config(layout: PageLayout, config: LayoutConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Dry run over the content band. Fails with
    /// [`ReportError::PaginationRunaway`] when the content is still not
    /// complete after `max_page_attempts` pages.
    pub fn count_pages(
        &self,
        content: &mut dyn FlowRegion,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<usize, ReportError> {
        content.prepare(ctx, Some(&mut *canvas), false)?;

        for page_number in 1..=self.config.max_page_attempts {
            let height = self.layout.content_height(page_number);
            if content.create_fragments(height, ctx, canvas)? {
                info!("Content laid out on {} page(s)", page_number);
                return Ok(page_number);
            }
            debug!("Page {} is full ({:.2}pt)", page_number, height);
        }
        Err(ReportError::PaginationRunaway {
            attempts: self.config.max_page_attempts,
        })
    }

    /// Draws every page laid out by [`count_pages`](Self::count_pages).
    /// At least one page is drawn, even without content.
    pub fn render(
        &self,
        header: &mut dyn FlowRegion,
        content: &mut dyn FlowRegion,
        footer: &mut dyn FlowRegion,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(), ReportError> {
        let layout = &self.layout;
        while !content.is_finished() || ctx.page_number() == 0 {
            canvas.add_page();
            ctx.inc_page_number();
            let page_number = ctx.page_number();

            let mut content_y = layout.margin_top;
            if layout.header_visible(page_number) {
                content_y += layout.header_size;
                header.prepare(ctx, Some(&mut *canvas), false)?;
                header.create_fragments(layout.header_size, ctx, canvas)?;
                header.render(layout.margin_left, layout.margin_top, canvas);
            }
            if layout.footer_visible(page_number) {
                footer.prepare(ctx, Some(&mut *canvas), false)?;
                footer.create_fragments(layout.footer_size, ctx, canvas)?;
                footer.render(
                    layout.margin_left,
                    layout.page_height - layout.footer_size - layout.margin_bottom,
                    canvas,
                );
            }
            debug!("Rendering page {} (content at {:.2})", page_number, content_y);
            content.render(layout.margin_left, content_y, canvas);
        }

        header.cleanup();
        content.cleanup();
        footer.cleanup();
        Ok(())
    }

    /// Counts the pages, publishes the count as `page_count` and renders.
    pub fn paginate(
        &self,
        header: &mut dyn FlowRegion,
        content: &mut dyn FlowRegion,
        footer: &mut dyn FlowRegion,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<usize, ReportError> {
        let page_count = self.count_pages(content, ctx, canvas)?;
        ctx.set_page_count(page_count);
        self.render(header, content, footer, ctx, canvas)?;
        Ok(page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::context::JsonContext;
    use serde_json::Value;

    /// Needs `pages` calls to complete; `None` never completes.
    #[derive(Default)]
    struct StubRegion {
        pages: Option<usize>,
        heights: Vec<f32>,
        pending: usize,
        rendered_at: Vec<(f32, f32)>,
        cleaned: bool,
    }

    impl FlowRegion for StubRegion {
        fn prepare(
            &mut self,
            _ctx: &mut dyn EvaluationContext,
            _canvas: Option<&mut dyn Canvas>,
            _verify_only: bool,
        ) -> Result<(), LayoutError> {
            Ok(())
        }

        fn create_fragments(
            &mut self,
            height: f32,
            _ctx: &mut dyn EvaluationContext,
            _canvas: &mut dyn Canvas,
        ) -> Result<bool, LayoutError> {
            self.heights.push(height);
            self.pending += 1;
            Ok(self.pages.is_some_and(|pages| self.heights.len() >= pages))
        }

        fn render(&mut self, offset_x: f32, offset_y: f32, _canvas: &mut dyn Canvas) {
            self.rendered_at.push((offset_x, offset_y));
            self.pending = self.pending.saturating_sub(1);
        }

        fn is_finished(&self) -> bool {
            self.pending == 0
        }

        fn cleanup(&mut self) {
            self.cleaned = true;
        }
    }

    fn layout() -> PageLayout {
        PageLayout {
            page_width: 595.0,
            page_height: 842.0,
            margin_left: 20.0,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 20.0,
            header_size: 60.0,
            header_display: BandDisplay::NotOnFirstPage,
            footer_size: 40.0,
            footer_display: BandDisplay::Always,
        }
    }

    fn context() -> JsonContext {
        JsonContext::new(Vec::new(), Value::Null)
    }

    #[test]
    fn test_runaway_after_exactly_max_attempts() {
        let paginator = DocumentPaginator::new(layout());
        let mut content = StubRegion::default();
        let mut canvas = RecordingCanvas::new(595.0, 842.0);
        let err = paginator.count_pages(&mut content, &mut context(), &mut canvas).unwrap_err();
        assert!(matches!(err, ReportError::PaginationRunaway { attempts: 10_000 }));
        assert_eq!(content.heights.len(), 10_000);
    }

    #[test]
    fn test_runaway_limit_is_configurable() {
        let config = LayoutConfig {
            max_page_attempts: 5,
            ..LayoutConfig::default()
        };
        let paginator = DocumentPaginator::with_config(layout(), config);
        let mut content = StubRegion::default();
        let mut canvas = RecordingCanvas::new(595.0, 842.0);
        let err = paginator.count_pages(&mut content, &mut context(), &mut canvas).unwrap_err();
        assert!(matches!(err, ReportError::PaginationRunaway { attempts: 5 }));
        assert_eq!(content.heights.len(), 5);

        // completing on the last allowed attempt is not a runaway
        let mut content = StubRegion {
            pages: Some(5),
            ..StubRegion::default()
        };
        assert_eq!(paginator.count_pages(&mut content, &mut context(), &mut canvas).unwrap(), 5);
    }

    #[test]
    fn test_content_height_follows_band_display() {
        let layout = layout();
        assert!(!layout.header_visible(1));
        assert!(layout.header_visible(2));
        assert_eq!(layout.content_height(1), 842.0 - 40.0 - 40.0);
        assert_eq!(layout.content_height(2), 842.0 - 40.0 - 40.0 - 60.0);

        let paginator = DocumentPaginator::new(layout);
        let mut content = StubRegion {
            pages: Some(3),
            ..StubRegion::default()
        };
        let mut canvas = RecordingCanvas::new(595.0, 842.0);
        paginator.count_pages(&mut content, &mut context(), &mut canvas).unwrap();
        assert_eq!(content.heights, vec![762.0, 702.0, 702.0]);
    }

    #[test]
    fn test_paginate_renders_every_page() {
        let paginator = DocumentPaginator::new(layout());
        let mut header = StubRegion::default();
        let mut footer = StubRegion::default();
        let mut content = StubRegion {
            pages: Some(3),
            ..StubRegion::default()
        };
        let mut ctx = context();
        let mut canvas = RecordingCanvas::new(595.0, 842.0);

        let pages = paginator
            .paginate(&mut header, &mut content, &mut footer, &mut ctx, &mut canvas)
            .unwrap();
        assert_eq!(pages, 3);
        assert_eq!(canvas.page_count(), 3);
        assert_eq!(ctx.page_count(), 3);
        assert_eq!(ctx.page_number(), 3);

        assert_eq!(content.rendered_at, vec![(20.0, 20.0), (20.0, 80.0), (20.0, 80.0)]);
        assert_eq!(header.rendered_at, vec![(20.0, 20.0), (20.0, 20.0)]);
        assert_eq!(footer.rendered_at, vec![(20.0, 782.0); 3]);
        assert!(header.cleaned && content.cleaned && footer.cleaned);
    }

    #[test]
    fn test_empty_content_renders_one_page() {
        let paginator = DocumentPaginator::new(layout());
        let mut header = Container::new("0_header", 555.0, 60.0, false);
        let mut content = Container::new("0_content", 555.0, 742.0, true);
        let mut footer = Container::new("0_footer", 555.0, 40.0, false);
        let mut ctx = context();
        let mut canvas = RecordingCanvas::new(595.0, 842.0);

        let pages = paginator
            .paginate(&mut header, &mut content, &mut footer, &mut ctx, &mut canvas)
            .unwrap();
        assert_eq!(pages, 1);
        assert_eq!(canvas.page_count(), 1);
    }
}
