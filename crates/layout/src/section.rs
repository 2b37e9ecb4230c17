//! Repeating sections: a header band, one content band per data row and a
//! footer band, each with its own flow of elements.

use crate::algorithms::fits;
use crate::container::Container;
use crate::element::{Element, ElementBase};
use crate::fragment::Fragment;
use crate::table::BandKind;
use crate::LayoutError;
use log::debug;
use reportflow_traits::{strip_parameter_name, Canvas, EvaluationContext, ScopedContext};
use reportflow_types::{ElementId, Parameter, ParameterType, Rect};
use serde_json::Value;
use std::sync::Arc;

/// One band of a section. Element positions are relative to the top of the
/// band.
#[derive(Debug, Clone)]
pub struct SectionBand {
    pub id: ElementId,
    pub kind: BandKind,
    /// Minimum height, carried over to the next page when the band is split.
    pub height: f32,
    /// Header only: print the header again on every page the section spans.
    pub repeat_header: bool,
    /// The band is never split; headers are always kept together.
    pub always_print_on_same_page: bool,
    pub shrink_to_content: bool,
    container: Container,

    rendering_complete: bool,
    prepare_container: bool,
    rendered_band_height: f32,
}

impl SectionBand {
    fn new(id: ElementId, kind: BandKind, height: f32) -> Self {
        Self {
            id,
            kind,
            height,
            repeat_header: false,
            always_print_on_same_page: kind == BandKind::Header,
            shrink_to_content: false,
            container: Container::new(format!("section_band_{id}"), 0.0, height, false),
            rendering_complete: false,
            prepare_container: true,
            rendered_band_height: 0.0,
        }
    }

    pub fn header(id: ElementId, height: f32) -> Self {
        Self::new(id, BandKind::Header, height)
    }

    pub fn content(id: ElementId, height: f32) -> Self {
        Self::new(id, BandKind::Content, height)
    }

    pub fn footer(id: ElementId, height: f32) -> Self {
        Self::new(id, BandKind::Footer, height)
    }

    pub fn with_repeat_header(mut self, repeat: bool) -> Self {
        self.repeat_header = repeat && self.kind == BandKind::Header;
        self
    }

    /// Ignored for headers, which are always kept on one page.
    pub fn with_always_print_on_same_page(mut self, always: bool) -> Self {
        self.always_print_on_same_page = always || self.kind == BandKind::Header;
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

    pub fn is_rendering_complete(&self) -> bool {
        self.rendering_complete
    }

    fn reset(&mut self) {
        self.rendering_complete = false;
        self.prepare_container = true;
        self.rendered_band_height = 0.0;
    }

    fn verify(&mut self, ctx: &mut dyn EvaluationContext) -> Result<(), LayoutError> {
        self.container.prepare(ctx, None, true)
    }

    fn too_large(&self, available: f32) -> LayoutError {
        LayoutError::ElementTooLarge {
            element_id: self.id,
            field: if self.kind == BandKind::Header {
                "size"
            } else {
                "alwaysPrintOnSamePage"
            },
            needed: self.height,
            available,
        }
    }

    /// Lays out the band below `offset_y`. A band that is not kept together
    /// fills the rest of the page and continues on the next one.
    fn create_fragments(
        &mut self,
        offset_y: f32,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(), LayoutError> {
        let available_height = container_height - offset_y;
        if self.always_print_on_same_page && !self.shrink_to_content && !fits(self.height, available_height) {
            self.rendering_complete = false;
        } else {
            if self.prepare_container {
                self.container.prepare(ctx, Some(&mut *canvas), false)?;
                self.rendered_band_height = 0.0;
            } else {
                self.rendered_band_height += self.container.used_band_height();
                self.container.clear_fragments();
            }
            self.rendering_complete = self.container.create_fragments(available_height, ctx, canvas)?;
        }

        if self.rendering_complete {
            let remaining_min_height = self.height - self.rendered_band_height;
            self.prepare_container = true;
            if !self.shrink_to_content && self.container.used_band_height() < remaining_min_height {
                if fits(remaining_min_height, available_height) {
                    self.container.set_used_band_height(remaining_min_height);
                } else {
                    // The minimum height continues on the next page.
                    self.rendering_complete = false;
                    self.prepare_container = false;
                    self.container.set_used_band_height(available_height);
                }
            }
        } else if self.always_print_on_same_page {
            self.prepare_container = true;
            if offset_y == 0.0 {
                return Err(self.too_large(container_height));
            }
            debug!("Section band {} does not fit at {:.2}, moving to the next page", self.id, offset_y);
        } else {
            self.prepare_container = false;
            self.container.advance_baseline(available_height);
            self.container.set_used_band_height(available_height);
        }
        Ok(())
    }

    /// Whether the band produced output for the current page.
    fn is_placed(&self) -> bool {
        self.rendering_complete || !self.always_print_on_same_page
    }
}

/// Section element, repeating its content band for every row of an array
/// parameter.
#[derive(Debug, Clone)]
pub struct SectionElement {
    pub base: ElementBase,
    pub data_source: String,
    header: Option<SectionBand>,
    content: SectionBand,
    footer: Option<SectionBand>,

    print_header: bool,
    row_parameters: Arc<[Parameter]>,
    rows: Vec<Value>,
    row_index: usize,
}

impl SectionElement {
    pub fn new(base: ElementBase, data_source: impl Into<String>, content: SectionBand) -> Self {
        let mut section = Self {
            base,
            data_source: data_source.into(),
            header: None,
            content,
            footer: None,
            print_header: false,
            row_parameters: Arc::from(Vec::new()),
            rows: Vec::new(),
            row_index: 0,
        };
        section.update_height();
        section
    }

    pub fn with_header(mut self, header: SectionBand) -> Self {
        self.header = Some(header);
        self.update_height();
        self
    }

    pub fn with_footer(mut self, footer: SectionBand) -> Self {
        self.footer = Some(footer);
        self.update_height();
        self
    }

    /// The declared height is the sum of the band heights.
    fn update_height(&mut self) {
        self.base.height = self.content.height
            + self.header.as_ref().map_or(0.0, |b| b.height)
            + self.footer.as_ref().map_or(0.0, |b| b.height);
    }

    fn invalid_data(&self, message: String) -> LayoutError {
        LayoutError::InvalidData {
            element_id: self.base.id,
            field: "data_source",
            message,
        }
    }

    fn load_rows(&mut self, ctx: &dyn EvaluationContext) -> Result<(), LayoutError> {
        let name = strip_parameter_name(&self.data_source);
        let parameter = ctx
            .parameter(name)
            .ok_or_else(|| self.invalid_data(format!("parameter '{name}' does not exist")))?;
        if parameter.kind != ParameterType::Array {
            return Err(self.invalid_data(format!("parameter '{name}' is not an array")));
        }
        self.row_parameters = Arc::from(parameter.children.clone());
        self.rows = match ctx.data(name) {
            Some(Value::Array(rows)) => rows.clone(),
            Some(Value::Null) | None => return Err(self.invalid_data(format!("no data for '{name}'"))),
            Some(_) => return Err(self.invalid_data(format!("data of '{name}' is not a list"))),
        };
        Ok(())
    }

    pub fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        _canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        self.load_rows(&*ctx)?;
        self.row_index = 0;
        self.print_header = self.header.is_some();
        for band in [self.header.as_mut(), Some(&mut self.content), self.footer.as_mut()]
            .into_iter()
            .flatten()
        {
            band.reset();
        }

        if verify_only {
            if let Some(header) = self.header.as_mut() {
                header.verify(ctx)?;
            }
            for data in &self.rows {
                let mut scoped = ScopedContext::push(ctx, self.row_parameters.clone(), data.clone());
                self.content.verify(&mut *scoped)?;
            }
            if let Some(footer) = self.footer.as_mut() {
                footer.verify(ctx)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self, block: SectionBlock, complete: bool) -> (Option<Fragment>, bool) {
        self.base.first_render_element = false;
        self.base.render_y = block.rect.y;
        self.base.render_bottom = block.rect.bottom();
        self.base.rendering_complete = complete;
        let fragment = (!block.bands.is_empty()).then_some(Fragment::Section(block));
        (fragment, complete)
    }

    pub fn next_fragment(
        &mut self,
        offset_y: f32,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(Option<Fragment>, bool), LayoutError> {
        let mut block = SectionBlock::new(Rect::new(self.base.x, offset_y, self.base.width, 0.0));
        let header_repeats = self.print_header && self.header.as_ref().is_some_and(|h| h.repeat_header);
        let mut rows_placed = 0;

        if self.print_header
            && let Some(header) = self.header.as_mut()
        {
            header.create_fragments(offset_y, container_height, ctx, canvas)?;
            block.add_band(header);
            if !header.rendering_complete {
                return Ok(self.finish(block, false));
            }
            self.print_header = header.repeat_header;
        }

        while self.row_index < self.rows.len() {
            let data = self.rows[self.row_index].clone();
            {
                let mut scoped = ScopedContext::push(ctx, self.row_parameters.clone(), data);
                self.content
                    .create_fragments(offset_y + block.rect.height, container_height, &mut *scoped, canvas)?;
            }
            block.add_band(&mut self.content);
            if !self.content.rendering_complete {
                if offset_y == 0.0 && header_repeats && rows_placed == 0 && !self.content.is_placed() {
                    // Every following page starts with the same header.
                    return Err(self.content.too_large(container_height - block.rect.height));
                }
                debug!(
                    "Section {}: row {} of {} continues on the next page",
                    self.base.id,
                    self.row_index,
                    self.rows.len()
                );
                return Ok(self.finish(block, false));
            }
            self.row_index += 1;
            rows_placed += 1;
        }

        if let Some(footer) = self.footer.as_mut() {
            footer.create_fragments(offset_y + block.rect.height, container_height, ctx, canvas)?;
            block.add_band(footer);
            if !footer.rendering_complete {
                if offset_y == 0.0 && header_repeats && rows_placed == 0 && !footer.is_placed() {
                    return Err(footer.too_large(container_height - block.rect.height));
                }
                return Ok(self.finish(block, false));
            }
        }

        Ok(self.finish(block, true))
    }

    pub fn cleanup(&mut self) {
        if let Some(header) = self.header.as_mut() {
            header.container.cleanup();
        }
        self.content.container.cleanup();
        if let Some(footer) = self.footer.as_mut() {
            footer.container.cleanup();
        }
    }
}

/// Fragments of one band, `offset_y` is relative to the section block.
#[derive(Debug, Clone, PartialEq)]
pub struct BandBlock {
    pub offset_y: f32,
    pub height: f32,
    pub fragments: Vec<Fragment>,
}

/// The bands of a section placed on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionBlock {
    pub rect: Rect,
    pub bands: Vec<BandBlock>,
}

impl SectionBlock {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            bands: Vec::new(),
        }
    }

    fn add_band(&mut self, band: &mut SectionBand) {
        if !band.is_placed() {
            return;
        }
        let height = band.container.used_band_height();
        self.bands.push(BandBlock {
            offset_y: self.rect.height,
            height,
            fragments: band.container.take_fragments(),
        });
        self.rect.height += height;
    }

    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let y = offset_y + self.rect.y;
        for band in &self.bands {
            for fragment in &band.fragments {
                fragment.render(offset_x, y + band.offset_y, canvas);
            }
        }
    }
}
