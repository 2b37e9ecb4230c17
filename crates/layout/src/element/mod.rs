//! The element contract and the simple element variants.
//!
//! Every element is laid out through the same continuation protocol:
//! `next_fragment` is called with the space already used on the current page
//! and either returns a fragment for the part that fits, or `(None, false)`
//! to be called again on the next page with fresh geometry.

pub mod barcode;
pub mod image;
pub mod line;
pub mod page_break;
pub mod text;

pub use barcode::{BarCodeBlock, BarCodeElement};
pub use image::{ImageBlock, ImageElement, ImageSource};
pub use line::{LineBlock, LineElement};
pub use page_break::PageBreakElement;
pub use text::{TextBlock, TextElement};

use crate::algorithms::check_fit;
use crate::fragment::Fragment;
use crate::frame::FrameElement;
use crate::section::SectionElement;
use crate::table::TableElement;
use crate::LayoutError;
use reportflow_traits::{Canvas, EvaluationContext};
use reportflow_types::ElementId;

/// Declared box, print condition and render state shared by all elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBase {
    pub id: ElementId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub print_if: String,
    pub remove_empty_element: bool,

    pub first_render_element: bool,
    pub rendering_complete: bool,
    pub render_y: f32,
    pub render_bottom: f32,
}

impl ElementBase {
    pub fn new(id: ElementId, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            print_if: String::new(),
            remove_empty_element: false,
            first_render_element: true,
            rendering_complete: false,
            render_y: 0.0,
            render_bottom: 0.0,
        }
    }

    pub fn with_print_if(mut self, print_if: impl Into<String>) -> Self {
        self.print_if = print_if.into();
        self
    }

    pub fn with_remove_empty_element(mut self, remove: bool) -> Self {
        self.remove_empty_element = remove;
        self
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Clears the render state so the element can be laid out again.
    pub fn reset(&mut self) {
        self.first_render_element = true;
        self.rendering_complete = false;
        self.render_y = 0.0;
        self.render_bottom = 0.0;
    }

    pub fn is_printed(&self, ctx: &dyn EvaluationContext) -> Result<bool, LayoutError> {
        Ok(ctx.evaluate_condition(&self.print_if, self.id, "printIf")?)
    }

    pub fn finish_empty_element(&mut self, offset_y: f32) {
        self.render_bottom = if self.remove_empty_element {
            offset_y
        } else {
            offset_y + self.height
        };
        self.rendering_complete = true;
    }

    /// Places an element that cannot be split. Returns `false` when it has to
    /// move to the next page; at the top of a page that is an error.
    pub(crate) fn place_atomic(&mut self, offset_y: f32, container_height: f32) -> Result<bool, LayoutError> {
        if !check_fit(offset_y, self.height, container_height).fits {
            if offset_y == 0.0 {
                return Err(LayoutError::ElementTooLarge {
                    element_id: self.id,
                    field: "height",
                    needed: self.height,
                    available: container_height,
                });
            }
            return Ok(false);
        }
        self.render_y = offset_y;
        self.render_bottom = offset_y + self.height;
        self.first_render_element = false;
        self.rendering_complete = true;
        Ok(true)
    }
}

/// A placeable unit of report content.
#[derive(Debug, Clone)]
pub enum Element {
    Text(TextElement),
    Image(ImageElement),
    Line(LineElement),
    BarCode(BarCodeElement),
    PageBreak(PageBreakElement),
    Table(Box<TableElement>),
    Frame(Box<FrameElement>),
    Section(Box<SectionElement>),
}

impl Element {
    pub fn base(&self) -> &ElementBase {
        match self {
            Element::Text(e) => &e.base,
            Element::Image(e) => &e.base,
            Element::Line(e) => &e.base,
            Element::BarCode(e) => &e.base,
            Element::PageBreak(e) => &e.base,
            Element::Table(e) => &e.base,
            Element::Frame(e) => &e.base,
            Element::Section(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        match self {
            Element::Text(e) => &mut e.base,
            Element::Image(e) => &mut e.base,
            Element::Line(e) => &mut e.base,
            Element::BarCode(e) => &mut e.base,
            Element::PageBreak(e) => &mut e.base,
            Element::Table(e) => &mut e.base,
            Element::Frame(e) => &mut e.base,
            Element::Section(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> ElementId {
        self.base().id
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, Element::PageBreak(_))
    }

    /// Tie-break for elements with the same `y`: page breaks come first.
    pub fn sort_order(&self) -> u8 {
        if self.is_page_break() { 0 } else { 1 }
    }

    /// Resolves dynamic content. Without a canvas only the data is verified
    /// and no text is measured.
    pub fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        match self {
            Element::Text(e) => e.prepare(ctx, canvas),
            Element::Image(e) => e.prepare(ctx, canvas),
            Element::Line(_) | Element::PageBreak(_) => Ok(()),
            Element::BarCode(e) => e.prepare(ctx, canvas),
            Element::Table(e) => e.prepare(ctx, canvas, verify_only),
            Element::Frame(e) => e.prepare(ctx, canvas, verify_only),
            Element::Section(e) => e.prepare(ctx, canvas, verify_only),
        }
    }

    pub fn is_printed(&self, ctx: &dyn EvaluationContext) -> Result<bool, LayoutError> {
        match self {
            Element::Text(e) => e.is_printed(ctx),
            Element::BarCode(e) => e.is_printed(ctx),
            _ => self.base().is_printed(ctx),
        }
    }

    /// Produces the next fragment of this element.
    ///
    /// Returns `(None, false)` when nothing fits at a nonzero offset, the
    /// caller retries on the next page. An already complete element returns
    /// `(None, true)` and is left untouched.
    pub fn next_fragment(
        &mut self,
        offset_y: f32,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(Option<Fragment>, bool), LayoutError> {
        if self.base().rendering_complete {
            return Ok((None, true));
        }
        match self {
            Element::Text(e) => e.next_fragment(offset_y, container_height),
            Element::Image(e) => e.next_fragment(offset_y, container_height),
            Element::Line(e) => e.next_fragment(offset_y, container_height),
            Element::BarCode(e) => e.next_fragment(offset_y, container_height),
            Element::PageBreak(e) => Ok(e.next_fragment()),
            Element::Table(e) => e.next_fragment(offset_y, container_height, ctx, canvas),
            Element::Frame(e) => e.next_fragment(offset_y, container_height, ctx, canvas),
            Element::Section(e) => e.next_fragment(offset_y, container_height, ctx, canvas),
        }
    }

    pub fn finish_empty_element(&mut self, offset_y: f32) {
        self.base_mut().finish_empty_element(offset_y);
    }

    /// Releases per-layout resources such as registered image keys.
    pub fn cleanup(&mut self) {
        match self {
            Element::Image(e) => e.cleanup(),
            Element::BarCode(e) => e.cleanup(),
            Element::Table(e) => e.cleanup(),
            Element::Frame(e) => e.cleanup(),
            Element::Section(e) => e.cleanup(),
            Element::Text(_) | Element::Line(_) | Element::PageBreak(_) => {}
        }
    }
}

impl From<TextElement> for Element {
    fn from(e: TextElement) -> Self {
        Element::Text(e)
    }
}

impl From<ImageElement> for Element {
    fn from(e: ImageElement) -> Self {
        Element::Image(e)
    }
}

impl From<LineElement> for Element {
    fn from(e: LineElement) -> Self {
        Element::Line(e)
    }
}

impl From<BarCodeElement> for Element {
    fn from(e: BarCodeElement) -> Self {
        Element::BarCode(e)
    }
}

impl From<PageBreakElement> for Element {
    fn from(e: PageBreakElement) -> Self {
        Element::PageBreak(e)
    }
}

impl From<TableElement> for Element {
    fn from(e: TableElement) -> Self {
        Element::Table(Box::new(e))
    }
}

impl From<FrameElement> for Element {
    fn from(e: FrameElement) -> Self {
        Element::Frame(Box::new(e))
    }
}

impl From<SectionElement> for Element {
    fn from(e: SectionElement) -> Self {
        Element::Section(Box::new(e))
    }
}
