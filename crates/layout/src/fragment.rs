use crate::element::{BarCodeBlock, ImageBlock, LineBlock, TextBlock};
use crate::frame::FrameBlock;
use crate::section::SectionBlock;
use crate::table::TableBlock;
use reportflow_traits::Canvas;
use reportflow_types::{FragmentKind, Rect};

/// A page-bound, geometry-resolved piece of an element's output.
///
/// Coordinates are relative to the owning container; `render` receives the
/// absolute position of the container on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(TextBlock),
    Image(ImageBlock),
    Line(LineBlock),
    BarCode(BarCodeBlock),
    Table(TableBlock),
    Frame(FrameBlock),
    Section(SectionBlock),
    /// Marks the end of a page in a container's fragment list.
    PageBreak,
}

impl Fragment {
    pub fn rect(&self) -> Rect {
        match self {
            Fragment::Text(b) => b.rect,
            Fragment::Image(b) => b.rect,
            Fragment::Line(b) => b.rect,
            Fragment::BarCode(b) => b.rect,
            Fragment::Table(b) => b.rect,
            Fragment::Frame(b) => b.rect,
            Fragment::Section(b) => b.rect,
            Fragment::PageBreak => Rect::default(),
        }
    }

    pub fn render_y(&self) -> f32 {
        self.rect().y
    }

    pub fn height(&self) -> f32 {
        self.rect().height
    }

    pub fn render_bottom(&self) -> f32 {
        self.rect().bottom()
    }

    /// Slice kind; atomic fragments are always complete.
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Text(b) => b.kind,
            Fragment::Frame(b) => b.kind,
            _ => FragmentKind::Complete,
        }
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, Fragment::PageBreak)
    }

    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        match self {
            Fragment::Text(b) => b.render(offset_x, offset_y, canvas),
            Fragment::Image(b) => b.render(offset_x, offset_y, canvas),
            Fragment::Line(b) => b.render(offset_x, offset_y, canvas),
            Fragment::BarCode(b) => b.render(offset_x, offset_y, canvas),
            Fragment::Table(b) => b.render(offset_x, offset_y, canvas),
            Fragment::Frame(b) => b.render(offset_x, offset_y, canvas),
            Fragment::Section(b) => b.render(offset_x, offset_y, canvas),
            Fragment::PageBreak => {}
        }
    }
}
