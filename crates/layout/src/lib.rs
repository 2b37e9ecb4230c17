use reportflow_traits::{CanvasError, EvalError};
use reportflow_types::ElementId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error(
        "Element {element_id} ({field}) needs a height of {needed:.2} which exceeds the available page content height of {available:.2}."
    )]
    ElementTooLarge {
        element_id: ElementId,
        field: &'static str,
        needed: f32,
        available: f32,
    },
    #[error("Element {element_id}, field '{field}': {message}")]
    InvalidData {
        element_id: ElementId,
        field: &'static str,
        message: String,
    },
    #[error("Element {element_id}: {source}")]
    Canvas {
        element_id: ElementId,
        #[source]
        source: CanvasError,
    },
    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

impl LayoutError {
    /// The element the error originates from.
    pub fn element_id(&self) -> ElementId {
        match self {
            LayoutError::ElementTooLarge { element_id, .. }
            | LayoutError::InvalidData { element_id, .. }
            | LayoutError::Canvas { element_id, .. } => *element_id,
            LayoutError::Evaluation(e) => e.element_id(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            LayoutError::ElementTooLarge { field, .. } | LayoutError::InvalidData { field, .. } => field,
            LayoutError::Canvas { .. } => "source",
            LayoutError::Evaluation(e) => e.field(),
        }
    }
}

pub mod algorithms;
pub mod config;
pub mod container;
pub mod element;
pub mod fragment;
pub mod frame;
pub mod painting;
pub mod section;
pub mod table;

pub use self::config::LayoutConfig;
pub use self::container::Container;
pub use self::element::{
    BarCodeElement, Element, ElementBase, ImageElement, LineElement, PageBreakElement, TextElement,
};
pub use self::fragment::Fragment;
pub use self::frame::{FrameBlock, FrameElement};
pub use self::section::{BandBlock, SectionBand, SectionBlock, SectionElement};
pub use self::table::{BandKind, RowBlock, TableBand, TableBlock, TableColumn, TableElement};

// Re-export the foundation types elements are built from
pub use reportflow_types::{BandDisplay, BorderStyle, Color, FragmentKind, Rect, Size, TextStyle};

#[cfg(test)]
mod container_test;
#[cfg(test)]
mod test_utils;
