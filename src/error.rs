//! Error types of report generation.

use reportflow_layout::LayoutError;
use reportflow_types::ElementId;
use thiserror::Error;

/// A problem found while loading a template or its data. Loading collects all
/// of them before giving up.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (element {element_id}, field '{field}')")]
pub struct TemplateError {
    pub message: String,
    pub element_id: ElementId,
    pub field: String,
}

impl TemplateError {
    pub fn new(message: impl Into<String>, element_id: ElementId, field: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element_id,
            field: field.into(),
        }
    }
}

/// The main error enum for report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(
        "Template is invalid: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    InvalidTemplate(Vec<TemplateError>),

    #[error("Too many pages, pagination did not finish after {attempts} attempts")]
    PaginationRunaway { attempts: usize },

    #[error("Layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// The element the error originates from, if it has one.
    pub fn element_id(&self) -> Option<ElementId> {
        match self {
            ReportError::InvalidTemplate(errors) => errors.first().map(|e| e.element_id),
            ReportError::Layout(e) => Some(e.element_id()),
            _ => None,
        }
    }
}
