//! Report generation: templates of positioned elements, tables, frames and
//! sections are filled with JSON data and flowed across pages.
//!
//! ```no_run
//! use reportflow::{LayoutConfig, Report};
//!
//! # fn main() -> Result<(), reportflow::ReportError> {
//! let template = std::fs::read_to_string("invoice.json")?;
//! let data = std::fs::read_to_string("invoice_data.json")?;
//! let document = Report::from_json(&template, &data, LayoutConfig::default())?.render_document()?;
//! println!("{} page(s)", document.pages.len());
//! # Ok(())
//! # }
//! ```

pub mod canvas;
pub mod context;
pub mod data;
pub mod error;
pub mod expr;
pub mod format;
pub mod paginator;
pub mod template;

pub use canvas::{Document, DrawCommand, Page, RecordingCanvas};
pub use context::JsonContext;
pub use error::{ReportError, TemplateError};
pub use paginator::{DocumentPaginator, FlowRegion, PageLayout};
pub use template::{DocumentProperties, ReportDefinition, Template};

pub use reportflow_layout::{LayoutConfig, LayoutError};
pub use reportflow_traits::{Canvas, EvaluationContext};
pub use reportflow_types::{BandDisplay, ElementId, Size};

use log::info;
use serde_json::Value;

/// A template bound to its data.
#[derive(Debug)]
pub struct Report {
    template: Template,
    context: JsonContext,
    config: LayoutConfig,
}

impl Report {
    /// Builds the template and processes the data. Fails with every
    /// template or data problem found.
    pub fn new(definition: ReportDefinition, data: Value, config: LayoutConfig) -> Result<Self, ReportError> {
        let template = definition.build(&config)?;
        let data = data::process_data(&template.parameters, data)?;
        let context = JsonContext::new(template.parameters.clone(), data)
            .with_currency_symbol(template.properties.currency_symbol());
        Ok(Self {
            template,
            context,
            config,
        })
    }

    pub fn from_json(template: &str, data: &str, config: LayoutConfig) -> Result<Self, ReportError> {
        let definition = ReportDefinition::from_json(template)?;
        let data = if data.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(data)?
        };
        Self::new(definition, data, config)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn page_size(&self) -> Size {
        self.template.properties.page_size()
    }

    /// Evaluates every expression and placeholder of the bands without
    /// laying out pages.
    pub fn verify(&mut self) -> Result<(), ReportError> {
        let Template {
            header, content, footer, ..
        } = &mut self.template;
        for band in [header, content, footer] {
            band.prepare(&mut self.context, None, true)?;
        }
        Ok(())
    }

    /// Lays out and draws the report on `canvas`. Returns the page count.
    pub fn generate(&mut self, canvas: &mut dyn Canvas) -> Result<usize, ReportError> {
        self.verify()?;
        self.context.reset_pages();

        let paginator = DocumentPaginator::with_config(self.template.properties.page_layout(), self.config);
        let Template {
            header, content, footer, ..
        } = &mut self.template;
        let pages = paginator.paginate(header, content, footer, &mut self.context, canvas)?;
        info!("Generated report with {} page(s)", pages);
        Ok(pages)
    }

    /// Generates the report on a [`RecordingCanvas`].
    pub fn render_document(mut self) -> Result<Document, ReportError> {
        let size = self.page_size();
        let mut canvas = RecordingCanvas::new(size.width, size.height);
        self.generate(&mut canvas)?;
        Ok(canvas.finish())
    }
}
