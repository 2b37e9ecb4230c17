pub mod document_assertions;
pub mod fixtures;

use reportflow::{Document, LayoutConfig, Report, ReportError};
use serde_json::Value;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Generates a report from a JSON template and data with the default
/// layout configuration.
pub fn generate(template: &Value, data: Value) -> Result<Document, ReportError> {
    generate_with_config(template, data, LayoutConfig::default())
}

pub fn generate_with_config(template: &Value, data: Value, config: LayoutConfig) -> Result<Document, ReportError> {
    let definition = serde_json::from_value(template.clone())?;
    Report::new(definition, data, config)?.render_document()
}
