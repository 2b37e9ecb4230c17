//! Recording canvas and a minimal evaluation context for layout tests.

use reportflow_traits::{
    strip_parameter_name, value_to_string, Canvas, CanvasError, EvalError, EvaluationContext, FontSpec, RectMode,
    ResourceError,
};
use reportflow_types::{Color, ElementId, Parameter, Rect, Size};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Every character is this wide, independent of the font.
pub const CHAR_WIDTH: f32 = 5.0;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Text(f32, f32, String),
    Rect(Rect, RectMode),
    Line(f32, f32, f32, f32),
    Image(String, Rect),
    Barcode(String, Rect),
    Link(Rect, String),
    Page,
}

#[derive(Debug, Default)]
pub struct TestCanvas {
    pub calls: Vec<DrawCall>,
    pub pages: usize,
    images: HashMap<String, Size>,
}

impl TestCanvas {
    pub fn with_image(mut self, key: &str, size: Size) -> Self {
        self.images.insert(key.to_string(), size);
        self
    }

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text(_, _, text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for TestCanvas {
    fn set_font(&mut self, _font: &FontSpec) {}

    fn string_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * CHAR_WIDTH
    }

    fn split_lines(&self, text: &str, width: f32) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if line.is_empty() {
                    word.to_string()
                } else {
                    format!("{line} {word}")
                };
                if !line.is_empty() && self.string_width(&candidate) > width {
                    lines.push(std::mem::replace(&mut line, word.to_string()));
                } else {
                    line = candidate;
                }
            }
            lines.push(line);
        }
        lines
    }

    fn set_text_color(&mut self, _color: Color) {}
    fn set_draw_color(&mut self, _color: Color) {}
    fn set_fill_color(&mut self, _color: Color) {}
    fn set_line_width(&mut self, _width: f32) {}

    fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        self.calls.push(DrawCall::Text(x, y, text.to_string()));
    }

    fn draw_rect(&mut self, rect: Rect, mode: RectMode) {
        self.calls.push(DrawCall::Rect(rect, mode));
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.calls.push(DrawCall::Line(x1, y1, x2, y2));
    }

    fn register_image(&mut self, key: &str, data: Option<&[u8]>) -> Result<Size, CanvasError> {
        if let Some(size) = self.images.get(key) {
            return Ok(*size);
        }
        match data {
            Some(_) => {
                let size = Size::new(100.0, 50.0);
                self.images.insert(key.to_string(), size);
                Ok(size)
            }
            None => Err(ResourceError::NotFound(key.to_string()).into()),
        }
    }

    fn draw_image(&mut self, key: &str, rect: Rect) {
        self.calls.push(DrawCall::Image(key.to_string(), rect));
    }

    fn register_barcode(&mut self, content: &str) -> Result<String, CanvasError> {
        if content.is_ascii() {
            Ok(format!("barcode:{content}"))
        } else {
            Err(CanvasError::InvalidBarcode(content.to_string()))
        }
    }

    fn draw_barcode(&mut self, key: &str, rect: Rect) {
        self.calls.push(DrawCall::Barcode(key.to_string(), rect));
    }

    fn add_link(&mut self, rect: Rect, url: &str) {
        self.calls.push(DrawCall::Link(rect, url.to_string()));
    }

    fn add_page(&mut self) {
        self.pages += 1;
        self.calls.push(DrawCall::Page);
    }
}

/// Resolves `${name}` and `${a.b}` against a stack of JSON objects. Anything
/// else evaluates only as a number or `True`/`False` literal.
#[derive(Debug, Default)]
pub struct TestContext {
    scopes: Vec<(Arc<[Parameter]>, Value)>,
    page_number: usize,
    page_count: usize,
}

impl TestContext {
    pub fn with_data(data: Value) -> Self {
        Self {
            scopes: vec![(Arc::from(Vec::new()), data)],
            ..Self::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        match self.scopes.first_mut() {
            Some(scope) => scope.0 = Arc::from(parameters),
            None => self.scopes.push((Arc::from(parameters), Value::Object(Default::default()))),
        }
        self
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut value = self.data(parts.next()?)?;
        for part in parts {
            value = value.get(part)?;
        }
        Some(value)
    }

    fn undefined(name: &str, element_id: ElementId, field: &str) -> EvalError {
        EvalError::UndefinedName {
            element_id,
            field: field.to_string(),
            name: name.to_string(),
        }
    }
}

impl EvaluationContext for TestContext {
    fn evaluate(&self, expr: &str, element_id: ElementId, field: &str) -> Result<Value, EvalError> {
        let expr = expr.trim();
        if expr.starts_with("${") {
            let name = strip_parameter_name(expr);
            return self
                .lookup(name)
                .cloned()
                .ok_or_else(|| Self::undefined(name, element_id, field));
        }
        match expr {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            _ => expr
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| EvalError::Syntax {
                    element_id,
                    field: field.to_string(),
                    message: format!("cannot evaluate '{expr}'"),
                }),
        }
    }

    fn formatted_value(&self, value: &Value, _parameter: &Parameter, pattern: Option<&str>, _item: bool) -> String {
        match pattern {
            Some(pattern) => format!("{}|{pattern}", value_to_string(value)),
            None => value_to_string(value),
        }
    }

    fn fill_parameters(
        &self,
        template: &str,
        element_id: ElementId,
        field: &str,
        _pattern: Option<&str>,
    ) -> Result<String, EvalError> {
        let mut out = String::new();
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 2..start + len];
            let value = self
                .lookup(name)
                .ok_or_else(|| Self::undefined(name, element_id, field))?;
            out.push_str(&rest[..start]);
            out.push_str(&value_to_string(value));
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.scopes
            .iter()
            .rev()
            .find_map(|(parameters, _)| parameters.iter().find(|p| p.name == name))
    }

    fn data(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|(_, data)| data.get(name))
    }

    fn push_scope(&mut self, parameters: Arc<[Parameter]>, data: Value) {
        self.scopes.push((parameters, data));
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn page_number(&self) -> usize {
        self.page_number
    }

    fn inc_page_number(&mut self) {
        self.page_number += 1;
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn set_page_count(&mut self, page_count: usize) {
        self.page_count = page_count;
    }
}
