//! `JsonContext`, the [`EvaluationContext`] backed by `serde_json` report data.

use crate::expr::{self, ExprError};
use crate::format::format_value;
use log::warn;
use reportflow_traits::context::EvaluationContext;
use reportflow_traits::EvalError;
use reportflow_types::{ElementId, Parameter, ParameterType};
use serde_json::{Map, Value};
use std::sync::Arc;

const PAGE_NUMBER: &str = "page_number";
const PAGE_COUNT: &str = "page_count";

/// A stack of parameter/data scopes. The root scope holds the report
/// parameters, the report data and the page counters; tables and sections
/// push one scope per row.
#[derive(Debug, Clone)]
pub struct JsonContext {
    scopes: Vec<(Arc<[Parameter]>, Value)>,
    page_number: usize,
    page_count: usize,
    currency_symbol: String,
}

impl JsonContext {
    pub fn new(mut parameters: Vec<Parameter>, data: Value) -> Self {
        let mut root = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!("Report data is not an object, ignoring it: {}", other);
                Map::new()
            }
        };
        for name in [PAGE_NUMBER, PAGE_COUNT] {
            if !parameters.iter().any(|p| p.name == name) {
                parameters.push(Parameter::new(name, ParameterType::Number));
            }
            root.insert(name.to_string(), Value::from(0));
        }
        Self {
            scopes: vec![(Arc::from(parameters), Value::Object(root))],
            page_number: 0,
            page_count: 0,
            currency_symbol: "$".to_string(),
        }
    }

    /// The symbol printed for `$` in number patterns.
    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Resets the page counters before a new generation run.
    pub fn reset_pages(&mut self) {
        self.page_number = 0;
        self.page_count = 0;
        self.set_root_value(PAGE_NUMBER, 0);
        self.set_root_value(PAGE_COUNT, 0);
    }

    fn set_root_value(&mut self, name: &str, value: usize) {
        if let Some((_, Value::Object(root))) = self.scopes.first_mut() {
            root.insert(name.to_string(), Value::from(value));
        }
    }

    /// Resolves `name` or `map.field`. Declared parameters without data
    /// resolve to null, unknown names to `None`.
    fn lookup_path(&self, path: &[String]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        match self.data(first) {
            Some(value) => rest
                .iter()
                .try_fold(value, |value, name| value.get(name))
                .cloned()
                .or(Some(Value::Null)),
            None => self.parameter(first).map(|_| Value::Null),
        }
    }

    /// Formats the value behind one `${...}` placeholder. Missing data
    /// yields an empty string.
    fn placeholder_value(
        &self,
        name: &str,
        element_id: ElementId,
        field: &str,
        pattern: Option<&str>,
    ) -> Result<String, EvalError> {
        let undefined = |name: &str| EvalError::UndefinedName {
            element_id,
            field: field.to_string(),
            name: name.to_string(),
        };

        let (parameter, value) = match name.split_once('.') {
            Some((collection, field_name)) => {
                let parameter = self.parameter(collection).ok_or_else(|| undefined(collection))?;
                if parameter.kind != ParameterType::Map {
                    return Err(undefined(name));
                }
                let child = parameter.child(field_name).ok_or_else(|| undefined(name))?;
                (child, self.data(collection).and_then(|map| map.get(field_name)))
            }
            None => {
                let parameter = self.parameter(name).ok_or_else(|| undefined(name))?;
                (parameter, self.data(name))
            }
        };

        match value {
            Some(Value::Null) => Ok(String::new()),
            Some(value) => Ok(self.formatted_value(value, parameter, pattern, false)),
            None => {
                warn!(
                    "Missing data for parameter '{}' (element {}, field '{}')",
                    name, element_id, field
                );
                Ok(String::new())
            }
        }
    }
}

impl EvaluationContext for JsonContext {
    fn evaluate(&self, expr: &str, element_id: ElementId, field: &str) -> Result<Value, EvalError> {
        let to_eval_error = |err: ExprError| match err {
            ExprError::Parse(_, message) => EvalError::Syntax {
                element_id,
                field: field.to_string(),
                message,
            },
            ExprError::UndefinedName(name) => EvalError::UndefinedName {
                element_id,
                field: field.to_string(),
                name,
            },
            ExprError::Type(message) => EvalError::Type {
                element_id,
                field: field.to_string(),
                message,
            },
        };

        let parsed = expr::parse_expression(expr).map_err(to_eval_error)?;
        expr::evaluate(&parsed, &|path: &[String]| self.lookup_path(path)).map_err(to_eval_error)
    }

    fn formatted_value(&self, value: &Value, parameter: &Parameter, pattern: Option<&str>, is_array_item: bool) -> String {
        format_value(value, parameter, pattern, is_array_item, &self.currency_symbol)
    }

    fn fill_parameters(
        &self,
        template: &str,
        element_id: ElementId,
        field: &str,
        pattern: Option<&str>,
    ) -> Result<String, EvalError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = rest[start + 2..start + len].trim();
            out.push_str(&rest[..start]);
            out.push_str(&self.placeholder_value(name, element_id, field, pattern)?);
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
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn page_number(&self) -> usize {
        self.page_number
    }

    fn inc_page_number(&mut self) {
        self.page_number += 1;
        self.set_root_value(PAGE_NUMBER, self.page_number);
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn set_page_count(&mut self, page_count: usize) {
        self.page_count = page_count;
        self.set_root_value(PAGE_COUNT, page_count);
    }
}
