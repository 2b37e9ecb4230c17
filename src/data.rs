//! Normalization of report data against the declared parameters.
//!
//! Scalars are coerced to their declared type and missing values get a
//! default unless the parameter is nullable. Arrays, simple arrays and maps
//! are processed on the top level; deeper collections are passed through
//! unchanged. Computed parameters (sums, averages and `eval` expressions)
//! are filled in once the rest of the data is complete.

use crate::error::{ReportError, TemplateError};
use crate::expr::{self, number_value, to_number};
use crate::format::parse_date;
use chrono::Local;
use log::debug;
use reportflow_traits::context::{strip_parameter_name, value_to_string};
use reportflow_types::{ElementId, Parameter, ParameterType};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Returns the processed copy of `data`, or every problem found in it.
pub fn process_data(parameters: &[Parameter], data: Value) -> Result<Value, ReportError> {
    let data = match data {
        Value::Object(map) => map,
        Value::Null => Object::new(),
        _ => {
            return Err(ReportError::InvalidTemplate(vec![TemplateError::new(
                "report data must be an object",
                ElementId::DOCUMENT,
                "data",
            )]));
        }
    };

    let mut processor = DataProcessor::default();
    let mut processed = processor.scope(parameters, &data, true);
    processor.compute(parameters, &mut processed);

    if !processor.errors.is_empty() {
        return Err(ReportError::InvalidTemplate(processor.errors));
    }
    Ok(Value::Object(processed))
}

#[derive(Default)]
struct DataProcessor {
    errors: Vec<TemplateError>,
}

impl DataProcessor {
    fn error(&mut self, parameter: &Parameter, field: &str, message: String) {
        self.errors.push(TemplateError::new(message, parameter.id, field));
    }

    fn scope(&mut self, parameters: &[Parameter], source: &Object, top_level: bool) -> Object {
        let mut out = Object::new();
        for parameter in parameters {
            if parameter.is_internal() || parameter.is_computed() {
                continue;
            }
            let value = source.get(&parameter.name).cloned().unwrap_or(Value::Null);
            let value = match parameter.kind {
                kind if kind.is_scalar() => self.scalar(parameter, kind, value),
                ParameterType::Array if top_level => self.array(parameter, value),
                ParameterType::SimpleArray if top_level => self.simple_array(parameter, value),
                ParameterType::Map if top_level => self.map(parameter, value),
                _ => value,
            };
            out.insert(parameter.name.clone(), value);
        }
        out
    }

    fn scalar(&mut self, parameter: &Parameter, kind: ParameterType, value: Value) -> Value {
        let default = |value: Value| if parameter.nullable { Value::Null } else { value };
        match (kind, value) {
            (ParameterType::String, Value::Null) => default(Value::from("")),
            (ParameterType::String, Value::String(s)) => Value::String(s),
            (ParameterType::String, other) => {
                debug!("Parameter '{}' expects a string, converting {}", parameter.name, other);
                Value::String(value_to_string(&other))
            }

            (ParameterType::Number, Value::Null) => default(Value::from(0)),
            (ParameterType::Number, Value::Number(n)) => Value::Number(n),
            (ParameterType::Number, Value::String(s)) if s.trim().is_empty() => default(Value::from(0)),
            (ParameterType::Number, Value::String(s)) => {
                match to_number(&Value::String(s.replace(',', ""))) {
                    Some(n) => number_value(n),
                    None => {
                        self.error(parameter, "type", format!("invalid number '{}' for '{}'", s, parameter.name));
                        Value::String(s)
                    }
                }
            }

            (ParameterType::Boolean, Value::Null) => default(Value::Bool(false)),
            (ParameterType::Boolean, Value::Bool(b)) => Value::Bool(b),
            (ParameterType::Boolean, Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            (ParameterType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" | "" => Value::Bool(false),
                _ => {
                    self.error(parameter, "type", format!("invalid boolean '{}' for '{}'", s, parameter.name));
                    Value::String(s)
                }
            },

            (ParameterType::Date, Value::Null) => default(Value::String(Local::now().format("%Y-%m-%d").to_string())),
            (ParameterType::Date, Value::String(s)) if parse_date(&s).is_some() => Value::String(s.trim().to_string()),

            (kind, other) => {
                self.error(
                    parameter,
                    "type",
                    format!("invalid {:?} value {} for '{}'", kind, other, parameter.name).to_lowercase(),
                );
                other
            }
        }
    }

    fn array(&mut self, parameter: &Parameter, value: Value) -> Value {
        match value {
            Value::Null if parameter.nullable => Value::Null,
            Value::Null => Value::Array(Vec::new()),
            Value::Array(rows) => {
                let mut processed = Vec::with_capacity(rows.len());
                for row in rows {
                    match row {
                        Value::Object(row) => processed.push(Value::Object(self.scope(&parameter.children, &row, false))),
                        other => {
                            self.error(parameter, "type", format!("rows of '{}' must be objects, got {}", parameter.name, other));
                        }
                    }
                }
                Value::Array(processed)
            }
            other => {
                self.error(parameter, "type", format!("'{}' must be a list, got {}", parameter.name, other));
                other
            }
        }
    }

    fn simple_array(&mut self, parameter: &Parameter, value: Value) -> Value {
        match value {
            Value::Null if parameter.nullable => Value::Null,
            Value::Null => Value::Array(Vec::new()),
            Value::Array(items) if parameter.array_item_type.is_scalar() => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.scalar(parameter, parameter.array_item_type, item))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items),
            other => {
                self.error(parameter, "type", format!("'{}' must be a list, got {}", parameter.name, other));
                other
            }
        }
    }

    fn map(&mut self, parameter: &Parameter, value: Value) -> Value {
        let fields = match value {
            Value::Null if parameter.nullable => return Value::Null,
            Value::Null => Object::new(),
            Value::Object(fields) => fields,
            other => {
                self.error(parameter, "type", format!("'{}' must be an object, got {}", parameter.name, other));
                return other;
            }
        };
        if parameter.children.is_empty() {
            self.error(parameter, "type", format!("map '{}' declares no fields", parameter.name));
            return Value::Object(fields);
        }
        Value::Object(self.scope(&parameter.children, &fields, false))
    }

    /// Fills in computed parameters, rows and map fields first so top-level
    /// expressions can use them.
    fn compute(&mut self, parameters: &[Parameter], root: &mut Object) {
        for parameter in parameters {
            if !matches!(parameter.kind, ParameterType::Array | ParameterType::Map)
                || !parameter.children.iter().any(Parameter::is_computed)
            {
                continue;
            }
            match root.remove(&parameter.name) {
                Some(Value::Array(mut rows)) => {
                    for row in &mut rows {
                        if let Value::Object(row) = row {
                            self.compute_scope(&parameter.children, row, Some(&*root));
                        }
                    }
                    root.insert(parameter.name.clone(), Value::Array(rows));
                }
                Some(Value::Object(mut fields)) => {
                    self.compute_scope(&parameter.children, &mut fields, Some(&*root));
                    root.insert(parameter.name.clone(), Value::Object(fields));
                }
                Some(other) => {
                    root.insert(parameter.name.clone(), other);
                }
                None => {}
            }
        }
        self.compute_scope(parameters, root, None);
    }

    fn compute_scope(&mut self, parameters: &[Parameter], scope: &mut Object, outer: Option<&Object>) {
        for parameter in parameters {
            // a missing expression is reported by template validation
            if !parameter.is_computed() || parameter.is_internal() || parameter.expression.trim().is_empty() {
                continue;
            }
            let value = match parameter.kind {
                ParameterType::Sum | ParameterType::Average => self.aggregate(parameter, scope, outer),
                _ => self.evaluate(parameter, scope, outer),
            };
            if let Some(value) = value {
                scope.insert(parameter.name.clone(), value);
            }
        }
    }

    /// Sum or average of `${collection.field}` over the rows of an array.
    fn aggregate(&mut self, parameter: &Parameter, scope: &Object, outer: Option<&Object>) -> Option<Value> {
        let path = strip_parameter_name(&parameter.expression);
        let invalid = |message: &str| format!("{} in '{}' of '{}'", message, parameter.expression, parameter.name);

        let Some((collection, field)) = path.split_once('.') else {
            self.error(parameter, "expression", invalid("expected ${collection.field}"));
            return None;
        };
        let rows = match scope.get(collection).or_else(|| outer.and_then(|o| o.get(collection))) {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) => return Some(Value::from(0)),
            _ => {
                self.error(parameter, "expression", invalid("unknown list"));
                return None;
            }
        };

        let mut total = 0.0;
        for row in rows {
            let Some(value) = row.get(field) else {
                self.error(parameter, "expression", invalid("unknown field"));
                return None;
            };
            total += match value {
                Value::String(s) => to_number(&Value::String(s.replace(',', ""))),
                other => to_number(other),
            }
            .unwrap_or(0.0);
        }

        let result = match parameter.kind {
            ParameterType::Average if rows.is_empty() => 0.0,
            ParameterType::Average => total / rows.len() as f64,
            _ => total,
        };
        Some(number_value(result))
    }

    fn evaluate(&mut self, parameter: &Parameter, scope: &Object, outer: Option<&Object>) -> Option<Value> {
        let lookup = |path: &[String]| {
            let (first, rest) = path.split_first()?;
            let value = scope.get(first).or_else(|| outer.and_then(|o| o.get(first)))?;
            rest.iter().try_fold(value, |value, name| value.get(name)).cloned()
        };
        let result = expr::parse_expression(&parameter.expression).and_then(|parsed| expr::evaluate(&parsed, &lookup));
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.error(parameter, "expression", err.to_string());
                None
            }
        }
    }
}
