//! The evaluation context consumed by elements.
//!
//! Elements never look at report data directly. They evaluate expressions,
//! fill `${name}` placeholders and push a per-row scope through this trait.

use reportflow_types::{ElementId, Parameter};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("element {element_id}, field '{field}': name '{name}' is not defined")]
    UndefinedName {
        element_id: ElementId,
        field: String,
        name: String,
    },

    #[error("element {element_id}, field '{field}': invalid expression: {message}")]
    Syntax {
        element_id: ElementId,
        field: String,
        message: String,
    },

    #[error("element {element_id}, field '{field}': {message}")]
    Type {
        element_id: ElementId,
        field: String,
        message: String,
    },
}

impl EvalError {
    pub fn element_id(&self) -> ElementId {
        match self {
            EvalError::UndefinedName { element_id, .. }
            | EvalError::Syntax { element_id, .. }
            | EvalError::Type { element_id, .. } => *element_id,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            EvalError::UndefinedName { field, .. }
            | EvalError::Syntax { field, .. }
            | EvalError::Type { field, .. } => field,
        }
    }
}

/// Expression evaluation, value formatting and the parameter/data scope stack.
pub trait EvaluationContext {
    /// Evaluates an expression such as `${amount} > 100`.
    fn evaluate(&self, expr: &str, element_id: ElementId, field: &str) -> Result<Value, EvalError>;

    /// Formats `value` according to the parameter type and pattern.
    /// `pattern` overrides the pattern declared on the parameter.
    fn formatted_value(
        &self,
        value: &Value,
        parameter: &Parameter,
        pattern: Option<&str>,
        is_array_item: bool,
    ) -> String;

    /// Replaces every `${name}` and `${name.field}` placeholder with its
    /// formatted value.
    fn fill_parameters(
        &self,
        template: &str,
        element_id: ElementId,
        field: &str,
        pattern: Option<&str>,
    ) -> Result<String, EvalError>;

    /// Looks up a parameter declaration through all pushed scopes.
    fn parameter(&self, name: &str) -> Option<&Parameter>;

    /// Looks up a data value through all pushed scopes.
    fn data(&self, name: &str) -> Option<&Value>;

    fn push_scope(&mut self, parameters: Arc<[Parameter]>, data: Value);
    fn pop_scope(&mut self);

    fn page_number(&self) -> usize;
    fn inc_page_number(&mut self);
    fn page_count(&self) -> usize;
    fn set_page_count(&mut self, page_count: usize);

    /// Evaluates a condition. Empty conditions are true.
    fn evaluate_condition(&self, expr: &str, element_id: ElementId, field: &str) -> Result<bool, EvalError> {
        if expr.trim().is_empty() {
            return Ok(true);
        }
        Ok(is_truthy(&self.evaluate(expr, element_id, field)?))
    }
}

/// Python-like truthiness, the rule templates are written against.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Plain string form of a value: strings unquoted, null as empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Strips the `${` `}` delimiters of a single parameter reference.
pub fn strip_parameter_name(expr: &str) -> &str {
    let expr = expr.trim();
    let expr = expr.strip_prefix("${").unwrap_or(expr);
    expr.strip_suffix('}').unwrap_or(expr)
}

/// True when `expr` is exactly one parameter reference like `${name}`.
pub fn is_parameter_name(expr: &str) -> bool {
    let expr = expr.trim();
    expr.starts_with("${") && expr.ends_with('}') && expr[2..].find('}') == Some(expr.len() - 3)
}

/// A pushed evaluation scope that is popped again when the guard is dropped,
/// including on early returns through `?`.
pub struct ScopedContext<'a> {
    ctx: &'a mut dyn EvaluationContext,
}

impl<'a> ScopedContext<'a> {
    pub fn push(ctx: &'a mut dyn EvaluationContext, parameters: Arc<[Parameter]>, data: Value) -> Self {
        ctx.push_scope(parameters, data);
        Self { ctx }
    }
}

impl<'a> Deref for ScopedContext<'a> {
    type Target = dyn EvaluationContext + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl<'a> DerefMut for ScopedContext<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl Drop for ScopedContext<'_> {
    fn drop(&mut self) {
        self.ctx.pop_scope();
    }
}
