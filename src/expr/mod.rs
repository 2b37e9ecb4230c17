//! The expression language used by `printIf`, `eval` fields, conditional
//! styles and group expressions.
//!
//! Expressions reference parameters as `${name}` and support the usual
//! arithmetic, comparison and boolean operators. `and`/`or` return one of
//! their operands, numeric strings take part in arithmetic as numbers.

mod ast;
mod parser;

pub use self::ast::{BinaryOperator, Expression, UnaryOperator};
pub use self::parser::parse_expression;

use reportflow_traits::context::{is_truthy, value_to_string};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("invalid expression '{0}': {1}")]
    Parse(String, String),

    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    #[error("{0}")]
    Type(String),
}

/// Evaluates `expr`, resolving parameter paths through `lookup`.
pub fn evaluate<F>(expr: &Expression, lookup: &F) -> Result<Value, ExprError>
where
    F: Fn(&[String]) -> Option<Value>,
{
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Parameter(path) => lookup(path).ok_or_else(|| ExprError::UndefinedName(path.join("."))),
        Expression::UnaryOp { op: UnaryOperator::Not, expr } => Ok(Value::Bool(!is_truthy(&evaluate(expr, lookup)?))),
        Expression::UnaryOp { op: UnaryOperator::Minus, expr } => {
            let value = evaluate(expr, lookup)?;
            let n = to_number(&value).ok_or_else(|| type_error("-", &value, None))?;
            Ok(number_value(-n))
        }
        Expression::BinaryOp { left, op: BinaryOperator::Or, right } => {
            let left = evaluate(left, lookup)?;
            if is_truthy(&left) { Ok(left) } else { evaluate(right, lookup) }
        }
        Expression::BinaryOp { left, op: BinaryOperator::And, right } => {
            let left = evaluate(left, lookup)?;
            if is_truthy(&left) { evaluate(right, lookup) } else { Ok(left) }
        }
        Expression::BinaryOp { left, op, right } => {
            let left = evaluate(left, lookup)?;
            let right = evaluate(right, lookup)?;
            binary(*op, &left, &right)
        }
    }
}

fn binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let numbers = to_number(left).zip(to_number(right));
    match op {
        BinaryOperator::Equals => Ok(Value::Bool(values_equal(left, right))),
        BinaryOperator::NotEquals => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            let ordering = match (left, right) {
                (Value::String(l), Value::String(r)) if numbers.is_none() => Some(l.cmp(r)),
                _ => numbers.and_then(|(l, r)| l.partial_cmp(&r)),
            };
            let ordering = ordering.ok_or_else(|| type_error(operator_symbol(op), left, Some(right)))?;
            Ok(Value::Bool(match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOperator::Plus => match numbers {
            Some((l, r)) => Ok(number_value(l + r)),
            None if left.is_string() || right.is_string() => {
                Ok(Value::String(value_to_string(left) + &value_to_string(right)))
            }
            None => Err(type_error("+", left, Some(right))),
        },
        _ => {
            let (l, r) = numbers.ok_or_else(|| type_error(operator_symbol(op), left, Some(right)))?;
            match op {
                BinaryOperator::Minus => Ok(number_value(l - r)),
                BinaryOperator::Multiply => Ok(number_value(l * r)),
                BinaryOperator::Divide | BinaryOperator::Modulo if r == 0.0 => {
                    Err(ExprError::Type("division by zero".to_string()))
                }
                BinaryOperator::Divide => Ok(number_value(l / r)),
                // Floored modulo, the sign follows the divisor.
                _ => Ok(number_value(l - r * (l / r).floor())),
            }
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (to_number(left), to_number(right)) {
        (Some(l), Some(r)) if !left.is_null() && !right.is_null() => l == r,
        _ => left == right,
    }
}

/// Numeric view of a value. Strings count when they parse as a number.
pub(crate) fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Builds a JSON number, using an integer when the value has no fraction.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn operator_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Or => "or",
        BinaryOperator::And => "and",
        BinaryOperator::Equals => "==",
        BinaryOperator::NotEquals => "!=",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessThanOrEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterThanOrEqual => ">=",
        BinaryOperator::Plus => "+",
        BinaryOperator::Minus => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn type_error(op: &str, left: &Value, right: Option<&Value>) -> ExprError {
    match right {
        Some(right) => ExprError::Type(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op,
            type_name(left),
            type_name(right)
        )),
        None => ExprError::Type(format!("bad operand type for unary {}: '{}'", op, type_name(left))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_with(expr: &str, data: &Value) -> Result<Value, ExprError> {
        let parsed = parse_expression(expr)?;
        evaluate(&parsed, &|path: &[String]| {
            path.iter().try_fold(data, |value, name| value.get(name)).cloned()
        })
    }

    fn eval(expr: &str) -> Result<Value, ExprError> {
        eval_with(expr, &json!({}))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), json!(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), json!(9));
        assert_eq!(eval("7 / 2").unwrap(), json!(3.5));
        assert_eq!(eval("6 / 2").unwrap(), json!(3));
        assert_eq!(eval("-7 % 3").unwrap(), json!(2));
        assert_eq!(eval("10 - 2 - 3").unwrap(), json!(5));
    }

    #[test]
    fn test_numeric_strings_and_concatenation() {
        let data = json!({"amount": "12.5", "name": "Widget", "qty": 3});
        assert_eq!(eval_with("${amount} * 2", &data).unwrap(), json!(25));
        assert_eq!(eval_with("${name} + ' x' + ${qty}", &data).unwrap(), json!("Widget x3"));
        assert_eq!(eval_with("${amount} > 10", &data).unwrap(), json!(true));
    }

    #[test]
    fn test_boolean_operators_return_operands() {
        assert_eq!(eval("0 or 'fallback'").unwrap(), json!("fallback"));
        assert_eq!(eval("'' and 1").unwrap(), json!(""));
        assert_eq!(eval("not None").unwrap(), json!(true));
        assert_eq!(eval("True and not False").unwrap(), json!(true));
    }

    #[test]
    fn test_or_short_circuits_undefined_names() {
        assert_eq!(eval("True or ${missing}").unwrap(), json!(true));
        assert_eq!(eval("False or ${missing}"), Err(ExprError::UndefinedName("missing".into())));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("'abc' < 'abd'").unwrap(), json!(true));
        assert_eq!(eval("2 == 2.0").unwrap(), json!(true));
        assert_eq!(eval("None == None").unwrap(), json!(true));
        assert_eq!(eval("'a' != 1").unwrap(), json!(true));
        assert!(matches!(eval("'a' < 1"), Err(ExprError::Type(_))));
    }

    #[test]
    fn test_map_field_access() {
        let data = json!({"customer": {"city": "Oslo"}});
        assert_eq!(eval_with("${customer.city} == 'Oslo'", &data).unwrap(), json!(true));
    }

    #[test]
    fn test_division_by_zero_is_a_type_error() {
        assert_eq!(eval("1 / 0"), Err(ExprError::Type("division by zero".into())));
        assert_eq!(eval("1 % 0"), Err(ExprError::Type("division by zero".into())));
    }

    #[test]
    fn test_invalid_operands() {
        assert!(matches!(eval("-'abc'"), Err(ExprError::Type(_))));
        assert!(matches!(eval("None + 1"), Err(ExprError::Type(_))));
    }
}
