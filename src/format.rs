//! Display formatting of parameter values: number patterns such as
//! `$ #,##0.00` and joda-style date patterns such as `dd.MM.yyyy`.

use crate::expr::to_number;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reportflow_traits::context::value_to_string;
use reportflow_types::{Parameter, ParameterType};
use serde_json::Value;
use std::fmt::Write;

/// Formats `value` the way the parameter declares it. `pattern` overrides the
/// parameter pattern; `is_array_item` selects the item type of simple arrays.
pub fn format_value(
    value: &Value,
    parameter: &Parameter,
    pattern: Option<&str>,
    is_array_item: bool,
    currency_symbol: &str,
) -> String {
    let value_type = if is_array_item && parameter.kind == ParameterType::SimpleArray {
        parameter.array_item_type
    } else {
        parameter.kind
    };
    let pattern = pattern
        .filter(|p| !p.trim().is_empty())
        .or(Some(parameter.pattern.as_str()).filter(|p| !p.trim().is_empty()));

    match value_type {
        ParameterType::Number | ParameterType::Sum | ParameterType::Average => {
            let Some(number) = numeric_value(value) else {
                return value_to_string(value);
            };
            match pattern {
                Some(pattern) => {
                    let formatted = format_number(number, pattern);
                    if pattern.contains('$') {
                        format!("{}{}", currency_symbol, formatted)
                    } else {
                        formatted
                    }
                }
                None if number.fract() == 0.0 => format!("{}", number as i64),
                None => format!("{:.2}", number),
            }
        }
        ParameterType::Date => match (pattern, value) {
            (Some(pattern), Value::String(s)) => {
                format_date(s, pattern).unwrap_or_else(|| s.clone())
            }
            _ => value_to_string(value),
        },
        _ => value_to_string(value),
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => to_number(&Value::String(s.replace(',', ""))),
        Value::Bool(_) | Value::Null => None,
        other => to_number(other),
    }
}

/// Applies a number pattern: the digits after `.` give the decimals, a `,`
/// in the integer part enables thousands grouping.
pub fn format_number(number: f64, pattern: &str) -> String {
    let pattern: String = pattern.chars().filter(|c| !c.is_whitespace() && *c != '$').collect();
    let (integer_pattern, decimal_pattern) = pattern.split_once('.').unwrap_or((&pattern, ""));
    let decimals = decimal_pattern.chars().filter(|c| *c == '0' || *c == '#').count();
    let grouping = integer_pattern.contains(',');

    let formatted = format!("{:.*}", decimals, number.abs());
    let (integer_part, fraction) = formatted.split_once('.').unwrap_or((&formatted, ""));

    let mut out = String::new();
    if number < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    if grouping {
        let len = integer_part.len();
        for (i, c) in integer_part.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
    } else {
        out.push_str(integer_part);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Parses a date value and renders it with a joda-style pattern.
pub fn format_date(value: &str, pattern: &str) -> Option<String> {
    let datetime = parse_date(value)?;
    let mut out = String::new();
    write!(out, "{}", datetime.format(&joda_to_strftime(pattern))).ok()?;
    Some(out)
}

/// Accepts RFC 3339 timestamps, `yyyy-MM-dd HH:mm[:ss]` and plain dates.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Translates joda/ICU date tokens (`yyyy`, `MM`, `dd`, `HH`, ...) into
/// chrono's strftime syntax. Text inside single quotes is copied verbatim.
fn joda_to_strftime(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let token = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(token);
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
