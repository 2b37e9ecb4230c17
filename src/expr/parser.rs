//! A `nom`-based parser for report expressions such as
//! `${amount} > 100 and not ${hidden}`.

use super::ast::{BinaryOperator, Expression, UnaryOperator};
use super::ExprError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, not, opt},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
};
use serde_json::Value;

pub fn parse_expression(input: &str) -> Result<Expression, ExprError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(ExprError::Parse(
            input.to_string(),
            format!("unexpected input at '{}'", rem),
        )),
        Err(e) => Err(ExprError::Parse(input.to_string(), e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

/// Matches `word` only when it is not the prefix of a longer name.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(satisfy(|c: char| c.is_alphanumeric() || c == '_')))
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = BinaryOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) = many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("or"), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("and"), |_| BinaryOperator::And).parse(input)
}

fn comparison_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("=="), |_| BinaryOperator::Equals),
        map(tag("!="), |_| BinaryOperator::NotEquals),
        map(tag("<="), |_| BinaryOperator::LessThanOrEqual),
        map(tag(">="), |_| BinaryOperator::GreaterThanOrEqual),
        map(char('<'), |_| BinaryOperator::LessThan),
        map(char('>'), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Plus),
        map(char('-'), |_| BinaryOperator::Minus),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(char('/'), |_| BinaryOperator::Divide),
        map(char('%'), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(not_expr, and_op)(input)
}

fn not_expr(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(keyword("not")), not_expr), |expr| Expression::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(expr),
        }),
        comparison_expr,
    ))
    .parse(input)
}

fn comparison_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(additive_expr, comparison_op)(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (i, neg_op) = opt(ws(char('-'))).parse(input)?;
    let (i, expr) = primary_expr(i)?;

    if neg_op.is_some() {
        Ok((
            i,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            },
        ))
    } else {
        Ok((i, expr))
    }
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        delimited(ws(char('(')), expression, char(')')),
        parameter,
        map(literal, Expression::Literal),
    )))
    .parse(input)
}

// --- Terminals ---

/// `${name}` or `${collection.field}`.
fn parameter(input: &str) -> IResult<&str, Expression> {
    map(
        delimited(tag("${"), separated_list1(char('.'), is_not(".}")), char('}')),
        |names: Vec<&str>| Expression::Parameter(names.into_iter().map(|n| n.trim().to_string()).collect()),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, Value> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        |s: &str| Value::from(s),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("True"), |_| Value::Bool(true)),
        map(keyword("False"), |_| Value::Bool(false)),
        map(keyword("None"), |_| Value::Null),
        map(double, super::number_value),
        string_literal,
    ))
    .parse(input)
}
