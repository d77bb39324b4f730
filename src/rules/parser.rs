//! Nom parser for rule expressions
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or         := and (("||" | "or") and)*
//! and        := comparison (("&&" | "and") comparison)*
//! comparison := unary (op unary)?
//! op         := "==" | "!=" | "<=" | ">=" | "<" | ">" | "in" | "not in"
//! unary      := ("!" | "not") unary | postfix
//! postfix    := primary ("[" or "]" | "." ident)*
//! primary    := "(" or ")" | list | string | int | true | false | nil
//!             | ident "(" args ")" | ident
//! ```
//!
//! Negation binds tighter than comparison, so `!A == B` reads as `(!A) == B`.
//! Parentheses, lists, call arguments, indexing, member access and negation
//! each open a nesting level; expressions nested deeper than
//! [`MAX_NESTING`] are rejected.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value, verify},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

use super::errors::RuleError;
use super::value::Value;

const KEYWORDS: &[&str] = &["and", "or", "not", "in", "true", "false", "nil"];

/// Deepest nesting accepted by [`parse_expression`]
pub const MAX_NESTING: usize = 64;

/// Parsed rule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Literal value
    Literal(Value),
    /// List literal, elements evaluated in order
    List(Vec<Expr>),
    /// Context variable
    Ident(String),
    /// `base[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `base.field`
    Member(Box<Expr>, String),
    /// Built-in function call
    Call(String, Vec<Expr>),
    /// Logical negation
    Not(Box<Expr>),
    /// Comparison or membership test
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuiting conjunction of two or more terms
    And(Vec<Expr>),
    /// Short-circuiting disjunction of two or more terms
    Or(Vec<Expr>),
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl BinaryOp {
    /// Operator as written in source
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

enum Postfix {
    Index(Expr),
    Member(String),
}

/// Parses a complete rule expression
///
/// # Errors
///
/// Returns [`RuleError::Syntax`] when the input is not a well-formed
/// expression, has trailing garbage or nests deeper than [`MAX_NESTING`].
pub fn parse_expression(input: &str) -> Result<Expr, RuleError> {
    match all_consuming(ws(|i| or_expr(i, 0)))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Failure(err)) if err.code == ErrorKind::TooLarge => Err(RuleError::Syntax {
            expression: input.to_string(),
            reason: format!("nesting deeper than {MAX_NESTING} levels"),
        }),
        Err(err) => Err(RuleError::Syntax {
            expression: input.to_string(),
            reason: err.to_string(),
        }),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Hard failure once `depth` exceeds [`MAX_NESTING`], so no `alt` retries
fn within_limit(input: &str, depth: usize) -> Result<(), nom::Err<Error<&str>>> {
    if depth > MAX_NESTING {
        Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)))
    } else {
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Matches a reserved word that is not the prefix of a longer identifier
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        verify(
            recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
            |s: &str| !KEYWORDS.contains(&s),
        ),
        String::from,
    )(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        map(
            opt(escaped_transform(
                is_not("\\'"),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("'", tag("'")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('\''),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((double_quoted, single_quoted))(input)
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn arguments(input: &str, depth: usize) -> IResult<&str, Vec<Expr>> {
    separated_list0(ws(char(',')), move |i| or_expr(i, depth))(input)
}

/// Folds `first` and any further terms into one n-ary node
fn chain(first: Expr, rest: Vec<Expr>, node: fn(Vec<Expr>) -> Expr) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut terms = Vec::with_capacity(rest.len() + 1);
    terms.push(first);
    terms.extend(rest);
    node(terms)
}

// =============================================================================
// EXPRESSION PARSERS
// =============================================================================

fn or_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    within_limit(input, depth)?;
    let (input, first) = and_expr(input, depth)?;
    let (input, rest) = many0(preceded(
        ws(alt((tag("||"), keyword("or")))),
        move |i| and_expr(i, depth),
    ))(input)?;
    Ok((input, chain(first, rest, Expr::Or)))
}

fn and_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (input, first) = comparison_expr(input, depth)?;
    let (input, rest) = many0(preceded(
        ws(alt((tag("&&"), keyword("and")))),
        move |i| comparison_expr(i, depth),
    ))(input)?;
    Ok((input, chain(first, rest, Expr::And)))
}

fn comparison_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        value(
            BinaryOp::NotIn,
            pair(keyword("not"), preceded(multispace1, keyword("in"))),
        ),
        value(BinaryOp::In, keyword("in")),
    ))(input)
}

fn comparison_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (input, lhs) = unary_expr(input, depth)?;
    let (input, rest) = opt(pair(ws(comparison_op), move |i| unary_expr(i, depth)))(input)?;
    let expr = match rest {
        Some((op, rhs)) => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
        None => lhs,
    };
    Ok((input, expr))
}

fn unary_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    within_limit(input, depth)?;
    alt((
        map(
            preceded(
                ws(alt((terminated(tag("!"), not(char('='))), keyword("not")))),
                move |i| unary_expr(i, depth + 1),
            ),
            |inner| Expr::Not(Box::new(inner)),
        ),
        move |i| postfix_expr(i, depth),
    ))(input)
}

fn postfix_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (mut input, mut expr) = primary_expr(input, depth)?;
    let mut level = depth;
    loop {
        let suffix = alt((
            map(
                delimited(ws(char('[')), move |i| or_expr(i, level + 1), ws(char(']'))),
                Postfix::Index,
            ),
            map(preceded(ws(char('.')), identifier), Postfix::Member),
        ))(input);

        match suffix {
            Ok((rest, postfix)) => {
                level += 1;
                within_limit(rest, level)?;
                expr = match postfix {
                    Postfix::Index(index) => Expr::Index(Box::new(expr), Box::new(index)),
                    Postfix::Member(field) => Expr::Member(Box::new(expr), field),
                };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, expr)),
            Err(err) => return Err(err),
        }
    }
}

fn call_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    map(
        pair(
            identifier,
            delimited(ws(char('(')), move |i| arguments(i, depth), ws(char(')'))),
        ),
        |(name, args)| Expr::Call(name, args),
    )(input)
}

fn primary_expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    let inner = depth + 1;
    ws(alt((
        delimited(char('('), move |i| or_expr(i, inner), ws(char(')'))),
        map(
            delimited(char('['), move |i| arguments(i, inner), ws(char(']'))),
            Expr::List,
        ),
        map(string_literal, |s| Expr::Literal(Value::Str(s))),
        map(integer_literal, |n| Expr::Literal(Value::Int(n))),
        value(Expr::Literal(Value::Bool(true)), keyword("true")),
        value(Expr::Literal(Value::Bool(false)), keyword("false")),
        value(Expr::Literal(Value::Nil), keyword("nil")),
        move |i| call_expr(i, inner),
        map(identifier, Expr::Ident),
    )))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    fn string(s: &str) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Str(s.to_string())))
    }

    #[test]
    fn test_parse_equality() {
        let expr = parse_expression(r#"MODULE_BUILD_SYSTEM == "gomod""#).unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::Eq, ident("MODULE_BUILD_SYSTEM"), string("gomod"))
        );
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("a || b && !c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                *ident("a"),
                Expr::And(vec![*ident("b"), Expr::Not(ident("c"))]),
            ])
        );
    }

    #[test]
    fn test_parse_flat_chains() {
        let expr = parse_expression("a && b && c").unwrap();
        assert_eq!(expr, Expr::And(vec![*ident("a"), *ident("b"), *ident("c")]));
    }

    #[test]
    fn test_negation_binds_tighter_than_comparison() {
        let expr = parse_expression("!a == b").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::Eq, Box::new(Expr::Not(ident("a"))), ident("b"))
        );

        let expr = parse_expression("!(a == b)").unwrap();
        assert_eq!(
            expr,
            Expr::Not(Box::new(Expr::Binary(BinaryOp::Eq, ident("a"), ident("b"))))
        );
    }

    #[test]
    fn test_parse_word_operators() {
        let symbolic = parse_expression("a && b || not c").unwrap();
        let words = parse_expression("a and b or !c").unwrap();
        assert_eq!(symbolic, words);
    }

    #[test]
    fn test_parse_call_and_index() {
        let expr = parse_expression(r#"hasPrefix(ENV["CI_REF"], 'refs/')"#).unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                "hasPrefix".to_string(),
                vec![
                    Expr::Index(ident("ENV"), string("CI_REF")),
                    Expr::Literal(Value::Str("refs/".to_string())),
                ]
            )
        );
    }

    #[test]
    fn test_parse_member_access() {
        let expr = parse_expression("ENV.HOME").unwrap();
        assert_eq!(expr, Expr::Member(ident("ENV"), "HOME".to_string()));
    }

    #[test]
    fn test_parse_not_in() {
        let expr = parse_expression(r#""x" not in ["a", "b"]"#).unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::NotIn, _, _)));
    }

    #[test]
    fn test_parse_escaped_string() {
        let expr = parse_expression(r#""say \"hi\"""#).unwrap();
        assert_eq!(*string("say \"hi\""), expr);
    }

    #[test]
    fn test_parse_empty_string() {
        let expr = parse_expression(r#"x == """#).unwrap();
        assert_eq!(expr, Expr::Binary(BinaryOp::Eq, ident("x"), string("")));
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let expr = parse_expression("order == inventory").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::Eq, ident("order"), ident("inventory"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a ==").is_err());
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(matches!(
            parse_expression("== 1"),
            Err(RuleError::Syntax { .. })
        ));
    }

    fn nesting_error(expr: &str) -> bool {
        matches!(
            parse_expression(expr),
            Err(RuleError::Syntax { reason, .. }) if reason.contains("nesting")
        )
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = MAX_NESTING - 1;
        let expr = format!("{}true{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_expression(&expr).unwrap(), Expr::Literal(Value::Bool(true)));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        assert!(nesting_error(&format!(
            "{}true{}",
            "(".repeat(2_000),
            ")".repeat(2_000)
        )));
        assert!(nesting_error(&format!("{}true", "!".repeat(50_000))));
        assert!(nesting_error(&format!("{}true", "not ".repeat(1_000))));
        assert!(nesting_error(&format!("{}1{}", "[".repeat(1_000), "]".repeat(1_000))));
        assert!(nesting_error(&format!("x{}", "[0]".repeat(1_000))));
        assert!(nesting_error(&format!("ENV{}", ".a".repeat(1_000))));
        assert!(nesting_error(&format!("{}1{}", "f(".repeat(1_000), ")".repeat(1_000))));
    }

    #[test]
    fn test_unbalanced_deep_nesting_is_rejected() {
        assert!(parse_expression(&"(".repeat(100_000)).is_err());
    }

    #[test]
    fn test_long_flat_expression() {
        let expr = vec!["a == 1"; 10_000].join(" || ");
        match parse_expression(&expr).unwrap() {
            Expr::Or(terms) => assert_eq!(terms.len(), 10_000),
            other => panic!("expected a disjunction, got {other:?}"),
        }
    }
}
