//! Compiled rule programs and the tree-walking evaluator

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::context::{RuleContext, vars};
use super::errors::RuleError;
use super::parser::{BinaryOp, Expr, parse_expression};
use super::value::Value;

/// A parsed rule expression, ready to run against any number of contexts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    source: String,
    expr: Expr,
}

impl Program {
    /// Compiles an expression
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Syntax`] if the expression does not parse.
    pub fn compile(source: &str) -> Result<Self, RuleError> {
        let expr = parse_expression(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every context variable the expression refers to
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        collect_variables(&self.expr, &mut names);
        names
    }

    /// Returns true if the expression reads any `MODULE_*` variable
    #[must_use]
    pub fn uses_module_variables(&self) -> bool {
        self.variables()
            .iter()
            .any(|name| name.starts_with(vars::MODULE_PREFIX))
    }

    /// Runs the program and returns whatever value it produces
    ///
    /// # Errors
    ///
    /// Fails on unknown variables or functions and on type mismatches.
    pub fn run(&self, ctx: &RuleContext) -> Result<Value, RuleError> {
        eval(&self.expr, ctx)
    }

    /// Runs the program and requires a boolean result
    ///
    /// # Errors
    ///
    /// Same as [`Program::run`], plus [`RuleError::NonBoolean`].
    pub fn matches(&self, ctx: &RuleContext) -> Result<bool, RuleError> {
        let value = self.run(ctx)?;
        value.as_bool().ok_or_else(|| RuleError::NonBoolean {
            found: value.kind().to_string(),
        })
    }
}

fn collect_variables<'a>(expr: &'a Expr, names: &mut BTreeSet<&'a str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Ident(name) => {
            names.insert(name);
        }
        Expr::List(items) | Expr::Call(_, items) | Expr::And(items) | Expr::Or(items) => {
            for item in items {
                collect_variables(item, names);
            }
        }
        Expr::Member(base, _) | Expr::Not(base) => collect_variables(base, names),
        Expr::Index(lhs, rhs) | Expr::Binary(_, lhs, rhs) => {
            collect_variables(lhs, names);
            collect_variables(rhs, names);
        }
    }
}

fn eval(expr: &Expr, ctx: &RuleContext) -> Result<Value, RuleError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Ident(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::UnknownVariable(name.clone())),
        Expr::Index(base, index) => index_value(eval(base, ctx)?, &eval(index, ctx)?),
        Expr::Member(base, field) => match eval(base, ctx)? {
            Value::Map(map) => Ok(map.get(field).cloned().map_or(Value::Nil, Value::Str)),
            other => Err(RuleError::mismatch(format!(".{field}"), other.kind())),
        },
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_function(name, &args)
        }
        Expr::Not(inner) => Ok(Value::Bool(!expect_bool(eval(inner, ctx)?, "!")?)),
        Expr::And(terms) => {
            for term in terms {
                if !expect_bool(eval(term, ctx)?, "&&")? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(terms) => {
            for term in terms {
                if expect_bool(eval(term, ctx)?, "||")? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, &eval(lhs, ctx)?, &eval(rhs, ctx)?).map(Value::Bool),
    }
}

fn expect_bool(value: Value, operation: &str) -> Result<bool, RuleError> {
    value
        .as_bool()
        .ok_or_else(|| RuleError::mismatch(operation, value.kind()))
}

fn index_value(base: Value, index: &Value) -> Result<Value, RuleError> {
    match (base, index) {
        (Value::Map(map), Value::Str(key)) => {
            Ok(map.get(key).cloned().map_or(Value::Nil, Value::Str))
        }
        (Value::List(items), Value::Int(i)) => {
            let len = items.len();
            usize::try_from(*i)
                .ok()
                .and_then(|idx| items.into_iter().nth(idx))
                .ok_or(RuleError::IndexOutOfRange { index: *i, len })
        }
        (base, index) => Err(RuleError::mismatch(
            "[]",
            format!("{}[{}]", base.kind(), index.kind()),
        )),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<bool, RuleError> {
    let mismatch = || RuleError::mismatch(op.symbol(), format!("{} and {}", lhs.kind(), rhs.kind()));
    match op {
        BinaryOp::Eq => equals(lhs, rhs).ok_or_else(mismatch),
        BinaryOp::Ne => equals(lhs, rhs).map(|eq| !eq).ok_or_else(mismatch),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => return Err(mismatch()),
            };
            Ok(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        BinaryOp::In => membership(lhs, rhs).ok_or_else(mismatch),
        BinaryOp::NotIn => membership(lhs, rhs).map(|found| !found).ok_or_else(mismatch),
    }
}

/// `None` when the operands cannot be compared
fn equals(lhs: &Value, rhs: &Value) -> Option<bool> {
    match (lhs, rhs) {
        (Value::Nil, _) | (_, Value::Nil) => Some(lhs == rhs),
        _ if lhs.kind() == rhs.kind() => Some(lhs == rhs),
        _ => None,
    }
}

fn membership(item: &Value, container: &Value) -> Option<bool> {
    match (item, container) {
        (_, Value::List(items)) => Some(items.contains(item)),
        (Value::Str(key), Value::Map(map)) => Some(map.contains_key(key)),
        _ => None,
    }
}

fn arity(function: &str, args: &[Value], expected: usize) -> Result<(), RuleError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuleError::Arity {
            function: function.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn call_function(name: &str, args: &[Value]) -> Result<Value, RuleError> {
    let signature = || {
        args.iter()
            .map(Value::kind)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match name {
        "contains" => {
            arity(name, args, 2)?;
            match &args[0] {
                Value::List(items) => Ok(Value::Bool(items.contains(&args[1]))),
                _ => Err(RuleError::mismatch("contains", signature())),
            }
        }
        "containsKey" => {
            arity(name, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Map(map), Value::Str(key)) => Ok(Value::Bool(map.contains_key(key))),
                _ => Err(RuleError::mismatch("containsKey", signature())),
            }
        }
        "getMapValue" => {
            arity(name, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Map(map), Value::Str(key)) => {
                    Ok(Value::Str(map.get(key).cloned().unwrap_or_default()))
                }
                _ => Err(RuleError::mismatch("getMapValue", signature())),
            }
        }
        "hasPrefix" => {
            arity(name, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Str(s), Value::Str(prefix)) => Ok(Value::Bool(s.starts_with(prefix.as_str()))),
                _ => Err(RuleError::mismatch("hasPrefix", signature())),
            }
        }
        _ => Err(RuleError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn context() -> RuleContext {
        let mut ctx = RuleContext::new();
        ctx.insert("NAME", "api");
        ctx.insert("COUNT", 3_i64);
        ctx.insert(
            "FILES",
            vec!["go.mod".to_string(), "main.go".to_string()],
        );
        ctx.insert(
            "ENV",
            BTreeMap::from([("CI".to_string(), "true".to_string())]),
        );
        ctx
    }

    fn run(source: &str) -> Result<bool, RuleError> {
        Program::compile(source)?.matches(&context())
    }

    #[test]
    fn test_builtin_functions() {
        assert_eq!(run(r#"contains(FILES, "go.mod")"#), Ok(true));
        assert_eq!(run(r#"contains(FILES, "Cargo.toml")"#), Ok(false));
        assert_eq!(run(r#"containsKey(ENV, "CI")"#), Ok(true));
        assert_eq!(run(r#"containsKey(ENV, "HOME")"#), Ok(false));
        assert_eq!(run(r#"getMapValue(ENV, "CI") == "true""#), Ok(true));
        assert_eq!(run(r#"getMapValue(ENV, "MISSING") == """#), Ok(true));
        assert_eq!(run(r#"hasPrefix(NAME, "ap")"#), Ok(true));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run("COUNT > 2 && COUNT <= 3"), Ok(true));
        assert_eq!(run(r#"NAME != "web""#), Ok(true));
        assert_eq!(run(r#""main.go" in FILES"#), Ok(true));
        assert_eq!(run(r#""CI" in ENV"#), Ok(true));
        assert_eq!(run(r#""x" not in ["a", "b"]"#), Ok(true));
    }

    #[test]
    fn test_indexing() {
        assert_eq!(run(r#"ENV["CI"] == "true""#), Ok(true));
        assert_eq!(run(r#"ENV["NOPE"] == nil"#), Ok(true));
        assert_eq!(run(r#"ENV.CI == "true""#), Ok(true));
        assert_eq!(run(r#"FILES[1] == "main.go""#), Ok(true));
        assert!(matches!(
            run("FILES[5] == nil"),
            Err(RuleError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        assert_eq!(run("false && UNDEFINED"), Ok(false));
        assert_eq!(run("true || UNDEFINED"), Ok(true));
        assert!(run("true && UNDEFINED").is_err());
    }

    #[test]
    fn test_negation_precedence() {
        assert_eq!(run("!false == true"), Ok(true));
        assert_eq!(run(r#"!(NAME == "web")"#), Ok(true));
        assert!(matches!(run(r#"!NAME == "api""#), Err(RuleError::TypeMismatch { .. })));
    }

    #[test]
    fn test_long_chains() {
        let any = vec![r#"NAME == "web""#; 5_000].join(" || ") + r#" || NAME == "api""#;
        assert_eq!(run(&any), Ok(true));
        let all = vec!["COUNT == 3"; 5_000].join(" && ");
        assert_eq!(run(&all), Ok(true));
    }

    #[test]
    fn test_type_mismatches() {
        assert!(matches!(run("NAME == 1"), Err(RuleError::TypeMismatch { .. })));
        assert!(matches!(run("!NAME"), Err(RuleError::TypeMismatch { .. })));
        assert!(matches!(
            run(r#"hasPrefix(FILES, "a")"#),
            Err(RuleError::TypeMismatch { .. })
        ));
        assert!(matches!(run("NAME"), Err(RuleError::NonBoolean { .. })));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            run("MISSING == 1"),
            Err(RuleError::UnknownVariable("MISSING".to_string()))
        );
        assert_eq!(
            run("explode()"),
            Err(RuleError::UnknownFunction("explode".to_string()))
        );
        assert!(matches!(run("hasPrefix(NAME)"), Err(RuleError::Arity { .. })));
    }

    #[test]
    fn test_program_variables() {
        let program =
            Program::compile(r#"MODULE_NAME == "x" || contains(MODULE_FILES, NAME)"#).unwrap();
        let vars: Vec<&str> = program.variables().into_iter().collect();
        assert_eq!(vars, vec!["MODULE_FILES", "MODULE_NAME", "NAME"]);
    }
}
