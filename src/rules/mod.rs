//! Rule evaluation
//!
//! Rules are small boolean expressions that gate whether a workflow, stage
//! or action applies to the repository being planned. A rule that fails to
//! compile or run is logged and treated as not matching; evaluation never
//! aborts planning.
//!
//! ## Example
//!
//! ```rust
//! use cidflow::rules::{Rule, RuleContext, any_match};
//!
//! let mut ctx = RuleContext::new();
//! ctx.insert("MODULE_BUILD_SYSTEM", "cargo");
//!
//! let rules = vec![Rule::new(r#"MODULE_BUILD_SYSTEM == "cargo""#)];
//! assert!(any_match(&rules, &ctx));
//! assert!(any_match(&Vec::<Rule>::new(), &ctx));
//! ```

pub mod context;
pub mod errors;
pub mod eval;
pub mod parser;
pub mod value;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use context::{ContextBuilder, RuleContext, normalize_files, vars};
pub use errors::RuleError;
pub use eval::Program;
pub use value::Value;

/// A gating rule attached to a workflow, stage or action
///
/// Deserializes from either a bare expression string or a mapping with an
/// `expression` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RuleRepr")]
pub struct Rule {
    /// Expression source
    pub expression: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleRepr {
    Bare(String),
    Detailed { expression: String },
}

impl From<RuleRepr> for Rule {
    fn from(repr: RuleRepr) -> Self {
        match repr {
            RuleRepr::Bare(expression) | RuleRepr::Detailed { expression } => Self { expression },
        }
    }
}

impl From<&str> for Rule {
    fn from(expression: &str) -> Self {
        Self::new(expression)
    }
}

impl From<String> for Rule {
    fn from(expression: String) -> Self {
        Self { expression }
    }
}

impl Rule {
    /// Creates a rule from an expression
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    /// Compiles the expression without running it
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Syntax`] for malformed expressions.
    pub fn compile(&self) -> Result<Program, RuleError> {
        Program::compile(&self.expression)
    }

    /// Evaluates the rule, failing closed
    #[must_use]
    pub fn matches(&self, ctx: &RuleContext) -> bool {
        evaluate(&self.expression, ctx)
    }

    /// Returns true if the expression reads any `MODULE_*` variable
    #[must_use]
    pub fn uses_module_variables(&self) -> bool {
        self.compile()
            .is_ok_and(|program| program.uses_module_variables())
    }
}

/// Rules compiled once and evaluated against many contexts
///
/// A rule that does not compile is logged once and never matches, but still
/// counts towards the set's length: a set of broken rules is not empty.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    programs: Vec<Option<Program>>,
}

impl RuleSet {
    /// Compiles every rule
    pub fn compile<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> Self {
        let programs = rules
            .into_iter()
            .map(|rule| match rule.compile() {
                Ok(program) => Some(program),
                Err(error) => {
                    warn!(expression = %rule.expression, %error, "rule does not compile, treating as no match");
                    None
                }
            })
            .collect();
        Self { programs }
    }

    /// Number of rules, broken ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns true if the set has no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// True if the set is empty or at least one rule matches
    #[must_use]
    pub fn any_match(&self, ctx: &RuleContext) -> bool {
        self.is_empty() || self.compiled().any(|program| run_fail_closed(program, ctx))
    }

    /// Number of rules that match
    #[must_use]
    pub fn count_matches(&self, ctx: &RuleContext) -> usize {
        self.compiled()
            .filter(|program| run_fail_closed(program, ctx))
            .count()
    }

    /// Returns true if any rule reads a `MODULE_*` variable
    #[must_use]
    pub fn uses_module_variables(&self) -> bool {
        self.compiled().any(Program::uses_module_variables)
    }

    /// Project-level match where module variables may appear
    ///
    /// Rules reading `MODULE_*` variables are run against each module context
    /// and the rest against `project` alone, so neither kind is evaluated
    /// where its variables are missing.
    #[must_use]
    pub fn any_match_across(&self, project: &RuleContext, modules: &[RuleContext]) -> bool {
        if self.is_empty() {
            return true;
        }
        let (module_rules, project_rules): (Vec<&Program>, Vec<&Program>) =
            self.compiled().partition(|program| program.uses_module_variables());

        project_rules
            .iter()
            .any(|program| run_fail_closed(program, project))
            || modules.iter().any(|ctx| {
                module_rules
                    .iter()
                    .any(|program| run_fail_closed(program, ctx))
            })
    }

    fn compiled(&self) -> impl Iterator<Item = &Program> {
        self.programs.iter().flatten()
    }
}

fn run_fail_closed(program: &Program, ctx: &RuleContext) -> bool {
    match program.matches(ctx) {
        Ok(matched) => matched,
        Err(error) => {
            warn!(expression = program.source(), %error, "rule evaluation failed, treating as no match");
            false
        }
    }
}

/// Evaluates an expression against a context
///
/// Compilation errors, unknown names, type mismatches and non-boolean results
/// all yield `false`.
#[must_use]
pub fn evaluate(expression: &str, ctx: &RuleContext) -> bool {
    match Program::compile(expression) {
        Ok(program) => run_fail_closed(&program, ctx),
        Err(error) => {
            warn!(%expression, %error, "rule does not compile, treating as no match");
            false
        }
    }
}

/// True if the rule set is empty or at least one rule matches
pub fn any_match<'a>(rules: impl IntoIterator<Item = &'a Rule>, ctx: &RuleContext) -> bool {
    let mut rules = rules.into_iter().peekable();
    if rules.peek().is_none() {
        return true;
    }
    rules.any(|rule| rule.matches(ctx))
}

/// Number of rules in the set that match
pub fn count_matches<'a>(rules: impl IntoIterator<Item = &'a Rule>, ctx: &RuleContext) -> usize {
    rules.into_iter().filter(|rule| rule.matches(ctx)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RuleContext {
        let mut ctx = RuleContext::new();
        ctx.insert("BRANCH", "main");
        ctx
    }

    #[test]
    fn test_empty_rules_always_match() {
        let rules: Vec<Rule> = Vec::new();
        assert!(any_match(&rules, &ctx()));
        assert!(any_match(&rules, &RuleContext::new()));
        assert_eq!(count_matches(&rules, &ctx()), 0);
    }

    #[test]
    fn test_any_match_is_logical_or() {
        let rules = vec![Rule::new(r#"BRANCH == "dev""#), Rule::new(r#"BRANCH == "main""#)];
        assert!(any_match(&rules, &ctx()));

        let rules = vec![Rule::new(r#"BRANCH == "dev""#)];
        assert!(!any_match(&rules, &ctx()));
    }

    #[test]
    fn test_count_matches() {
        let rules = vec![
            Rule::new(r#"BRANCH == "main""#),
            Rule::new(r#"hasPrefix(BRANCH, "ma")"#),
            Rule::new(r#"BRANCH == "dev""#),
        ];
        assert_eq!(count_matches(&rules, &ctx()), 2);
    }

    #[test]
    fn test_broken_rules_fail_closed() {
        assert!(!evaluate("BRANCH ==", &ctx()));
        assert!(!evaluate("BRANCH == 1", &ctx()));
        assert!(!evaluate("UNKNOWN == \"x\"", &ctx()));
        assert!(!evaluate("BRANCH", &ctx()));

        let rules = vec![Rule::new("((("), Rule::new(r#"BRANCH == "main""#)];
        assert!(any_match(&rules, &ctx()));
        assert_eq!(count_matches(&rules, &ctx()), 1);
    }

    #[test]
    fn test_deeply_nested_rules_fail_closed() {
        let nested = format!("{}true{}", "(".repeat(2_000), ")".repeat(2_000));
        assert!(!evaluate(&nested, &ctx()));
        assert!(!evaluate(&format!("{}true", "!".repeat(50_000)), &ctx()));

        let rules = vec![Rule::new(nested), Rule::new(r#"BRANCH == "main""#)];
        assert!(any_match(&rules, &ctx()));
        assert_eq!(RuleSet::compile(&rules).count_matches(&ctx()), 1);
    }

    #[test]
    fn test_rule_set_matches_like_rules() {
        let rules = vec![
            Rule::new(r#"BRANCH == "dev""#),
            Rule::new("BRANCH =="),
            Rule::new(r#"hasPrefix(BRANCH, "ma")"#),
        ];
        let set = RuleSet::compile(&rules);
        assert_eq!(set.len(), 3);
        assert_eq!(set.any_match(&ctx()), any_match(&rules, &ctx()));
        assert_eq!(set.count_matches(&ctx()), count_matches(&rules, &ctx()));

        assert!(RuleSet::compile(&Vec::<Rule>::new()).any_match(&ctx()));
        let broken = RuleSet::compile(&[Rule::new("(((")]);
        assert!(!broken.is_empty());
        assert!(!broken.any_match(&ctx()));
    }

    #[test]
    fn test_any_match_across_modules() {
        let module = |system: &str| {
            let mut ctx = ctx();
            ctx.insert(vars::MODULE_BUILD_SYSTEM, system);
            ctx
        };
        let modules = vec![module("cargo"), module("gomod")];

        let gomod = RuleSet::compile(&[Rule::new(r#"MODULE_BUILD_SYSTEM == "gomod""#)]);
        assert!(gomod.uses_module_variables());
        assert!(gomod.any_match_across(&ctx(), &modules));
        assert!(!gomod.any_match_across(&ctx(), &modules[..1]));

        let mixed = RuleSet::compile(&[
            Rule::new(r#"BRANCH == "main""#),
            Rule::new(r#"MODULE_BUILD_SYSTEM == "npm""#),
        ]);
        assert!(mixed.any_match_across(&ctx(), &[]));
        assert!(RuleSet::default().any_match_across(&ctx(), &[]));
    }

    #[test]
    fn test_rule_deserialize_forms() {
        let rules: Vec<Rule> =
            serde_yaml::from_str("- BRANCH == \"main\"\n- expression: BRANCH != \"x\"\n").unwrap();
        assert_eq!(rules[0].expression, r#"BRANCH == "main""#);
        assert_eq!(rules[1].expression, r#"BRANCH != "x""#);
    }

    #[test]
    fn test_uses_module_variables() {
        assert!(Rule::new(r#"MODULE_BUILD_SYSTEM == "gomod""#).uses_module_variables());
        assert!(!Rule::new(r#"BRANCH == "main""#).uses_module_variables());
        assert!(!Rule::new("MODULE_NAME ==").uses_module_variables());
    }
}
