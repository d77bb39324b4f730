//! `cidflow eval` - Evaluate a rule expression
//!
//! Useful when writing catalog rules: the expression runs against the same
//! project context the planner builds, plus any `--var` overrides.
//!
//! ```bash
//! cidflow eval 'NCI_COMMIT_REF_TYPE == "tag"' --var NCI_COMMIT_REF_TYPE=tag
//! cidflow eval 'MODULE_BUILD_SYSTEM' --module api --modules modules.json
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use cidflow::catalog::loader;
use cidflow::rules::{ContextBuilder, Program, RuleContext, Value};

/// Evaluates `expression` and returns its value
///
/// When `module` is set, the context is that module's context taken from
/// `modules_file`. Every `vars` entry is set as a string variable, replacing
/// any existing one.
pub fn eval_expression(
    expression: &str,
    project_dir: &Path,
    env: &BTreeMap<String, String>,
    module: Option<(&str, &Path)>,
    vars: &[(String, String)],
) -> Result<Value> {
    let program = Program::compile(expression)?;
    let contexts = ContextBuilder::new(project_dir, env);

    let mut ctx: RuleContext = match module {
        Some((id, modules_file)) => {
            let modules = loader::load_modules(modules_file).with_context(|| {
                format!("Failed to load modules from: {}", modules_file.display())
            })?;
            let module = modules
                .iter()
                .find(|m| m.id == id)
                .with_context(|| format!("Module not found: {id}"))?;
            contexts.module_context(module)
        }
        None => contexts.project_context(),
    };
    for (name, value) in vars {
        ctx.insert(name.as_str(), value.as_str());
    }

    tracing::debug!(%expression, variables = ctx.len(), "evaluating expression");
    Ok(program.run(&ctx)?)
}
