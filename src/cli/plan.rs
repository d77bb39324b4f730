//! `cidflow plan` - Compile a catalog into an execution plan
//!
//! ## Usage
//!
//! ```bash
//! cidflow plan --catalog ci/actions.yaml --modules modules.json -d .
//! cidflow plan -c base.yaml -c overrides.json --env NCI_COMMIT_REF_TYPE=tag --format text
//! ```
//!
//! Catalog and module paths fall back to `.cidflow.yaml` in the project
//! directory when not given on the command line.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cidflow::catalog::loader;
use cidflow::infrastructure::{Config, OutputFormat};
use cidflow::planner::{Plan, generate_plan};

/// Inputs of one planning run
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Catalog files, merged in order
    pub catalogs: Vec<PathBuf>,
    /// Module list file
    pub modules: Option<PathBuf>,
    /// Repository root
    pub project_dir: PathBuf,
    /// Extra environment entries, applied last
    pub env: Vec<(String, String)>,
    /// Whether the process environment is visible to rules
    pub process_env: bool,
}

/// Loads the inputs and generates the plan
pub fn plan(options: &PlanOptions, config: &Config) -> Result<Plan> {
    let catalogs = if options.catalogs.is_empty() {
        &config.catalogs
    } else {
        &options.catalogs
    };
    if catalogs.is_empty() {
        anyhow::bail!("No catalog files given; pass --catalog or set `catalogs` in .cidflow.yaml");
    }

    let catalog = loader::load_files(catalogs).context("Failed to load catalog")?;

    let modules = match options.modules.as_ref().or(config.modules.as_ref()) {
        Some(path) => loader::load_modules(path)
            .with_context(|| format!("Failed to load modules from: {}", path.display()))?,
        None => Vec::new(),
    };
    tracing::debug!(modules = modules.len(), "modules loaded");

    let env = collect_env(options.process_env, &options.env);
    let plan = generate_plan(&modules, &catalog, &options.project_dir, &env)
        .context("Failed to generate plan")?;
    Ok(plan)
}

/// Builds the rule environment from the process environment and overrides
pub fn collect_env(process_env: bool, overrides: &[(String, String)]) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = if process_env {
        std::env::vars().collect()
    } else {
        BTreeMap::new()
    };
    env.extend(overrides.iter().cloned());
    env
}

/// Renders a plan
pub fn render(plan: &Plan, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(plan).context("Failed to serialize plan"),
        OutputFormat::Text => Ok(plan.to_string()),
    }
}

/// Writes rendered output to a file, or stdout
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write plan to: {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
