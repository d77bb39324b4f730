//! `cidflow validate` - Check catalog files without planning
//!
//! Loads and merges the catalogs, runs catalog validation and reports rules
//! that do not compile. With `--strict`, such rules fail the command.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

use cidflow::catalog::{Catalog, RuleDiagnostic, loader};

/// Outcome of validating a set of catalog files
#[derive(Debug)]
pub struct ValidationReport {
    /// The merged, validated catalog
    pub catalog: Catalog,
    /// Rules that never match because they do not compile
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl ValidationReport {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            let _ = writeln!(
                out,
                "warning: {}: `{}`: {}",
                diagnostic.location, diagnostic.rule.expression, diagnostic.error
            );
        }
        let _ = write!(
            out,
            "catalog ok: {} actions, {} workflows, {} rule warnings",
            self.catalog.actions().len(),
            self.catalog.workflows().len(),
            self.diagnostics.len()
        );
        out
    }
}

/// Validates the given catalog files
pub fn validate_catalogs(catalogs: &[PathBuf], strict: bool) -> Result<ValidationReport> {
    if catalogs.is_empty() {
        anyhow::bail!("No catalog files given; pass --catalog or set `catalogs` in .cidflow.yaml");
    }
    let catalog = loader::load_files(catalogs).context("Catalog validation failed")?;
    let diagnostics = catalog.rule_diagnostics();

    if strict && !diagnostics.is_empty() {
        anyhow::bail!(
            "{} rule(s) do not compile, first at {}",
            diagnostics.len(),
            diagnostics[0].location
        );
    }

    Ok(ValidationReport {
        catalog,
        diagnostics,
    })
}
