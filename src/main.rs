//! cidflow - CI/CD workflow compiler
//!
//! Turns a catalog of reusable actions and workflow templates into an
//! ordered execution plan for one repository.
//!
//! ## Commands
//!
//! - `cidflow plan` - Compile the catalog into a plan
//! - `cidflow validate` - Check catalog files
//! - `cidflow eval` - Evaluate a rule expression
//! - `cidflow completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Plan the current repository
//! cidflow plan --catalog ci/catalog.yaml --modules modules.json
//!
//! # Human-readable listing for a tag build
//! cidflow plan -c ci/catalog.yaml --env NCI_COMMIT_REF_TYPE=tag --format text
//!
//! # Check a catalog, failing on rules that do not compile
//! cidflow validate -c ci/catalog.yaml --strict
//!
//! # Generate shell completions
//! cidflow completions bash > /etc/bash_completion.d/cidflow
//! ```
//!
//! Set `CIDFLOW_DEBUG` (or pass `--verbose`) for debug logging on stderr.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    if std::env::var("CIDFLOW_DEBUG").is_ok() {
        cidflow::infrastructure::init_logging("debug");
    }

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if std::env::var("CIDFLOW_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
