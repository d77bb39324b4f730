//! # Cidflow - A CI/CD workflow compiler
//!
//! Cidflow takes a declarative catalog of reusable build, test, scan and
//! deploy actions plus named workflows, and computes for one concrete
//! repository which actions apply, in what order, and which steps must wait
//! for which. The result is a [`Plan`]: a topologically ordered list of
//! steps grouped by stage, ready for an external executor.
//!
//! ## Quick Start
//!
//! ```rust
//! use cidflow::prelude::*;
//! use std::collections::BTreeMap;
//! use std::path::Path;
//!
//! let catalog = Catalog::builder()
//!     .action(Action::new("cid/go-build", "go-build").with_output("binary", "go"))
//!     .action(Action::new("cid/go-test", "go-test").with_input("binary", "go"))
//!     .workflow(
//!         Workflow::new("main").with_stage(
//!             WorkflowStage::new("build")
//!                 .with_action(WorkflowAction::new("cid/go-build"))
//!                 .with_action(WorkflowAction::new("cid/go-test")),
//!         ),
//!     )
//!     .build()?;
//!
//! let modules = vec![ProjectModule::new("api", "api", "gomod")];
//! let plan = generate_plan(&modules, &catalog, Path::new("."), &BTreeMap::new())?;
//!
//! assert_eq!(plan.stages, vec!["build".to_string()]);
//! assert!(plan.steps[1].depends_on(&plan.steps[0].id));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`rules`]: the boolean expression language gating workflows, stages and
//!   actions
//! - [`catalog`]: actions, workflows, detected modules and catalog loading
//! - [`planner`]: plan generation and dependency ordering
//! - [`infrastructure`]: configuration and logging

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod catalog;
pub mod infrastructure;
pub mod planner;
pub mod rules;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use catalog::{
    Action, ActionRunner, ActionScope, ActionType, Artifact, Catalog, CatalogBuilder,
    CatalogError, ProjectModule, Workflow, WorkflowAction, WorkflowStage,
};
pub use infrastructure::Config;
pub use planner::{Dependency, Plan, PlanError, Step, generate_plan, sort_steps};
pub use rules::{Rule, RuleContext, RuleError, RuleSet, Value};

/// Version of the cidflow crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
