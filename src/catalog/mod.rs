//! Catalog domain types
//!
//! The catalog holds every reusable action and every workflow template. It
//! is built once, validated, and then passed by reference to the planner.

pub mod action;
pub mod builder;
pub mod errors;
pub mod loader;
pub mod module;
pub mod types;
pub mod workflow;

pub use action::{
    AccessEnv, AccessExecutable, AccessNetwork, Action, ActionAccess, ActionInput, ActionOutput,
    ActionRunner, ActionScope, ActionType, Artifact,
};
pub use builder::{Catalog, CatalogBuilder, CatalogConfig, RuleDiagnostic};
pub use errors::CatalogError;
pub use module::ProjectModule;
pub use types::{Validate, slugify};
pub use workflow::{Workflow, WorkflowAction, WorkflowStage};
