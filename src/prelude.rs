//! Prelude module for common imports

// Catalog types
pub use crate::catalog::{
    AccessEnv, AccessExecutable, AccessNetwork, Action, ActionAccess, ActionRunner, ActionScope,
    ActionType, Artifact, Catalog, CatalogBuilder, CatalogConfig, CatalogError, ProjectModule,
    Validate, Workflow, WorkflowAction, WorkflowStage,
};

// Rule evaluation
pub use crate::rules::{ContextBuilder, Rule, RuleContext, RuleError, RuleSet, Value, any_match};

// Planning
pub use crate::planner::{Dependency, Plan, PlanError, Step, generate_plan, sort_steps};
