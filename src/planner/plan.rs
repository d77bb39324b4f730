//! Plan output types
//!
//! These are what executors consume and what state persistence serializes,
//! so field names are stable JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::ActionScope;

/// A predecessor of a step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Predecessor step id
    pub id: String,
    /// Catalog action id of the predecessor
    pub action: String,
}

/// One concrete, schedulable invocation of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Emission index within one planning run
    pub id: String,
    /// Display name
    pub name: String,
    /// Stage the step belongs to
    pub stage: String,
    /// Project or module scope
    pub scope: ActionScope,
    /// Catalog action id
    pub action: String,
    /// Module id; present exactly when `scope` is `Module`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Steps that must finish first
    #[serde(default)]
    pub run_after: Vec<Dependency>,
    /// Position in the sorted plan
    #[serde(default)]
    pub order: usize,
    /// Executor configuration from the workflow
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

impl Step {
    /// Returns true if `step_id` is a direct predecessor
    #[must_use]
    pub fn depends_on(&self, step_id: &str) -> bool {
        self.run_after.iter().any(|dep| dep.id == step_id)
    }

    /// Returns true if any direct predecessor runs `action_id`
    #[must_use]
    pub fn depends_on_action(&self, action_id: &str) -> bool {
        self.run_after.iter().any(|dep| dep.action == action_id)
    }
}

/// The compiled, topologically ordered plan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Name of the selected workflow
    pub name: String,
    /// Distinct stage names in first-seen order
    pub stages: Vec<String>,
    /// Steps sorted by `order`
    pub steps: Vec<Step>,
}

impl Plan {
    /// Steps of one stage, in execution order
    pub fn steps_in_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Step> + 'a {
        self.steps.iter().filter(move |step| step.stage == stage)
    }

    /// Looks up a step by id
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Steps running a given catalog action
    pub fn steps_for_action<'a>(&'a self, action: &'a str) -> impl Iterator<Item = &'a Step> + 'a {
        self.steps.iter().filter(move |step| step.action == action)
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step applies
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "workflow: {}", self.name)?;
        for stage in &self.stages {
            writeln!(f, "stage: {stage}")?;
            for step in self.steps_in_stage(stage) {
                write!(f, "  [{}] {} ({}", step.order, step.name, step.action)?;
                if let Some(module) = &step.module {
                    write!(f, ", module {module}")?;
                }
                write!(f, ")")?;
                if !step.run_after.is_empty() {
                    let ids: Vec<&str> = step.run_after.iter().map(|d| d.id.as_str()).collect();
                    write!(f, " after {}", ids.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
