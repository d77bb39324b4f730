//! Workflow definitions
//!
//! A workflow is an ordered list of rule-gated stages, each an ordered list
//! of references into the action catalog.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::errors::CatalogError;
use super::types::Validate;
use crate::rules::Rule;

/// A named pipeline template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    pub name: String,
    /// Workflow-level gate
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<WorkflowStage>,
}

/// A rule-gated group of actions inside a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStage {
    /// Stage name
    pub name: String,
    /// Stage-level gate
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Action references in order
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
}

/// A reference to a catalog action inside a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowAction {
    /// Catalog action id
    pub id: String,
    /// Extra rules, combined with the action's own rules
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Opaque configuration handed to the executor
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

impl Workflow {
    /// Creates an empty workflow
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Adds a workflow rule
    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Adds a stage
    pub fn with_stage(mut self, stage: WorkflowStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Iterates every action reference with its stage name
    pub fn actions(&self) -> impl Iterator<Item = (&str, &WorkflowAction)> {
        self.stages.iter().flat_map(|stage| {
            stage
                .actions
                .iter()
                .map(move |action| (stage.name.as_str(), action))
        })
    }
}

impl WorkflowStage {
    /// Creates an empty stage
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Adds a stage rule
    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Adds an action reference
    pub fn with_action(mut self, action: WorkflowAction) -> Self {
        self.actions.push(action);
        self
    }
}

impl WorkflowAction {
    /// References a catalog action
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
            config: serde_json::Value::Null,
        }
    }

    /// Adds an extra rule
    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Sets the executor configuration
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

impl From<&str> for WorkflowAction {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Validate for Workflow {
    type Error = CatalogError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName { kind: "workflow" });
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
            if !seen.insert(stage.name.as_str()) {
                return Err(CatalogError::DuplicateStage {
                    workflow: self.name.clone(),
                    stage: stage.name.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for WorkflowStage {
    type Error = CatalogError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName { kind: "stage" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_actions_iterates_in_order() {
        let workflow = Workflow::new("main")
            .with_stage(
                WorkflowStage::new("build")
                    .with_action("a".into())
                    .with_action("b".into()),
            )
            .with_stage(WorkflowStage::new("test").with_action("c".into()));

        let refs: Vec<(&str, &str)> = workflow
            .actions()
            .map(|(stage, action)| (stage, action.id.as_str()))
            .collect();
        assert_eq!(refs, vec![("build", "a"), ("build", "b"), ("test", "c")]);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let workflow = Workflow::new("main")
            .with_stage(WorkflowStage::new("build"))
            .with_stage(WorkflowStage::new("build"));
        assert_eq!(
            workflow.validate(),
            Err(CatalogError::DuplicateStage {
                workflow: "main".to_string(),
                stage: "build".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(Workflow::new("").validate().is_err());
        let workflow = Workflow::new("main").with_stage(WorkflowStage::new(" "));
        assert_eq!(
            workflow.validate(),
            Err(CatalogError::EmptyName { kind: "stage" })
        );
    }

    #[test]
    fn test_workflow_action_config_passthrough() {
        let yaml = r#"
name: main
stages:
  - name: build
    actions:
      - id: cid/go-build
        config:
          flags: ["-race"]
"#;
        let workflow: Workflow = serde_yaml::from_str(yaml).unwrap();
        let action = &workflow.stages[0].actions[0];
        assert_eq!(action.config["flags"][0], "-race");
        assert!(action.rules.is_empty());
    }
}
