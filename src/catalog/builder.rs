//! Catalog construction
//!
//! A [`Catalog`] is only obtainable through [`CatalogBuilder::build`] (or
//! [`Catalog::from_config`]), which validates every entry and resolves all
//! workflow references up front. The planner can therefore rely on every
//! referenced action existing.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::action::{Action, ActionRunner, ActionType};
use super::errors::CatalogError;
use super::types::Validate;
use super::workflow::Workflow;
use crate::rules::{Rule, RuleError};

/// Serialized shape of a catalog, as read from catalog files
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Action definitions
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Workflows in selection order
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

/// A rule in the catalog that does not compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    /// Where the rule lives, e.g. `workflow 'main' stage 'build'`
    pub location: String,
    /// The broken rule
    pub rule: Rule,
    /// Compiler diagnostic
    pub error: RuleError,
}

/// Validated, immutable set of actions and workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    actions: Vec<Action>,
    workflows: Vec<Workflow>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Starts an empty builder
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Validates a deserialized catalog
    ///
    /// # Errors
    ///
    /// See [`CatalogBuilder::build`].
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        CatalogBuilder { config }.build()
    }

    /// Looks up an action by id
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&Action> {
        self.index.get(id).map(|&i| &self.actions[i])
    }

    /// Executor metadata for an action id
    #[must_use]
    pub fn runner(&self, id: &str) -> Option<&ActionRunner> {
        self.action(id).map(|action| &action.runner)
    }

    /// All actions in catalog order
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Actions run by a given executor kind
    pub fn actions_of_type(&self, action_type: ActionType) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(move |action| action.runner.action_type() == action_type)
    }

    /// All workflows in selection order
    #[must_use]
    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// Looks up a workflow by name
    #[must_use]
    pub fn workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|workflow| workflow.name == name)
    }

    /// Every rule in the catalog that fails to compile
    ///
    /// Such rules never match at planning time; this surfaces them early.
    #[must_use]
    pub fn rule_diagnostics(&self) -> Vec<RuleDiagnostic> {
        let mut diagnostics = Vec::new();
        let mut check = |location: String, rules: &[Rule]| {
            for rule in rules {
                if let Err(error) = rule.compile() {
                    diagnostics.push(RuleDiagnostic {
                        location: location.clone(),
                        rule: rule.clone(),
                        error,
                    });
                }
            }
        };

        for action in &self.actions {
            check(format!("action '{}'", action.id), &action.rules);
        }
        for workflow in &self.workflows {
            check(format!("workflow '{}'", workflow.name), &workflow.rules);
            for stage in &workflow.stages {
                check(
                    format!("workflow '{}' stage '{}'", workflow.name, stage.name),
                    &stage.rules,
                );
                for reference in &stage.actions {
                    check(
                        format!(
                            "workflow '{}' stage '{}' action '{}'",
                            workflow.name, stage.name, reference.id
                        ),
                        &reference.rules,
                    );
                }
            }
        }
        diagnostics
    }

    /// Converts back to the serialized shape
    #[must_use]
    pub fn to_config(&self) -> CatalogConfig {
        CatalogConfig {
            actions: self.actions.clone(),
            workflows: self.workflows.clone(),
        }
    }
}

/// Builder that accumulates and merges catalog entries
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    config: CatalogConfig,
}

impl CatalogBuilder {
    /// Creates an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action
    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.config.actions.push(action);
        self
    }

    /// Appends a workflow; workflows are selected in insertion order
    #[must_use]
    pub fn workflow(mut self, workflow: Workflow) -> Self {
        self.config.workflows.push(workflow);
        self
    }

    /// Merges another catalog source
    ///
    /// Actions replace existing ones with the same id and workflows replace
    /// existing ones with the same name, keeping their position; anything new
    /// is appended.
    #[must_use]
    pub fn merge(mut self, other: CatalogConfig) -> Self {
        for action in other.actions {
            match self.config.actions.iter_mut().find(|a| a.id == action.id) {
                Some(existing) => {
                    debug!(id = %action.id, "overriding catalog action");
                    *existing = action;
                }
                None => self.config.actions.push(action),
            }
        }
        for workflow in other.workflows {
            match self
                .config
                .workflows
                .iter_mut()
                .find(|w| w.name == workflow.name)
            {
                Some(existing) => {
                    debug!(name = %workflow.name, "overriding catalog workflow");
                    *existing = workflow;
                }
                None => self.config.workflows.push(workflow),
            }
        }
        self
    }

    /// Validates entries and freezes the catalog
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found: invalid ids or names,
    /// duplicate actions, workflows or stages, incomplete runners, or a
    /// workflow referencing an unknown action.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let CatalogConfig { actions, workflows } = self.config;

        let mut index = HashMap::with_capacity(actions.len());
        for (position, action) in actions.iter().enumerate() {
            action.validate()?;
            if index.insert(action.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateAction {
                    id: action.id.clone(),
                });
            }
        }

        {
            let mut names = HashSet::new();
            for workflow in &workflows {
                workflow.validate()?;
                if !names.insert(workflow.name.as_str()) {
                    return Err(CatalogError::DuplicateWorkflow {
                        name: workflow.name.clone(),
                    });
                }
                for (stage, reference) in workflow.actions() {
                    if !index.contains_key(&reference.id) {
                        return Err(CatalogError::UnknownAction {
                            workflow: workflow.name.clone(),
                            stage: stage.to_string(),
                            action: reference.id.clone(),
                        });
                    }
                }
            }
        }

        let catalog = Catalog {
            actions,
            workflows,
            index,
        };

        for diagnostic in catalog.rule_diagnostics() {
            warn!(
                location = %diagnostic.location,
                error = %diagnostic.error,
                "catalog rule does not compile and will never match"
            );
        }
        debug!(
            actions = catalog.actions.len(),
            workflows = catalog.workflows.len(),
            "catalog built"
        );

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{WorkflowAction, WorkflowStage};
    use pretty_assertions::assert_eq;

    fn workflow(name: &str, action: &str) -> Workflow {
        Workflow::new(name)
            .with_stage(WorkflowStage::new("build").with_action(WorkflowAction::new(action)))
    }

    #[test]
    fn test_build_and_lookup() {
        let catalog = Catalog::builder()
            .action(Action::new("cid/a", "A"))
            .action(Action::new("cid/b", "B").with_runner(ActionRunner::Container {
                image: "alpine".to_string(),
                command: None,
            }))
            .workflow(workflow("main", "cid/a"))
            .build()
            .unwrap();

        assert_eq!(catalog.action("cid/b").map(|a| a.name.as_str()), Some("B"));
        assert!(catalog.action("cid/zzz").is_none());
        assert_eq!(
            catalog.runner("cid/a").map(ActionRunner::action_type),
            Some(ActionType::Builtin)
        );
        assert_eq!(catalog.actions_of_type(ActionType::Container).count(), 1);
        assert!(catalog.workflow("main").is_some());
    }

    #[test]
    fn test_duplicate_action_rejected() {
        let result = Catalog::builder()
            .action(Action::new("cid/a", "A"))
            .action(Action::new("cid/a", "A again"))
            .build();
        assert_eq!(
            result,
            Err(CatalogError::DuplicateAction {
                id: "cid/a".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_workflow_rejected() {
        let result = Catalog::builder()
            .action(Action::new("cid/a", "A"))
            .workflow(workflow("main", "cid/a"))
            .workflow(workflow("main", "cid/a"))
            .build();
        assert!(matches!(result, Err(CatalogError::DuplicateWorkflow { .. })));
    }

    #[test]
    fn test_unknown_action_reference_rejected() {
        let result = Catalog::builder()
            .action(Action::new("cid/a", "A"))
            .workflow(workflow("main", "cid/missing"))
            .build();
        assert_eq!(
            result,
            Err(CatalogError::UnknownAction {
                workflow: "main".to_string(),
                stage: "build".to_string(),
                action: "cid/missing".to_string(),
            })
        );
    }

    #[test]
    fn test_merge_overrides_in_place() {
        let base = CatalogConfig {
            actions: vec![Action::new("cid/a", "A"), Action::new("cid/b", "B")],
            workflows: vec![workflow("main", "cid/a"), workflow("release", "cid/b")],
        };
        let overlay = CatalogConfig {
            actions: vec![Action::new("cid/a", "A v2"), Action::new("cid/c", "C")],
            workflows: vec![workflow("main", "cid/c")],
        };

        let catalog = Catalog::builder().merge(base).merge(overlay).build().unwrap();

        let ids: Vec<&str> = catalog.actions().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["cid/a", "cid/b", "cid/c"]);
        assert_eq!(catalog.action("cid/a").unwrap().name, "A v2");

        let names: Vec<&str> = catalog.workflows().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["main", "release"]);
        assert_eq!(
            catalog.workflow("main").unwrap().stages[0].actions[0].id,
            "cid/c"
        );
    }

    #[test]
    fn test_broken_rules_are_diagnosed_not_rejected() {
        let catalog = Catalog::builder()
            .action(Action::new("cid/a", "A").with_rule("MODULE_NAME =="))
            .workflow(workflow("main", "cid/a").with_rule("true"))
            .build()
            .unwrap();

        let diagnostics = catalog.rule_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].location, "action 'cid/a'");
    }
}
