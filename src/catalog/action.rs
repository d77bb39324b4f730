//! Action types for the catalog
//!
//! An action is a reusable unit of CI work. The planner only reads its id,
//! scope, rules and artifact contract; the runner and access declarations
//! are passed through untouched for executors.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::CatalogError;
use super::types::{Validate, is_valid_action_id};
use crate::rules::Rule;

/// Whether an action runs once per repository or once per module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionScope {
    /// Once per repository
    #[default]
    Project,
    /// Once per detected module
    Module,
}

impl fmt::Display for ActionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// A typed, formatted piece of data exchanged between actions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact type, e.g. `report`
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Artifact format, e.g. `sarif`
    pub format: String,
}

impl Artifact {
    /// Creates an artifact key
    pub fn new(artifact_type: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            format: format.into(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.artifact_type, self.format)
    }
}

/// Artifacts an action consumes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionInput {
    /// Consumed artifacts
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Artifacts an action produces
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Produced artifacts
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Environment variable an action may read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEnv {
    /// Variable name, or a regex when `pattern` is set
    pub name: String,
    /// Human readable purpose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Treat `name` as a regular expression
    #[serde(default)]
    pub pattern: bool,
    /// Value must be masked
    #[serde(default)]
    pub secret: bool,
}

/// External executable an action invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessExecutable {
    /// Executable name
    pub name: String,
    /// Version constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

/// Network endpoint an action contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessNetwork {
    /// Host, optionally with port
    pub host: String,
}

/// Resources an action declares it needs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionAccess {
    /// Environment variables
    #[serde(default)]
    pub environment: Vec<AccessEnv>,
    /// Executables
    #[serde(default)]
    pub executables: Vec<AccessExecutable>,
    /// Network endpoints
    #[serde(default)]
    pub network: Vec<AccessNetwork>,
}

/// Kind of executor that runs an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Runs inside the host process
    Builtin,
    /// Runs in a container
    Container,
    /// Runs an external GitHub action
    GithubAction,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::Container => write!(f, "container"),
            Self::GithubAction => write!(f, "github-action"),
        }
    }
}

/// Executor metadata for an action, keyed by [`ActionType`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionRunner {
    /// Built-in implementation selected by action id
    #[default]
    Builtin,
    /// Container image with an optional command override
    Container {
        /// Image reference
        image: String,
        /// Command to run instead of the image entrypoint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    /// External action reference, e.g. `actions/checkout@v4`
    GithubAction {
        /// Action reference
        uses: String,
    },
}

impl ActionRunner {
    /// The executor kind
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Builtin => ActionType::Builtin,
            Self::Container { .. } => ActionType::Container,
            Self::GithubAction { .. } => ActionType::GithubAction,
        }
    }
}

/// A reusable unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Globally unique reference, e.g. `cid/go-build`
    pub id: String,
    /// Display name
    pub name: String,
    /// Category, e.g. `build` or `sast`
    #[serde(default)]
    pub category: String,
    /// Run once per project or once per module
    #[serde(default)]
    pub scope: ActionScope,
    /// Gating rules; empty means always
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Consumed artifacts
    #[serde(default)]
    pub input: ActionInput,
    /// Produced artifacts
    #[serde(default)]
    pub output: ActionOutput,
    /// Declared environment, executable and network needs
    #[serde(default)]
    pub access: ActionAccess,
    /// Executor metadata
    #[serde(default)]
    pub runner: ActionRunner,
}

impl Action {
    /// Creates a project-scoped builtin action
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            scope: ActionScope::Project,
            rules: Vec::new(),
            input: ActionInput::default(),
            output: ActionOutput::default(),
            access: ActionAccess::default(),
            runner: ActionRunner::Builtin,
        }
    }

    /// Sets the scope
    pub fn with_scope(mut self, scope: ActionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Adds a gating rule
    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Declares a consumed artifact
    pub fn with_input(mut self, artifact_type: &str, format: &str) -> Self {
        self.input.artifacts.push(Artifact::new(artifact_type, format));
        self
    }

    /// Declares a produced artifact
    pub fn with_output(mut self, artifact_type: &str, format: &str) -> Self {
        self.output.artifacts.push(Artifact::new(artifact_type, format));
        self
    }

    /// Sets the runner
    pub fn with_runner(mut self, runner: ActionRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the declared access
    pub fn with_access(mut self, access: ActionAccess) -> Self {
        self.access = access;
        self
    }
}

impl Validate for Action {
    type Error = CatalogError;

    fn validate(&self) -> Result<(), Self::Error> {
        if !is_valid_action_id(&self.id) {
            return Err(CatalogError::InvalidId {
                id: self.id.clone(),
            });
        }

        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName { kind: "action" });
        }

        let invalid_runner = |reason: &str| CatalogError::InvalidRunner {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        match &self.runner {
            ActionRunner::Builtin => {}
            ActionRunner::Container { image, .. } if image.trim().is_empty() => {
                return Err(invalid_runner("container image cannot be empty"));
            }
            ActionRunner::GithubAction { uses } if uses.trim().is_empty() => {
                return Err(invalid_runner("github action reference cannot be empty"));
            }
            ActionRunner::Container { .. } | ActionRunner::GithubAction { .. } => {}
        }

        Ok(())
    }
}
