//! Rule contexts for project- and module-level evaluation
//!
//! The project context carries repository and commit metadata read from the
//! environment plus the raw environment itself under [`vars::ENV`]. Module
//! contexts extend it with the detected module's metadata.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::value::Value;
use crate::catalog::ProjectModule;

/// Variable names available to rule expressions
pub mod vars {
    /// The full environment, as a map
    pub const ENV: &str = "ENV";
    /// Project root directory
    pub const PROJECT_DIR: &str = "PROJECT_DIR";

    /// Repository kind, e.g. `git`
    pub const NCI_REPOSITORY_KIND: &str = "NCI_REPOSITORY_KIND";
    /// Repository remote URL
    pub const NCI_REPOSITORY_REMOTE: &str = "NCI_REPOSITORY_REMOTE";
    /// Hosting platform type, e.g. `github`
    pub const NCI_REPOSITORY_HOST_TYPE: &str = "NCI_REPOSITORY_HOST_TYPE";
    /// Hosting server, e.g. `github.com`
    pub const NCI_REPOSITORY_HOST_SERVER: &str = "NCI_REPOSITORY_HOST_SERVER";
    /// Ref type, `branch` or `tag`
    pub const NCI_COMMIT_REF_TYPE: &str = "NCI_COMMIT_REF_TYPE";
    /// Ref name
    pub const NCI_COMMIT_REF_NAME: &str = "NCI_COMMIT_REF_NAME";
    /// Ref name, slugified
    pub const NCI_COMMIT_REF_SLUG: &str = "NCI_COMMIT_REF_SLUG";
    /// Commit hash
    pub const NCI_COMMIT_HASH: &str = "NCI_COMMIT_HASH";
    /// What triggered the pipeline, e.g. `push` or `pull_request`
    pub const NCI_PIPELINE_TRIGGER: &str = "NCI_PIPELINE_TRIGGER";

    /// Prefix shared by all module-scoped variables
    pub const MODULE_PREFIX: &str = "MODULE_";
    /// Module identifier
    pub const MODULE_ID: &str = "MODULE_ID";
    /// Module name
    pub const MODULE_NAME: &str = "MODULE_NAME";
    /// Module slug
    pub const MODULE_SLUG: &str = "MODULE_SLUG";
    /// Build system, e.g. `gomod`
    pub const MODULE_BUILD_SYSTEM: &str = "MODULE_BUILD_SYSTEM";
    /// Build system syntax, e.g. `kotlin` for gradle
    pub const MODULE_BUILD_SYSTEM_SYNTAX: &str = "MODULE_BUILD_SYSTEM_SYNTAX";
    /// Language name to version map
    pub const MODULE_LANGUAGE: &str = "MODULE_LANGUAGE";
    /// Root-relative file list
    pub const MODULE_FILES: &str = "MODULE_FILES";

    /// Repository variables copied from the environment, in insertion order
    pub const REPOSITORY: &[&str] = &[
        NCI_REPOSITORY_KIND,
        NCI_REPOSITORY_REMOTE,
        NCI_REPOSITORY_HOST_TYPE,
        NCI_REPOSITORY_HOST_SERVER,
        NCI_COMMIT_REF_TYPE,
        NCI_COMMIT_REF_NAME,
        NCI_COMMIT_REF_SLUG,
        NCI_COMMIT_HASH,
        NCI_PIPELINE_TRIGGER,
    ];
}

/// Variables visible to a rule expression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleContext {
    vars: BTreeMap<String, Value>,
}

impl RuleContext {
    /// Creates an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Looks up a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Returns true if the variable is defined
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Iterates variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variables are defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Builds rule contexts for one planning run
///
/// The project context is assembled once; module contexts copy it and share
/// the [`vars::ENV`] map with it.
#[derive(Debug, Clone)]
pub struct ContextBuilder<'a> {
    project_dir: &'a Path,
    project: RuleContext,
}

impl<'a> ContextBuilder<'a> {
    /// Creates a builder over a project directory and environment
    #[must_use]
    pub fn new(project_dir: &'a Path, env: &BTreeMap<String, String>) -> Self {
        let mut project = RuleContext::new();
        for name in vars::REPOSITORY {
            project.insert(*name, env.get(*name).cloned().unwrap_or_default());
        }
        project.insert(
            vars::PROJECT_DIR,
            project_dir.to_string_lossy().into_owned(),
        );
        project.insert(vars::ENV, Arc::new(env.clone()));
        Self {
            project_dir,
            project,
        }
    }

    /// Context for project-scoped rules
    #[must_use]
    pub fn project_context(&self) -> RuleContext {
        self.project.clone()
    }

    /// Context for rules evaluated against a single module
    #[must_use]
    pub fn module_context(&self, module: &ProjectModule) -> RuleContext {
        let mut ctx = self.project_context();
        ctx.insert(vars::MODULE_ID, module.id.as_str());
        ctx.insert(vars::MODULE_NAME, module.name.as_str());
        ctx.insert(vars::MODULE_SLUG, module.slug.as_str());
        ctx.insert(vars::MODULE_BUILD_SYSTEM, module.build_system.as_str());
        ctx.insert(
            vars::MODULE_BUILD_SYSTEM_SYNTAX,
            module.build_system_syntax.as_str(),
        );
        ctx.insert(vars::MODULE_LANGUAGE, module.language.clone());
        ctx.insert(
            vars::MODULE_FILES,
            normalize_files(self.project_dir, &module.files),
        );
        ctx
    }
}

/// Makes module files root-relative with `/` separators and no leading or
/// trailing separator
#[must_use]
pub fn normalize_files(project_dir: &Path, files: &[String]) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            let path = Path::new(file);
            let relative = path.strip_prefix(project_dir).unwrap_or(path);
            relative
                .to_string_lossy()
                .replace('\\', "/")
                .trim_matches('/')
                .to_string()
        })
        .collect()
}
