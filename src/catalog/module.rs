//! Detected project modules
//!
//! Modules are produced by repository analysis, which lives outside this
//! crate. The planner only reads them.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::slugify;

/// One detected build unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModule {
    /// Stable module identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// URL-safe name; derived from `name` when omitted
    #[serde(default)]
    pub slug: String,
    /// Build system, e.g. `gomod`, `cargo`, `gradle`
    #[serde(default)]
    pub build_system: String,
    /// Build system flavour, e.g. `kotlin` or `groovy` for gradle
    #[serde(default)]
    pub build_system_syntax: String,
    /// Language name to version
    #[serde(default)]
    pub language: BTreeMap<String, String>,
    /// Files belonging to the module
    #[serde(default)]
    pub files: Vec<String>,
}

impl ProjectModule {
    /// Creates a module; the slug is derived from the name
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        build_system: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            slug: slugify(&name),
            name,
            build_system: build_system.into(),
            build_system_syntax: String::new(),
            language: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// Sets the build system syntax
    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.build_system_syntax = syntax.into();
        self
    }

    /// Adds a language with its version
    pub fn with_language(mut self, language: impl Into<String>, version: impl Into<String>) -> Self {
        self.language.insert(language.into(), version.into());
        self
    }

    /// Sets the file list
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Fills in a missing slug from the name
    pub(crate) fn ensure_slug(&mut self) {
        if self.slug.is_empty() {
            self.slug = slugify(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_slug_derived() {
        let module = ProjectModule::new("m1", "My Module", "cargo");
        assert_eq!(module.slug, "my-module");
    }

    #[test]
    fn test_module_deserialize_fills_slug() {
        let mut module: ProjectModule =
            serde_json::from_str(r#"{"id": "m1", "name": "Web UI", "build_system": "npm"}"#)
                .unwrap();
        assert!(module.slug.is_empty());
        module.ensure_slug();
        assert_eq!(module.slug, "web-ui");
    }
}
