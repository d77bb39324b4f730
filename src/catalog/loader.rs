//! Loading catalogs and module lists from YAML or JSON files

use std::fs;
use std::path::Path;
use tracing::debug;

use super::builder::{Catalog, CatalogConfig};
use super::errors::CatalogError;
use super::module::ProjectModule;

/// On-disk format of a catalog or module file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl Format {
    /// Picks the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(CatalogError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &str,
) -> Result<T, CatalogError> {
    let parse_error = |reason: String| CatalogError::Parse {
        path: origin.to_string(),
        reason,
    };
    match format {
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

fn read(path: &Path) -> Result<(String, Format), CatalogError> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok((content, format))
}

/// Parses catalog YAML
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] on malformed input.
pub fn from_yaml_str(content: &str) -> Result<CatalogConfig, CatalogError> {
    parse(content, Format::Yaml, "<inline>")
}

/// Parses catalog JSON
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] on malformed input.
pub fn from_json_str(content: &str) -> Result<CatalogConfig, CatalogError> {
    parse(content, Format::Json, "<inline>")
}

/// Reads one catalog file without validating it
///
/// # Errors
///
/// Fails if the file cannot be read, has an unknown extension or is
/// malformed.
pub fn load_file(path: &Path) -> Result<CatalogConfig, CatalogError> {
    let (content, format) = read(path)?;
    let config: CatalogConfig = parse(&content, format, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        actions = config.actions.len(),
        workflows = config.workflows.len(),
        "loaded catalog file"
    );
    Ok(config)
}

/// Reads and merges catalog files in order, then validates the result
///
/// Later files override actions and workflows of earlier ones, see
/// [`super::CatalogBuilder::merge`].
///
/// # Errors
///
/// Any read, parse or validation error.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Catalog, CatalogError> {
    let mut builder = Catalog::builder();
    for path in paths {
        builder = builder.merge(load_file(path.as_ref())?);
    }
    builder.build()
}

/// Reads a module list produced by repository analysis
///
/// # Errors
///
/// Fails if the file cannot be read, has an unknown extension, is
/// malformed or contains a module with a blank id.
pub fn load_modules(path: &Path) -> Result<Vec<ProjectModule>, CatalogError> {
    let (content, format) = read(path)?;
    let display = path.display().to_string();
    let mut modules: Vec<ProjectModule> = parse(&content, format, &display)?;
    for (index, module) in modules.iter_mut().enumerate() {
        if module.id.trim().is_empty() {
            return Err(CatalogError::EmptyModuleId {
                path: display,
                index,
            });
        }
        module.ensure_slug();
    }
    Ok(modules)
}
