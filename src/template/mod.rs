//! Template engine adapter
//!
//! Wraps a strict `minijinja` environment:
//! - undefined variables and attributes are errors, never blank output
//! - block tags swallow their trailing newline (`trim_blocks`/`lstrip_blocks`)
//! - templates are registered by name; a template set's file stem is its name
//!
//! A [`TemplateSet`] comes from a directory next to the definition file or,
//! failing that, from the template sets embedded in the binary.

pub mod filters;
pub mod objects;

pub use filters::{register_filters, to_camel_case, to_snake_case};
pub use objects::{EntityView, FieldView, SchemaView, TypeView};

use include_dir::{include_dir, Dir};
use minijinja::value::Value;
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::convert::ConverterSet;
use crate::error::{GenError, Result};
use crate::generator::Registry;

/// Template sets shipped with the crate, one directory per set
static BUILTIN_SETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/generators");

/// Extension of template files
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "jinja";

/// Variables handed to a template
pub type Context = BTreeMap<String, Value>;

/// Named template sources of one generator
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    origin: String,
    templates: BTreeMap<String, String>,
}

impl TemplateSet {
    pub fn from_sources<N, S>(origin: impl Into<String>, sources: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            origin: origin.into(),
            templates: sources
                .into_iter()
                .map(|(name, source)| (name.into(), source.into()))
                .collect(),
        }
    }

    /// Resolve `path` against `base_path`, falling back to a built-in set
    pub fn load(path: &str, base_path: &Path, extension: &str) -> Result<Self> {
        let dir = base_path.join(path);
        if dir.is_dir() {
            return Self::from_dir(&dir, extension);
        }
        Self::builtin(path).ok_or_else(|| {
            GenError::Config(format!(
                "Unable to load templates for `{}`: {:?} is not a directory and no built-in set has that name (built-in sets: {})",
                path,
                dir,
                Self::builtin_names().join(", ")
            ))
        })
    }

    /// Every `*.<extension>` file under `dir`, named by its relative path without extension
    pub fn from_dir(dir: &Path, extension: &str) -> Result<Self> {
        let mut templates = BTreeMap::new();
        for name in list_template_names(dir, extension)? {
            let file = dir.join(format!("{}.{}", name, extension));
            let source = fs::read_to_string(&file).map_err(|e| GenError::io(&file, e))?;
            templates.insert(name, source);
        }
        debug!("Loaded {} templates from {:?}", templates.len(), dir);
        Ok(Self {
            origin: dir.display().to_string(),
            templates,
        })
    }

    /// Built-in set `name`, if one is embedded
    pub fn builtin(name: &str) -> Option<Self> {
        let dir = BUILTIN_SETS.get_dir(name)?;
        let mut templates = BTreeMap::new();
        for file in dir.files() {
            let path = file.path();
            if path.extension().map(|e| e != DEFAULT_TEMPLATE_EXTENSION).unwrap_or(true) {
                continue;
            }
            if let (Some(stem), Some(source)) = (path.file_stem().and_then(|s| s.to_str()), file.contents_utf8()) {
                templates.insert(stem.to_string(), source.to_string());
            }
        }
        Some(Self {
            origin: format!("builtin:{}", name),
            templates,
        })
    }

    /// Names of the embedded template sets
    pub fn builtin_names() -> Vec<String> {
        BUILTIN_SETS
            .dirs()
            .filter_map(|d| d.path().file_name().and_then(|n| n.to_str()).map(String::from))
            .collect()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Names of the templates under `dir`, sorted
pub fn list_template_names(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            GenError::io(dir, e.into_io_error().unwrap_or_else(|| std::io::Error::other(message)))
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != extension).unwrap_or(true) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        names.push(name);
    }
    Ok(names)
}

/// Strict environment with filters, plus compiled templates
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// `registry` is what the `from` filter can see
    pub fn new(converters: &ConverterSet, registry: Registry) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        register_filters(&mut env, converters, registry);
        Self { env }
    }

    /// Compile every template of `set`
    pub fn add_set(&mut self, set: &TemplateSet) -> Result<()> {
        for (name, source) in &set.templates {
            self.add_template(name.clone(), source.clone())
                .map_err(|e| GenError::Config(format!("template `{}` in {}: {}", name, set.origin, e)))?;
        }
        Ok(())
    }

    /// Compile one template under `name`
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        self.env
            .add_template_owned(name.into(), source.into())
            .map_err(GenError::Template)
    }

    /// Render the compiled template `name`
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        let template = self.env.get_template(name).map_err(GenError::Template)?;
        template.render(context).map_err(GenError::from_render)
    }

    /// Compile and render `source` once
    pub fn render_str(&self, source: &str, context: &Context) -> Result<String> {
        self.env
            .render_str(source, context)
            .map_err(GenError::from_render)
    }
}
