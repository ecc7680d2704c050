//! Configuration for the schema factory
//!
//! Two layers:
//! - the factory definition, a YAML file describing one run (schemas, values, generators)
//! - tool settings, loaded from defaults, `schema-factory.toml` and environment
//!   variables (`SCHEMA_FACTORY__*`)
//!
//! ## Example definition (factory.yaml):
//! ```yaml
//! schemas:
//!   - schemas/
//! values:
//!   package: "com.acme.{{ 'model' }}"
//! generators:
//!   - path: pojo
//!     name: base
//!     templates:
//!       namespace: "{{ package }}"
//!       folder: "out/java/{{ namespace|replace('.', '/') }}"
//!       filename: "{{ name }}.java"
//!   - path: fbs
//!     overrides: base
//!     filters:
//!       deny: [shop.Audit]
//!     postCall: "flatc --java {{ files|join(' ') }}"
//! ```
//!
//! ## Example settings file (schema-factory.toml):
//! ```toml
//! log = "schema_factory=debug"
//! skip_post_calls = false
//! template_extension = "jinja"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GenError, Result};
use crate::template::DEFAULT_TEMPLATE_EXTENSION;

/// One factory run, as read from its definition file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Schema files or directories, relative to the definition file
    #[serde(default)]
    pub schemas: Vec<PathBuf>,

    /// Shared values, each a template evaluated once in declaration order
    #[serde(default)]
    pub values: IndexMap<String, String>,

    /// Generators in execution order
    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
}

/// One generator of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Template set: a directory under the base path, or a built-in set name
    pub path: String,

    /// Registry name; defaults to `path`
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub templates: NamingTemplates,

    /// Earlier generator whose names are reused for entities this one does not render
    #[serde(default)]
    pub overrides: Option<String>,

    #[serde(default)]
    pub filters: Option<FiltersConfig>,

    /// Command template run once after rendering
    #[serde(default)]
    pub post_call: Option<String>,
}

impl GeneratorConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

/// Inline naming templates; absent ones fall back to schema names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingTemplates {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Schema fullnames to render (`allow`) or to skip (`deny`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default, alias = "white")]
    pub allow: Option<Vec<String>>,
    #[serde(default, alias = "black")]
    pub deny: Option<Vec<String>>,
}

impl FiltersConfig {
    /// Whether `fullname` passes both lists
    pub fn admits(&self, fullname: &str) -> bool {
        if let Some(allow) = &self.allow {
            if !allow.is_empty() && !allow.iter().any(|f| f == fullname) {
                return false;
            }
        }
        if let Some(deny) = &self.deny {
            if deny.iter().any(|f| f == fullname) {
                return false;
            }
        }
        true
    }
}

impl FactoryConfig {
    /// Parse a definition file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        let config = Self::from_yaml(&content)?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: FactoryConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Generator names are unique and every `overrides` names an earlier generator
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for generator in &self.generators {
            if let Some(target) = &generator.overrides {
                if !seen.contains(&target.as_str()) {
                    return Err(GenError::UnknownGenerator {
                        name: target.clone(),
                        available: seen.join(", "),
                    });
                }
            }
            if seen.contains(&generator.name()) {
                return Err(GenError::Config(format!(
                    "generator name `{}` is used more than once",
                    generator.name()
                )));
            }
            seen.push(generator.name());
        }
        Ok(())
    }

    /// Directory every relative path of the definition resolves against
    pub fn base_path(definition: &Path) -> Result<PathBuf> {
        let absolute = if definition.is_absolute() {
            definition.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| GenError::io(definition, e))?
                .join(definition)
        };
        Ok(absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/")))
    }

    /// Schema locations resolved against `base_path`
    pub fn schema_paths(&self, base_path: &Path) -> Vec<PathBuf> {
        self.schemas.iter().map(|p| base_path.join(p)).collect()
    }
}

/// Split CLI arguments that carry comma-separated definition paths
pub fn split_config_paths<S: AsRef<str>>(args: &[S]) -> Vec<PathBuf> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Process-wide tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log")]
    pub log: String,

    /// Render post-call commands but do not run them
    #[serde(default)]
    pub skip_post_calls: bool,

    /// Extension of template files in template set directories
    #[serde(default = "default_template_extension")]
    pub template_extension: String,
}

fn default_log() -> String {
    "info".to_string()
}

fn default_template_extension() -> String {
    DEFAULT_TEMPLATE_EXTENSION.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: default_log(),
            skip_post_calls: false,
            template_extension: default_template_extension(),
        }
    }
}

impl Settings {
    /// Load settings from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load settings, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-factory.toml",
            ".schema-factory.toml",
            "config/schema-factory.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-factory", "schema-factory") {
            let xdg_config = config_dir.config_dir().join("schema-factory.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_FACTORY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GenError::Config(e.to_string()))
    }

    /// Save settings to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| GenError::io(path, e))
    }
}
