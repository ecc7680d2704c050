//! Error types for the schema factory
//!
//! Every failure is fatal for the run. Variants carry the offending
//! schema fullname, generator, type or path so the final message is
//! actionable on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for factory operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Coarse classification of a [`GenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or unparsable schema input
    Schema,
    /// Ownership / primary key rules broken
    GraphInvariant,
    /// Unknown generator, missing templates, bad definition file
    ConfigReference,
    /// A converter cannot represent a type
    UnsupportedType,
    /// File or subprocess failure
    Io,
}

/// Schema factory errors
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Schema error in {location}: {message}")]
    Schema { location: String, message: String },

    #[error("Graph invariant violated for {fullname}: {message}")]
    GraphInvariant { fullname: String, message: String },

    #[error("Unable to find generator `{name}`, available generators: {available}")]
    UnknownGenerator { name: String, available: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported Avro type: {type_name} (converter `{converter}`)")]
    UnsupportedType { converter: String, type_name: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Post-call `{command}` failed: {message}")]
    PostCall { command: String, message: String },

    #[error("Template error: {0:#}")]
    Template(#[from] minijinja::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config_crate::ConfigError),
}

impl GenError {
    pub fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        GenError::Schema {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn graph(fullname: impl Into<String>, message: impl Into<String>) -> Self {
        GenError::GraphInvariant {
            fullname: fullname.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(converter: &str, type_name: &str) -> Self {
        GenError::UnsupportedType {
            converter: converter.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }

    /// Which part of the taxonomy this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            GenError::Schema { .. } | GenError::Json(_) => ErrorCategory::Schema,
            GenError::GraphInvariant { .. } => ErrorCategory::GraphInvariant,
            GenError::UnknownGenerator { .. }
            | GenError::Config(_)
            | GenError::Template(_)
            | GenError::Yaml(_)
            | GenError::Settings(_) => ErrorCategory::ConfigReference,
            GenError::UnsupportedType { .. } => ErrorCategory::UnsupportedType,
            GenError::Io { .. } | GenError::PostCall { .. } => ErrorCategory::Io,
        }
    }

    /// Unwrap a rendering failure back into the core error that caused it.
    ///
    /// Filters report core failures as the source of a template error;
    /// anything else stays a template error.
    pub fn from_render(err: minijinja::Error) -> Self {
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            if let Some(core) = cause.downcast_ref::<GenError>() {
                if let Some(copy) = core.detach() {
                    return copy;
                }
            }
            source = cause.source();
        }
        GenError::Template(err)
    }

    // Owned copy of the variants filters can raise.
    fn detach(&self) -> Option<GenError> {
        match self {
            GenError::Schema { location, message } => Some(GenError::schema(location, message)),
            GenError::GraphInvariant { fullname, message } => Some(GenError::graph(fullname, message)),
            GenError::UnknownGenerator { name, available } => Some(GenError::UnknownGenerator {
                name: name.clone(),
                available: available.clone(),
            }),
            GenError::Config(message) => Some(GenError::Config(message.clone())),
            GenError::UnsupportedType {
                converter,
                type_name,
            } => Some(GenError::unsupported(converter, type_name)),
            _ => None,
        }
    }
}
