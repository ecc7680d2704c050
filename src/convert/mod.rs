//! Type Converters
//!
//! Each converter maps every [`TypeKind`](crate::types::TypeKind) to a
//! target-specific token, or rejects it with
//! [`GenError::UnsupportedType`](crate::error::GenError::UnsupportedType).
//! Matches are exhaustive on purpose: a new type variant does not compile
//! until every converter decides what to do with it.
//!
//! Converters are registered in a [`ConverterSet`] and exposed to templates
//! as filters named after [`TypeConverter::name`].

mod connect;
mod flatbuffers;
mod java;
mod liquibase;

pub use connect::{ConnectSchemaType, ConnectStructGetter};
pub use flatbuffers::{FbFactory, FbIsPrimitive, FbType};
pub use java::JavaType;
pub use liquibase::LiquibaseType;

use std::fmt;
use std::sync::Arc;

use crate::entity::EntityStore;
use crate::error::Result;
use crate::types::Type;

/// Converter output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Flag(bool),
}

impl Token {
    pub fn text(value: impl Into<String>) -> Self {
        Token::Text(value.into())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => write!(f, "{}", s),
            Token::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Maps a [`Type`] to a target-specific token
pub trait TypeConverter: Send + Sync {
    /// Registration name, also the template filter name
    fn name(&self) -> &'static str;

    /// `entities` resolves record/enum references inside `ty`
    fn convert(&self, ty: &Type, entities: &EntityStore) -> Result<Token>;
}

/// Registered converters, in registration order
#[derive(Clone, Default)]
pub struct ConverterSet {
    converters: Vec<Arc<dyn TypeConverter>>,
}

impl ConverterSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in converters
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.register(FbType);
        set.register(FbFactory);
        set.register(FbIsPrimitive);
        set.register(JavaType);
        set.register(ConnectSchemaType);
        set.register(ConnectStructGetter);
        set.register(LiquibaseType);
        set
    }

    /// Add a converter; a converter with the same name is replaced
    pub fn register(&mut self, converter: impl TypeConverter + 'static) {
        self.converters.retain(|c| c.name() != converter.name());
        self.converters.push(Arc::new(converter));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TypeConverter>> {
        self.converters.iter().find(|c| c.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TypeConverter>> {
        self.converters.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
