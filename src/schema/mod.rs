//! Schema source model
//!
//! Avro definitions (`.avsc`) are parsed into a [`SchemaSet`]:
//! - every named type (record, enum, fixed) registered once by fullname
//! - anonymous types (primitives, arrays, maps, unions) kept inline as [`RawSchema`]
//! - logical type annotations and custom attributes preserved verbatim
//!
//! The set is shared by all files of one run, so a record may reference a
//! type defined in another file (or later in the same file).

pub mod loader;
pub mod parser;

pub use loader::load_schemas;
pub use parser::SchemaParser;

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Arbitrary custom attributes attached to a schema node
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Shape of an inline schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaBody {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<RawSchema>),
    Map(Box<RawSchema>),
    Union(Vec<RawSchema>),
    /// Reference to a named type by fullname
    Named(String),
}

/// An inline schema node with its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct RawSchema {
    pub body: SchemaBody,
    pub logical_type: Option<String>,
    pub props: Properties,
}

impl RawSchema {
    pub fn new(body: SchemaBody) -> Self {
        Self {
            body,
            logical_type: None,
            props: Properties::new(),
        }
    }

    /// Fullname of the referenced named type, if this node is a reference
    pub fn named(&self) -> Option<&str> {
        match &self.body {
            SchemaBody::Named(fullname) => Some(fullname),
            _ => None,
        }
    }

    /// Innermost element of a (possibly nested) array
    pub fn array_element(&self) -> Option<&RawSchema> {
        match &self.body {
            SchemaBody::Array(items) => Some(items.array_element().unwrap_or(items.as_ref())),
            _ => None,
        }
    }
}

/// Kind of a named definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKind {
    Record,
    Enum,
    Fixed,
}

impl NamedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedKind::Record => "record",
            NamedKind::Enum => "enum",
            NamedKind::Fixed => "fixed",
        }
    }
}

/// Body of a named definition
#[derive(Debug, Clone, PartialEq)]
pub enum NamedBody {
    Record { fields: Vec<FieldDef> },
    Enum { symbols: Vec<String> },
    Fixed { size: usize },
}

/// A record field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub doc: Option<String>,
    pub schema: RawSchema,
    pub default: Option<serde_json::Value>,
    /// Custom attributes declared next to `name`/`type`
    pub props: Properties,
}

/// A named record, enum or fixed definition
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSchema {
    pub fullname: String,
    pub name: String,
    pub namespace: Option<String>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub logical_type: Option<String>,
    pub props: Properties,
    pub body: NamedBody,
}

impl NamedSchema {
    pub fn kind(&self) -> NamedKind {
        match self.body {
            NamedBody::Record { .. } => NamedKind::Record,
            NamedBody::Enum { .. } => NamedKind::Enum,
            NamedBody::Fixed { .. } => NamedKind::Fixed,
        }
    }

    pub fn is_record(&self) -> bool {
        self.kind() == NamedKind::Record
    }

    pub fn is_enum(&self) -> bool {
        self.kind() == NamedKind::Enum
    }

    /// Record fields (empty for enums and fixed)
    pub fn fields(&self) -> &[FieldDef] {
        match &self.body {
            NamedBody::Record { fields } => fields,
            _ => &[],
        }
    }

    /// Enum symbols (empty for records and fixed)
    pub fn symbols(&self) -> &[String] {
        match &self.body {
            NamedBody::Enum { symbols } => symbols,
            _ => &[],
        }
    }

    /// Namespace, or the empty string for the null namespace
    pub fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }
}

/// All named definitions of one run
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    pub(crate) named: IndexMap<String, Arc<NamedSchema>>,
    pub(crate) top_level: Vec<String>,
    pub(crate) sources: Vec<PathBuf>,
    pub(crate) bundle_hash: String,
}

impl SchemaSet {
    /// Parse a set from in-memory sources
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> crate::Result<Self> {
        let mut parser = SchemaParser::new();
        for (origin, json) in sources {
            parser.parse_source(json, origin)?;
        }
        parser.finish()
    }

    pub fn get(&self, fullname: &str) -> Option<&Arc<NamedSchema>> {
        self.named.get(fullname)
    }

    /// Fullnames of the definitions declared at the top level of each file
    pub fn top_level(&self) -> &[String] {
        &self.top_level
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NamedSchema>> {
        self.named.values()
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Files the set was loaded from
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// SHA-256 over the loaded file contents
    pub fn bundle_hash(&self) -> &str {
        &self.bundle_hash
    }
}
