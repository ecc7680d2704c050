//! Schema Factory
//!
//! A schema-driven multi-target code generator. Avro schemas (`.avsc`) are
//! parsed into a dependency/ownership graph, turned into typed entities,
//! and rendered through template sets by independently configured
//! generators.
//!
//! ## Features
//!
//! - **Schema Graph**: records, enums and their 1-N (array) ownership relations
//! - **Scope of Work**: dependency-first flattening of everything reachable from the roots
//! - **Typed Entities**: logical types resolved into a closed `TypeKind` enum
//! - **Template Roles**: `enum`, `root`, `owner`, `dependent`, `child`, `record`
//! - **Cross-Generator Lookups**: later generators reuse earlier generators' names
//!
//! ## Architecture
//!
//! ```text
//! factory.yaml
//!   ├── schemas ──► schema::load_schemas ──► graph::SchemaGraph ──► scope of work
//!   ├── values  ──► evaluated once, shared by every template
//!   └── generators (in order)
//!         ├── entity::EntityStore (per generator)
//!         ├── template::TemplateEngine (role templates + filters)
//!         ├── sink::OutputSink (rendered files)
//!         └── generator::Registry (published stores, `from` / `overrides`)
//! ```

pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod factory;
pub mod generator;
pub mod graph;
pub mod postcall;
pub mod schema;
pub mod sink;
pub mod template;
pub mod types;

pub use config::{FactoryConfig, GeneratorConfig, Settings};
pub use convert::{ConverterSet, Token, TypeConverter};
pub use entity::{Entity, EntityId, EntityStore};
pub use error::{ErrorCategory, GenError, Result};
pub use factory::{Factory, FactoryReport};
pub use generator::{Generator, GeneratorReport, Registry, Role};
pub use graph::SchemaGraph;
pub use schema::{load_schemas, SchemaSet};
pub use sink::{FsSink, MemorySink, OutputSink};
pub use types::{Type, TypeKind};
