//! Entity Model
//!
//! Records and enums materialized for one generator run, stored in an
//! arena ([`EntityStore`]) and linked by [`EntityId`]:
//! - `dependencies` / `parents`: direct references and their reverse
//! - `owners`: records containing this record through an array field
//!
//! Namespace and name are per generator, so the same schema can be named
//! differently by each generator. Stores are frozen behind an `Arc` once
//! built and published to the [`Registry`](crate::generator::Registry).

pub mod closure;
pub mod fields;

pub use closure::{dependencies_all, dependencies_to_closest_dependent, dependencies_up_to_closest_dependent};
pub use fields::{flatten_fields, flatten_fields_with_records, flatten_records};

use petgraph::graph::NodeIndex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{GenError, Result};
use crate::graph::{DependencyGraph, SchemaGraph};
use crate::schema::{NamedKind, NamedSchema, SchemaSet};
use crate::types::{resolve_type, EntityLookup, Type};

/// Enum property listing one alias per symbol
pub const PROP_SYMBOL_ALIASES: &str = "symbol_aliases";

/// Handle of an entity inside its [`EntityStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Names decided by a generator for one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub namespace: String,
    pub name: String,
    pub fullname: String,
}

impl Naming {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            fullname: fullname.into(),
        }
    }
}

/// A record field with its resolved type
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.ty.is_primary()
    }
}

/// A record materialized for one generator
#[derive(Debug, Clone)]
pub struct RecordEntity {
    pub naming: Naming,
    pub schema: Arc<NamedSchema>,
    fields: Vec<Field>,
    dependencies: Vec<EntityId>,
    parents: Vec<EntityId>,
    owners: Vec<EntityId>,
    is_root: bool,
}

impl RecordEntity {
    pub fn new(naming: Naming, schema: Arc<NamedSchema>, fields: Vec<Field>, is_root: bool) -> Self {
        Self {
            naming,
            schema,
            fields,
            dependencies: Vec::new(),
            parents: Vec::new(),
            owners: Vec::new(),
            is_root,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn dependencies(&self) -> &[EntityId] {
        &self.dependencies
    }

    /// Records referencing this one
    pub fn parents(&self) -> &[EntityId] {
        &self.parents
    }

    pub fn owners(&self) -> &[EntityId] {
        &self.owners
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Has an array field of records or enums
    pub fn is_owner(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.ty.element().map(|e| e.entity().is_some()).unwrap_or(false))
    }

    pub fn is_dependent(&self) -> bool {
        !self.owners.is_empty()
    }

    /// Whether `dependency` is a direct 1-N child (array-of-record element) of this record
    pub fn owns(&self, dependency: EntityId) -> bool {
        self.fields
            .iter()
            .any(|f| f.ty.element().and_then(Type::record) == Some(dependency))
    }

    /// The single field marked `primary`
    pub fn primary_key(&self) -> Result<&Field> {
        let mut primary = self.fields.iter().filter(|f| f.is_primary());
        match (primary.next(), primary.next()) {
            (Some(field), None) => Ok(field),
            (None, _) => Err(GenError::graph(
                &self.schema.fullname,
                "record hasn't primary key",
            )),
            (Some(_), Some(_)) => Err(GenError::graph(
                &self.schema.fullname,
                "record has more than one primary key",
            )),
        }
    }
}

/// An enum materialized for one generator
#[derive(Debug, Clone)]
pub struct EnumEntity {
    pub naming: Naming,
    pub schema: Arc<NamedSchema>,
    symbols: Vec<String>,
    aliases: Option<Vec<String>>,
}

impl EnumEntity {
    /// Fails when `aliases` does not pair up with `symbols`
    pub fn new(
        naming: Naming,
        schema: Arc<NamedSchema>,
        symbols: Vec<String>,
        aliases: Option<Vec<String>>,
    ) -> Result<Self> {
        if let Some(aliases) = &aliases {
            if aliases.len() != symbols.len() {
                return Err(GenError::schema(
                    &schema.fullname,
                    format!(
                        "{} has {} entries but the enum has {} symbols",
                        PROP_SYMBOL_ALIASES,
                        aliases.len(),
                        symbols.len()
                    ),
                ));
            }
        }
        Ok(Self {
            naming,
            schema,
            symbols,
            aliases,
        })
    }

    /// Build from the enum schema, reading aliases from `symbol_aliases`
    pub fn from_schema(naming: Naming, schema: Arc<NamedSchema>) -> Result<Self> {
        let aliases = match schema.props.get(PROP_SYMBOL_ALIASES) {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| {
                        v.as_str().map(String::from).ok_or_else(|| {
                            GenError::schema(&schema.fullname, format!("{} must be strings", PROP_SYMBOL_ALIASES))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(_) => {
                return Err(GenError::schema(
                    &schema.fullname,
                    format!("{} must be an array", PROP_SYMBOL_ALIASES),
                ))
            }
        };
        let symbols = schema.symbols().to_vec();
        Self::new(naming, schema, symbols, aliases)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn aliases(&self) -> Option<&[String]> {
        self.aliases.as_deref()
    }

    /// Alias paired with `symbol`; the symbol itself when no aliases are declared
    pub fn alias(&self, symbol: &str) -> Result<&str> {
        let position = self
            .symbols
            .iter()
            .position(|s| s == symbol)
            .ok_or_else(|| {
                GenError::schema(&self.schema.fullname, format!("unknown symbol `{}`", symbol))
            })?;
        Ok(match &self.aliases {
            Some(aliases) => &aliases[position],
            None => &self.symbols[position],
        })
    }
}

/// Record or enum entity
#[derive(Debug, Clone)]
pub enum Entity {
    Record(RecordEntity),
    Enum(EnumEntity),
}

impl Entity {
    pub fn naming(&self) -> &Naming {
        match self {
            Entity::Record(r) => &r.naming,
            Entity::Enum(e) => &e.naming,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.naming().namespace
    }

    pub fn name(&self) -> &str {
        &self.naming().name
    }

    pub fn fullname(&self) -> &str {
        &self.naming().fullname
    }

    /// Originating schema definition
    pub fn schema(&self) -> &Arc<NamedSchema> {
        match self {
            Entity::Record(r) => &r.schema,
            Entity::Enum(e) => &e.schema,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Record(_) => "record",
            Entity::Enum(_) => "enum",
        }
    }

    pub fn as_record(&self) -> Option<&RecordEntity> {
        match self {
            Entity::Record(r) => Some(r),
            Entity::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumEntity> {
        match self {
            Entity::Enum(e) => Some(e),
            Entity::Record(_) => None,
        }
    }
}

/// Arena of the entities built by one generator
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    generator: String,
    entities: Vec<Entity>,
    by_schema: HashMap<String, EntityId>,
}

impl EntityStore {
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            ..Self::default()
        }
    }

    /// Materialize `scope` (in flattened order) with the given names.
    ///
    /// Entity ids follow scope order; relations are wired once every entity exists.
    pub fn build(
        generator: &str,
        graph: &SchemaGraph,
        schemas: &SchemaSet,
        scope: &[(NodeIndex, Naming)],
    ) -> Result<Self> {
        let scope: Vec<&(NodeIndex, Naming)> = scope
            .iter()
            .filter(|(idx, _)| graph.node(*idx).kind() != NamedKind::Fixed)
            .collect();

        let ids: HashMap<String, EntityId> = scope
            .iter()
            .enumerate()
            .map(|(i, (idx, _))| (graph.node(*idx).fullname().to_string(), EntityId(i)))
            .collect();

        let mut store = Self::new(generator);
        for (idx, naming) in &scope {
            let node = graph.node(*idx);
            let entity = match node.kind() {
                NamedKind::Enum => Entity::Enum(EnumEntity::from_schema(naming.clone(), node.schema.clone())?),
                _ => {
                    let fields = node
                        .schema
                        .fields()
                        .iter()
                        .map(|f| {
                            resolve_type(&f.schema, &f.props, schemas, &ids)
                                .map(|ty| Field::new(&f.name, ty))
                                .map_err(|e| at_field(e, node.fullname(), &f.name))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Entity::Record(RecordEntity::new(naming.clone(), node.schema.clone(), fields, node.is_root))
                }
            };
            store.push(entity);
        }

        for (i, (idx, _)) in scope.iter().enumerate() {
            let id = EntityId(i);
            if store.record(id).is_none() {
                continue;
            }

            let dependencies: Vec<EntityId> = graph
                .dependencies(*idx)
                .into_iter()
                .filter_map(|dep| ids.lookup(graph.node(dep).fullname()))
                .collect();
            let mut owners = Vec::new();
            for &owner in graph.owners(*idx) {
                let Some(owner_id) = ids.lookup(graph.node(owner).fullname()) else {
                    debug!("Owner `{}` is outside the scope of work", graph.node(owner).fullname());
                    continue;
                };
                if store.record(owner_id).is_none() {
                    return Err(GenError::graph(
                        graph.node(owner).fullname(),
                        format!("owner of `{}` is not a record", graph.node(*idx).fullname()),
                    ));
                }
                owners.push(owner_id);
            }

            for &dep in &dependencies {
                if let Entity::Record(parent_of) = &mut store.entities[dep.0] {
                    if !parent_of.parents.contains(&id) {
                        parent_of.parents.push(id);
                    }
                }
            }
            if let Entity::Record(record) = &mut store.entities[i] {
                record.dependencies = dependencies;
                record.owners = owners;
            }
        }

        debug!("Generator `{}` built {} entities", generator, store.len());
        Ok(store)
    }

    pub(crate) fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.by_schema.insert(entity.schema().fullname.clone(), id);
        self.entities.push(entity);
        id
    }

    /// Generator that built this store
    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn record(&self, id: EntityId) -> Option<&RecordEntity> {
        self.entities.get(id.0).and_then(Entity::as_record)
    }

    /// Entity built for the schema `fullname`
    pub fn by_schema(&self, fullname: &str) -> Option<EntityId> {
        self.by_schema.get(fullname).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityLookup for EntityStore {
    fn lookup(&self, fullname: &str) -> Option<EntityId> {
        self.by_schema(fullname)
    }
}

impl DependencyGraph for EntityStore {
    type Id = EntityId;

    fn key(&self, id: EntityId) -> &str {
        &self.get(id).schema().fullname
    }

    fn dependencies_of(&self, id: EntityId) -> Vec<EntityId> {
        self.record(id)
            .map(|r| r.dependencies().to_vec())
            .unwrap_or_default()
    }
}

fn at_field(err: GenError, record: &str, field: &str) -> GenError {
    match err {
        GenError::Schema { message, .. } => GenError::schema(format!("{}.{}", record, field), message),
        other => other,
    }
}
