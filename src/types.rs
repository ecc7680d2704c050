//! Type System
//!
//! A closed set of value types mirroring Avro primitives, logical types and
//! containers. Every [`Type`] carries the property bag of the schema node it
//! came from; `primary` marks primary-key fields.
//!
//! Record and enum types point into an [`EntityStore`](crate::entity::EntityStore)
//! by [`EntityId`], so equality on them is identity of the referenced entity.

use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::entity::EntityId;
use crate::error::{GenError, Result};
use crate::schema::{NamedBody, Properties, RawSchema, SchemaBody, SchemaSet};

// ===== Logical type names =====

pub const LOGICAL_DECIMAL: &str = "decimal";
pub const LOGICAL_UUID: &str = "uuid";
pub const LOGICAL_DATE: &str = "date";
pub const LOGICAL_TIME_MILLIS: &str = "time-millis";
pub const LOGICAL_TIME_MICROS: &str = "time-micros";
pub const LOGICAL_TIMESTAMP_MILLIS: &str = "timestamp-millis";
pub const LOGICAL_TIMESTAMP_MICROS: &str = "timestamp-micros";
pub const LOGICAL_LOCAL_TIMESTAMP_MILLIS: &str = "local-timestamp-millis";
pub const LOGICAL_LOCAL_TIMESTAMP_MICROS: &str = "local-timestamp-micros";
/// String carrying a formatted date-time
pub const LOGICAL_DATETIME: &str = "datetime-str";

/// Property holding the format of a `datetime-str` string
pub const PROP_DATETIME_FORMAT: &str = "datetime-format";
/// Property marking a primary-key field
pub const PROP_PRIMARY: &str = "primary";

/// Type variant
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    String,
    Uuid,
    Datetime { format: String },
    Bytes,
    Decimal { precision: u32, scale: u32 },
    Fixed { size: usize },
    Int,
    Date,
    TimeMillis,
    TimeMicros,
    Long,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
    Float,
    Double,
    Boolean,
    Null,
    Array(Box<Type>),
    Map,
    Union(Vec<Type>),
    Record(EntityId),
    Enum(EntityId),
    /// Closing marker for a nested record span in flattened field lists
    RecordClose(Box<Type>),
}

/// A resolved type with its property bag
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub props: Properties,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            props: Properties::new(),
        }
    }

    pub fn with_props(kind: TypeKind, props: Properties) -> Self {
        Self { kind, props }
    }

    /// Type name used in diagnostics and templates
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_primary(&self) -> bool {
        matches!(self.props.get(PROP_PRIMARY), Some(Value::Bool(true)))
    }

    /// Element type when this is an array
    pub fn element(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Referenced record entity, if any
    pub fn record(&self) -> Option<EntityId> {
        match self.kind {
            TypeKind::Record(id) => Some(id),
            _ => None,
        }
    }

    /// Referenced record or enum entity, if any
    pub fn entity(&self) -> Option<EntityId> {
        match self.kind {
            TypeKind::Record(id) | TypeKind::Enum(id) => Some(id),
            _ => None,
        }
    }

    /// Array whose element is a record
    pub fn is_record_list(&self) -> bool {
        self.element().map(|e| e.record().is_some()).unwrap_or(false)
    }
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::String => "string",
            TypeKind::Uuid => "uuid",
            TypeKind::Datetime { .. } => "datetime",
            TypeKind::Bytes => "bytes",
            TypeKind::Decimal { .. } => "decimal",
            TypeKind::Fixed { .. } => "fixed",
            TypeKind::Int => "int",
            TypeKind::Date => "date",
            TypeKind::TimeMillis => "time-millis",
            TypeKind::TimeMicros => "time-micros",
            TypeKind::Long => "long",
            TypeKind::TimestampMillis => "timestamp-millis",
            TypeKind::TimestampMicros => "timestamp-micros",
            TypeKind::LocalTimestampMillis => "local-timestamp-millis",
            TypeKind::LocalTimestampMicros => "local-timestamp-micros",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Boolean => "boolean",
            TypeKind::Null => "null",
            TypeKind::Array(_) => "array",
            TypeKind::Map => "map",
            TypeKind::Union(_) => "union",
            TypeKind::Record(_) => "record",
            TypeKind::Enum(_) => "enum",
            TypeKind::RecordClose(_) => "record-close",
        }
    }
}

/// Lookup of record/enum entities by schema fullname
pub trait EntityLookup {
    fn lookup(&self, fullname: &str) -> Option<EntityId>;
}

impl EntityLookup for HashMap<String, EntityId> {
    fn lookup(&self, fullname: &str) -> Option<EntityId> {
        self.get(fullname).copied()
    }
}

/// Resolve a schema node into a [`Type`].
///
/// `extra` holds field-level attributes; they are merged over the node's
/// own properties. Record and enum references must already have an entity.
pub fn resolve_type(
    schema: &RawSchema,
    extra: &Properties,
    schemas: &SchemaSet,
    entities: &impl EntityLookup,
) -> Result<Type> {
    let mut props = schema.props.clone();
    props.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    let logical = schema.logical_type.as_deref();

    let kind = match &schema.body {
        SchemaBody::Null => TypeKind::Null,
        SchemaBody::Boolean => TypeKind::Boolean,
        SchemaBody::Float => TypeKind::Float,
        SchemaBody::Double => TypeKind::Double,
        SchemaBody::String => match logical {
            Some(LOGICAL_UUID) => TypeKind::Uuid,
            Some(LOGICAL_DATETIME) => {
                let format = props
                    .get(PROP_DATETIME_FORMAT)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        GenError::schema(
                            "type",
                            format!("`{}` requires a `{}` property", LOGICAL_DATETIME, PROP_DATETIME_FORMAT),
                        )
                    })?;
                TypeKind::Datetime {
                    format: format.to_string(),
                }
            }
            other => fallback(TypeKind::String, other),
        },
        SchemaBody::Bytes => match logical {
            Some(LOGICAL_DECIMAL) => decimal(&props)?,
            other => fallback(TypeKind::Bytes, other),
        },
        SchemaBody::Int => match logical {
            Some(LOGICAL_DATE) => TypeKind::Date,
            Some(LOGICAL_TIME_MILLIS) => TypeKind::TimeMillis,
            Some(LOGICAL_TIME_MICROS) => TypeKind::TimeMicros,
            other => fallback(TypeKind::Int, other),
        },
        SchemaBody::Long => match logical {
            Some(LOGICAL_TIME_MICROS) => TypeKind::TimeMicros,
            Some(LOGICAL_TIMESTAMP_MILLIS) => TypeKind::TimestampMillis,
            Some(LOGICAL_TIMESTAMP_MICROS) => TypeKind::TimestampMicros,
            Some(LOGICAL_LOCAL_TIMESTAMP_MILLIS) => TypeKind::LocalTimestampMillis,
            Some(LOGICAL_LOCAL_TIMESTAMP_MICROS) => TypeKind::LocalTimestampMicros,
            other => fallback(TypeKind::Long, other),
        },
        SchemaBody::Array(items) => TypeKind::Array(Box::new(resolve_type(
            items,
            &Properties::new(),
            schemas,
            entities,
        )?)),
        SchemaBody::Map(_) => TypeKind::Map,
        SchemaBody::Union(members) => TypeKind::Union(
            members
                .iter()
                .map(|member| resolve_type(member, &Properties::new(), schemas, entities))
                .collect::<Result<Vec<_>>>()?,
        ),
        SchemaBody::Named(fullname) => {
            let named = schemas
                .get(fullname)
                .ok_or_else(|| GenError::schema("type", format!("undefined type `{}`", fullname)))?;
            for (key, value) in &named.props {
                props.entry(key.clone()).or_insert_with(|| value.clone());
            }
            let entity = || {
                entities.lookup(fullname).ok_or_else(|| {
                    GenError::schema(
                        "type",
                        format!("`{}` is referenced but not part of the scope of work", fullname),
                    )
                })
            };
            match &named.body {
                NamedBody::Fixed { size } => TypeKind::Fixed { size: *size },
                NamedBody::Record { .. } => TypeKind::Record(entity()?),
                NamedBody::Enum { .. } => TypeKind::Enum(entity()?),
            }
        }
    };

    Ok(Type { kind, props })
}

fn fallback(kind: TypeKind, logical: Option<&str>) -> TypeKind {
    if let Some(logical) = logical {
        warn!(
            "Logical type `{}` is not recognized on {}, using the primitive",
            logical,
            kind.name()
        );
    }
    kind
}

fn decimal(props: &Properties) -> Result<TypeKind> {
    let precision = props
        .get("precision")
        .and_then(Value::as_u64)
        .ok_or_else(|| GenError::schema("type", "decimal requires an integer `precision`"))?;
    let scale = props.get("scale").and_then(Value::as_u64).unwrap_or(0);
    Ok(TypeKind::Decimal {
        precision: decimal_bound("precision", precision)?,
        scale: decimal_bound("scale", scale)?,
    })
}

fn decimal_bound(key: &str, value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| GenError::schema("type", format!("decimal `{}` {} is out of range", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn field_types(fields_json: &str) -> Result<Vec<Type>> {
        let source = format!(
            r#"[
                {{"type": "enum", "name": "t.Color", "symbols": ["RED"]}},
                {{"type": "record", "name": "t.Holder", "fields": {}}}
            ]"#,
            fields_json
        );
        let set = SchemaSet::from_sources([("inline", source.as_str())])?;
        let mut lookup = HashMap::new();
        lookup.insert("t.Color".to_string(), EntityId(0));
        lookup.insert("t.Holder".to_string(), EntityId(1));
        let holder = set.get("t.Holder").unwrap().clone();
        holder
            .fields()
            .iter()
            .map(|f| resolve_type(&f.schema, &f.props, &set, &lookup))
            .collect()
    }

    #[test]
    fn test_logical_types_refine_primitives() {
        let types = field_types(
            r#"[
                {"name": "a", "type": {"type": "string", "logicalType": "uuid"}},
                {"name": "b", "type": {"type": "int", "logicalType": "date"}},
                {"name": "c", "type": {"type": "long", "logicalType": "local-timestamp-micros"}},
                {"name": "d", "type": {"type": "bytes", "logicalType": "decimal", "precision": 12, "scale": 4}},
                {"name": "e", "type": {"type": "string", "logicalType": "datetime-str", "datetime-format": "yyyy-MM-dd"}}
            ]"#,
        )
        .unwrap();
        let names: Vec<_> = types.iter().map(Type::name).collect();
        assert_eq!(names, vec!["uuid", "date", "local-timestamp-micros", "decimal", "datetime"]);
        assert_eq!(types[3].kind, TypeKind::Decimal { precision: 12, scale: 4 });
        assert_eq!(
            types[4].kind,
            TypeKind::Datetime {
                format: "yyyy-MM-dd".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_logical_type_falls_back() {
        let types = field_types(
            r#"[{"name": "a", "type": {"type": "long", "logicalType": "duration-nanos"}}]"#,
        )
        .unwrap();
        assert_eq!(types[0].kind, TypeKind::Long);
    }

    #[test]
    fn test_datetime_without_format_is_schema_error() {
        let err = field_types(
            r#"[{"name": "a", "type": {"type": "string", "logicalType": "datetime-str"}}]"#,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert!(err.to_string().contains("datetime-format"));
    }

    #[test]
    fn test_decimal_out_of_range_is_schema_error() {
        let err = field_types(
            r#"[{"name": "a", "type": {"type": "bytes", "logicalType": "decimal", "precision": 4294967296}}]"#,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert!(err.to_string().contains("decimal `precision` 4294967296 is out of range"));
    }

    #[test]
    fn test_references_and_containers() {
        let types = field_types(
            r#"[
                {"name": "color", "type": "t.Color"},
                {"name": "self", "type": {"type": "array", "items": {"type": "array", "items": "t.Holder"}}},
                {"name": "tags", "type": {"type": "map", "values": "string"}},
                {"name": "maybe", "type": ["null", "string"]},
                {"name": "hash", "type": {"type": "fixed", "name": "t.Md5", "size": 16}}
            ]"#,
        )
        .unwrap();
        assert_eq!(types[0].kind, TypeKind::Enum(EntityId(0)));
        let inner = types[1].element().and_then(Type::element).unwrap();
        assert_eq!(inner.record(), Some(EntityId(1)));
        assert!(!types[1].is_record_list());
        assert_eq!(types[2].kind, TypeKind::Map);
        assert_eq!(types[3].name(), "union");
        assert_eq!(types[4].kind, TypeKind::Fixed { size: 16 });
    }

    #[test]
    fn test_primary_from_field_or_type_props() {
        let types = field_types(
            r#"[
                {"name": "a", "type": "int", "primary": true},
                {"name": "b", "type": {"type": "string", "primary": true}},
                {"name": "c", "type": "int"}
            ]"#,
        )
        .unwrap();
        assert!(types[0].is_primary());
        assert!(types[1].is_primary());
        assert!(!types[2].is_primary());
    }

    #[test]
    fn test_record_equality_is_by_entity() {
        let mut a = Type::new(TypeKind::Record(EntityId(3)));
        a.props.insert("x".to_string(), Value::Bool(true));
        let b = Type::new(TypeKind::Record(EntityId(3)));
        assert_eq!(a, b);
        assert_ne!(a, Type::new(TypeKind::Record(EntityId(4))));
    }
}
