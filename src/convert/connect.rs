//! Kafka Connect schema constants and `Struct` getters

use super::{Token, TypeConverter};
use crate::entity::EntityStore;
use crate::error::{GenError, Result};
use crate::types::{Type, TypeKind};

/// Connect `Schema` constant for a field (`connectSchemaType`)
///
/// Arrays and enums travel as strings; nested records are not representable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectSchemaType;

impl TypeConverter for ConnectSchemaType {
    fn name(&self) -> &'static str {
        "connectSchemaType"
    }

    fn convert(&self, ty: &Type, _entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::String
            | TypeKind::Uuid
            | TypeKind::Datetime { .. }
            | TypeKind::Array(_)
            | TypeKind::Enum(_) => "Schema.OPTIONAL_STRING_SCHEMA",
            TypeKind::Bytes | TypeKind::Decimal { .. } => "Schema.OPTIONAL_BYTES_SCHEMA",
            TypeKind::Int | TypeKind::Date | TypeKind::TimeMillis => "Schema.INT32_SCHEMA",
            TypeKind::Long
            | TypeKind::TimeMicros
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "Schema.INT64_SCHEMA",
            TypeKind::Float => "Schema.FLOAT32_SCHEMA",
            TypeKind::Double => "Schema.FLOAT64_SCHEMA",
            TypeKind::Boolean => "Schema.BOOLEAN_SCHEMA",
            TypeKind::Fixed { .. }
            | TypeKind::Record(_)
            | TypeKind::Map
            | TypeKind::Null
            | TypeKind::Union(_)
            | TypeKind::RecordClose(_) => return Err(GenError::unsupported(self.name(), ty.name())),
        };
        Ok(Token::text(token))
    }
}

/// Connect `Struct` getter for a field (`connectStructGetter`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectStructGetter;

impl TypeConverter for ConnectStructGetter {
    fn name(&self) -> &'static str {
        "connectStructGetter"
    }

    fn convert(&self, ty: &Type, _entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::String
            | TypeKind::Uuid
            | TypeKind::Datetime { .. }
            | TypeKind::Array(_)
            | TypeKind::Enum(_) => "getString",
            TypeKind::Bytes | TypeKind::Decimal { .. } => "getBytes",
            TypeKind::Int | TypeKind::Date | TypeKind::TimeMillis | TypeKind::TimeMicros => "getInt32",
            TypeKind::Long
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "getInt64",
            TypeKind::Float => "getFloat32",
            TypeKind::Double => "getFloat64",
            TypeKind::Boolean => "getBoolean",
            TypeKind::Fixed { .. }
            | TypeKind::Record(_)
            | TypeKind::Map
            | TypeKind::Null
            | TypeKind::Union(_)
            | TypeKind::RecordClose(_) => return Err(GenError::unsupported(self.name(), ty.name())),
        };
        Ok(Token::text(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_constants() {
        let store = EntityStore::new("t");
        let schema = |kind| ConnectSchemaType.convert(&Type::new(kind), &store).unwrap().to_string();
        assert_eq!(schema(TypeKind::Uuid), "Schema.OPTIONAL_STRING_SCHEMA");
        assert_eq!(schema(TypeKind::TimeMillis), "Schema.INT32_SCHEMA");
        assert_eq!(schema(TypeKind::TimeMicros), "Schema.INT64_SCHEMA");
        assert_eq!(
            schema(TypeKind::Array(Box::new(Type::new(TypeKind::Int)))),
            "Schema.OPTIONAL_STRING_SCHEMA"
        );
    }

    #[test]
    fn test_struct_getters() {
        let store = EntityStore::new("t");
        let getter = |kind| ConnectStructGetter.convert(&Type::new(kind), &store).unwrap().to_string();
        assert_eq!(getter(TypeKind::TimeMicros), "getInt32");
        assert_eq!(getter(TypeKind::LocalTimestampMicros), "getInt64");
        assert_eq!(getter(TypeKind::Double), "getFloat64");
    }

    #[test]
    fn test_records_and_fixed_rejected() {
        let store = EntityStore::new("t");
        for ty in [Type::new(TypeKind::Fixed { size: 1 }), Type::new(TypeKind::Record(crate::entity::EntityId(0)))] {
            assert!(ConnectSchemaType.convert(&ty, &store).is_err());
            assert!(ConnectStructGetter.convert(&ty, &store).is_err());
        }
    }
}
