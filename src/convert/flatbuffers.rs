//! FlatBuffers schema types, builder factories and scalar detection

use super::{Token, TypeConverter};
use crate::entity::EntityStore;
use crate::error::{GenError, Result};
use crate::types::{Type, TypeKind};

/// FlatBuffers schema type (`fbType`)
#[derive(Debug, Clone, Copy, Default)]
pub struct FbType;

impl TypeConverter for FbType {
    fn name(&self) -> &'static str {
        "fbType"
    }

    fn convert(&self, ty: &Type, entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::String | TypeKind::Uuid | TypeKind::Datetime { .. } => "string".to_string(),
            TypeKind::Bytes | TypeKind::Decimal { .. } => "[byte]".to_string(),
            TypeKind::Int | TypeKind::Date | TypeKind::TimeMillis => "int".to_string(),
            TypeKind::Long
            | TypeKind::TimeMicros
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "long".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::Boolean => "bool".to_string(),
            TypeKind::Fixed { size } => format!("[byte:{}]", size),
            TypeKind::Array(element) => format!("[{}]", self.convert(element, entities)?),
            TypeKind::Record(id) | TypeKind::Enum(id) => entities.get(*id).fullname().to_string(),
            TypeKind::Map | TypeKind::Null | TypeKind::Union(_) | TypeKind::RecordClose(_) => {
                return Err(GenError::unsupported(self.name(), ty.name()))
            }
        };
        Ok(Token::Text(token))
    }
}

/// FlatBuffers builder call for a field (`fbFactory`)
#[derive(Debug, Clone, Copy, Default)]
pub struct FbFactory;

impl TypeConverter for FbFactory {
    fn name(&self) -> &'static str {
        "fbFactory"
    }

    fn convert(&self, ty: &Type, _entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::String | TypeKind::Uuid | TypeKind::Datetime { .. } => "String",
            TypeKind::Bytes | TypeKind::Decimal { .. } | TypeKind::Fixed { .. } | TypeKind::Array(_) => {
                "CreateArray"
            }
            TypeKind::Int | TypeKind::Date | TypeKind::TimeMillis | TypeKind::TimeMicros => "int",
            TypeKind::Long
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "long",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Boolean => "bool",
            TypeKind::Record(_) => "CreateRecord",
            TypeKind::Enum(_) => "CreateEnum",
            TypeKind::Map | TypeKind::Null | TypeKind::Union(_) | TypeKind::RecordClose(_) => {
                return Err(GenError::unsupported(self.name(), ty.name()))
            }
        };
        Ok(Token::text(token))
    }
}

/// Whether the field is stored inline as a FlatBuffers scalar (`fbIsPrimitive`)
#[derive(Debug, Clone, Copy, Default)]
pub struct FbIsPrimitive;

impl TypeConverter for FbIsPrimitive {
    fn name(&self) -> &'static str {
        "fbIsPrimitive"
    }

    fn convert(&self, ty: &Type, _entities: &EntityStore) -> Result<Token> {
        let scalar = match &ty.kind {
            TypeKind::String
            | TypeKind::Uuid
            | TypeKind::Datetime { .. }
            | TypeKind::Bytes
            | TypeKind::Decimal { .. }
            | TypeKind::Fixed { .. }
            | TypeKind::Array(_)
            | TypeKind::Record(_)
            | TypeKind::Enum(_)
            | TypeKind::RecordClose(_) => false,
            TypeKind::Int
            | TypeKind::Date
            | TypeKind::TimeMillis
            | TypeKind::TimeMicros
            | TypeKind::Long
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros
            | TypeKind::Float
            | TypeKind::Double
            | TypeKind::Boolean => true,
            TypeKind::Map | TypeKind::Null | TypeKind::Union(_) => {
                return Err(GenError::unsupported(self.name(), ty.name()))
            }
        };
        Ok(Token::Flag(scalar))
    }
}
