//! Liquibase column types

use super::{Token, TypeConverter};
use crate::entity::EntityStore;
use crate::error::{GenError, Result};
use crate::types::{Type, TypeKind};

/// Liquibase column type for a field (`liquidBaseType`)
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquibaseType;

impl TypeConverter for LiquibaseType {
    fn name(&self) -> &'static str {
        "liquidBaseType"
    }

    fn convert(&self, ty: &Type, _entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::Uuid => "uuid".to_string(),
            TypeKind::Datetime { .. } => "datetime".to_string(),
            TypeKind::String | TypeKind::Array(_) | TypeKind::Enum(_) => "varchar2(255)".to_string(),
            TypeKind::Decimal { precision, scale } => format!("decimal({},{})", precision, scale),
            TypeKind::Bytes => "blob".to_string(),
            TypeKind::Date => "date".to_string(),
            TypeKind::Int | TypeKind::TimeMillis => "int".to_string(),
            TypeKind::Long
            | TypeKind::TimeMicros
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "bigint".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Fixed { .. }
            | TypeKind::Record(_)
            | TypeKind::Map
            | TypeKind::Null
            | TypeKind::Union(_)
            | TypeKind::RecordClose(_) => return Err(GenError::unsupported(self.name(), ty.name())),
        };
        Ok(Token::Text(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_types() {
        let store = EntityStore::new("t");
        let column = |kind| LiquibaseType.convert(&Type::new(kind), &store).unwrap().to_string();
        assert_eq!(column(TypeKind::Decimal { precision: 10, scale: 2 }), "decimal(10,2)");
        assert_eq!(column(TypeKind::String), "varchar2(255)");
        assert_eq!(column(TypeKind::TimeMicros), "bigint");
        assert_eq!(column(TypeKind::TimeMillis), "int");
        assert_eq!(column(TypeKind::Bytes), "blob");
    }
}
