//! Java field types

use super::{Token, TypeConverter};
use crate::entity::EntityStore;
use crate::error::{GenError, Result};
use crate::types::{Type, TypeKind};

/// Java type of a POJO field (`javaType`)
///
/// Collections use `java.util.List`, so arrays of unboxed numeric or boolean
/// elements are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaType;

impl TypeConverter for JavaType {
    fn name(&self) -> &'static str {
        "javaType"
    }

    fn convert(&self, ty: &Type, entities: &EntityStore) -> Result<Token> {
        let token = match &ty.kind {
            TypeKind::String | TypeKind::Uuid | TypeKind::Datetime { .. } => "String".to_string(),
            TypeKind::Bytes | TypeKind::Decimal { .. } => "byte[]".to_string(),
            TypeKind::Int | TypeKind::Date | TypeKind::TimeMillis | TypeKind::TimeMicros => "int".to_string(),
            TypeKind::Long
            | TypeKind::TimestampMillis
            | TypeKind::TimestampMicros
            | TypeKind::LocalTimestampMillis
            | TypeKind::LocalTimestampMicros => "long".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Array(element) => {
                if is_unboxed(element) {
                    return Err(GenError::unsupported(
                        self.name(),
                        &format!("collection with primitive type {}", element.name()),
                    ));
                }
                format!("java.util.List<{}>", self.convert(element, entities)?)
            }
            TypeKind::Record(id) | TypeKind::Enum(id) => entities.get(*id).name().to_string(),
            TypeKind::Fixed { .. }
            | TypeKind::Map
            | TypeKind::Null
            | TypeKind::Union(_)
            | TypeKind::RecordClose(_) => return Err(GenError::unsupported(self.name(), ty.name())),
        };
        Ok(Token::Text(token))
    }
}

fn is_unboxed(ty: &Type) -> bool {
    matches!(
        ty.kind,
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
            | TypeKind::Boolean
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::{id, store_for, ORDER};
    use crate::error::ErrorCategory;

    #[test]
    fn test_java_tokens() {
        let store = store_for(ORDER).unwrap();
        let java = |kind| JavaType.convert(&Type::new(kind), &store).unwrap().to_string();
        assert_eq!(java(TypeKind::Datetime { format: "x".to_string() }), "String");
        assert_eq!(java(TypeKind::Decimal { precision: 1, scale: 0 }), "byte[]");
        assert_eq!(java(TypeKind::TimestampMicros), "long");
        assert_eq!(java(TypeKind::Boolean), "boolean");
        assert_eq!(java(TypeKind::Enum(id(&store, "shop.Status"))), "Status");
        assert_eq!(
            java(TypeKind::Array(Box::new(Type::new(TypeKind::Record(id(&store, "shop.OrderItem")))))),
            "java.util.List<OrderItem>"
        );
        assert_eq!(
            java(TypeKind::Array(Box::new(Type::new(TypeKind::String)))),
            "java.util.List<String>"
        );
    }

    #[test]
    fn test_java_rejects_primitive_collections_and_fixed() {
        let store = EntityStore::new("t");
        let err = JavaType
            .convert(&Type::new(TypeKind::Array(Box::new(Type::new(TypeKind::Long)))), &store)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedType);
        assert!(err.to_string().contains("collection with primitive type long"));

        let err = JavaType
            .convert(&Type::new(TypeKind::Fixed { size: 2 }), &store)
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported Avro type: fixed"));
    }
}
