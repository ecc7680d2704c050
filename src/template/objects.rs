//! Template views over schemas, entities, fields and types
//!
//! Views hold an `Arc` of the frozen [`EntityStore`] plus a handle, so a
//! template can walk relations (`entity.dependencies`, `field.type.entity`)
//! without copying the model.

use minijinja::value::{from_args, Enumerator, Object, Value};
use minijinja::{Error, ErrorKind, State};
use std::fmt;
use std::sync::Arc;

use crate::entity::{Entity, EntityId, EntityStore, Field};
use crate::error::GenError;
use crate::schema::NamedSchema;
use crate::types::{Type, TypeKind};

/// Carry a core error through the template engine
pub(crate) fn template_error(err: GenError) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
}

/// Raw schema definition (`schema` in naming templates)
#[derive(Debug, Clone)]
pub struct SchemaView {
    schema: Arc<NamedSchema>,
}

impl SchemaView {
    pub fn value(schema: Arc<NamedSchema>) -> Value {
        Value::from_object(Self { schema })
    }
}

impl Object for SchemaView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let schema = &self.schema;
        Some(match key.as_str()? {
            "name" => Value::from(schema.name.as_str()),
            "namespace" => Value::from(schema.namespace_or_empty()),
            "fullname" => Value::from(schema.fullname.as_str()),
            "doc" => schema.doc.as_deref().map(Value::from).unwrap_or(Value::from(())),
            "kind" => Value::from(schema.kind().as_str()),
            "props" => Value::from_serialize(&schema.props),
            "symbols" if schema.is_enum() => Value::from(schema.symbols().to_vec()),
            _ => return None,
        })
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name", "namespace", "fullname", "doc", "kind", "props"])
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.schema.fullname)
    }
}

/// A record or enum entity of one generator
#[derive(Debug, Clone)]
pub struct EntityView {
    store: Arc<EntityStore>,
    id: EntityId,
}

impl EntityView {
    pub fn new(store: Arc<EntityStore>, id: EntityId) -> Self {
        Self { store, id }
    }

    pub fn value(store: &Arc<EntityStore>, id: EntityId) -> Value {
        Value::from_object(Self::new(Arc::clone(store), id))
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity(&self) -> &Entity {
        self.store.get(self.id)
    }

    fn list(&self, ids: &[EntityId]) -> Value {
        Value::from(
            ids.iter()
                .map(|&id| EntityView::value(&self.store, id))
                .collect::<Vec<_>>(),
        )
    }
}

impl Object for EntityView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let entity = self.entity();
        let key = key.as_str()?;
        match key {
            "namespace" => return Some(Value::from(entity.namespace())),
            "name" => return Some(Value::from(entity.name())),
            "fullname" => return Some(Value::from(entity.fullname())),
            "kind" => return Some(Value::from(entity.kind())),
            "schema" => return Some(SchemaView::value(entity.schema().clone())),
            _ => {}
        }

        match entity {
            Entity::Record(record) => Some(match key {
                "fields" => FieldView::list(&self.store, record.fields()),
                "dependencies" => self.list(record.dependencies()),
                "parents" => self.list(record.parents()),
                "owners" => self.list(record.owners()),
                "is_root" => Value::from(record.is_root()),
                "is_owner" => Value::from(record.is_owner()),
                "is_dependent" => Value::from(record.is_dependent()),
                _ => return None,
            }),
            Entity::Enum(enumeration) => Some(match key {
                "symbols" => Value::from(enumeration.symbols().to_vec()),
                "aliases" => enumeration
                    .aliases()
                    .map(|a| Value::from(a.to_vec()))
                    .unwrap_or(Value::from(())),
                _ => return None,
            }),
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        match self.entity() {
            Entity::Record(_) => Enumerator::Str(&[
                "namespace",
                "name",
                "fullname",
                "kind",
                "schema",
                "fields",
                "dependencies",
                "parents",
                "owners",
                "is_root",
                "is_owner",
                "is_dependent",
            ]),
            Entity::Enum(_) => Enumerator::Str(&[
                "namespace", "name", "fullname", "kind", "schema", "symbols", "aliases",
            ]),
        }
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match (method, self.entity()) {
            ("primary_key", Entity::Record(record)) => {
                let () = from_args(args)?;
                let field = record.primary_key().map_err(template_error)?;
                Ok(FieldView::value(&self.store, field))
            }
            ("alias", Entity::Enum(enumeration)) => {
                let (symbol,): (&str,) = from_args(args)?;
                let alias = enumeration.alias(symbol).map_err(template_error)?;
                Ok(Value::from(alias))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("{} has no method `{}`", self.entity().kind(), method),
            )),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity().fullname())
    }
}

/// A record field
#[derive(Debug, Clone)]
pub struct FieldView {
    store: Arc<EntityStore>,
    field: Field,
}

impl FieldView {
    pub fn value(store: &Arc<EntityStore>, field: &Field) -> Value {
        Value::from_object(Self {
            store: Arc::clone(store),
            field: field.clone(),
        })
    }

    pub fn list(store: &Arc<EntityStore>, fields: &[Field]) -> Value {
        Value::from(
            fields
                .iter()
                .map(|f| FieldView::value(store, f))
                .collect::<Vec<_>>(),
        )
    }

    pub fn field(&self) -> &Field {
        &self.field
    }
}

impl Object for FieldView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        Some(match key.as_str()? {
            "name" => Value::from(self.field.name.as_str()),
            "type" => TypeView::value(&self.store, &self.field.ty),
            "is_primary" => Value::from(self.field.is_primary()),
            _ => return None,
        })
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name", "type", "is_primary"])
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field.name)
    }
}

/// A resolved type; renders as its type name
#[derive(Debug, Clone)]
pub struct TypeView {
    store: Arc<EntityStore>,
    ty: Type,
}

impl TypeView {
    pub fn value(store: &Arc<EntityStore>, ty: &Type) -> Value {
        Value::from_object(Self {
            store: Arc::clone(store),
            ty: ty.clone(),
        })
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

impl Object for TypeView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        match key {
            "name" => return Some(Value::from(self.ty.name())),
            "props" => return Some(Value::from_serialize(&self.ty.props)),
            "is_primary" => return Some(Value::from(self.ty.is_primary())),
            _ => {}
        }

        match (&self.ty.kind, key) {
            (TypeKind::Array(element), "element") => Some(TypeView::value(&self.store, element)),
            (TypeKind::RecordClose(of), "of") => Some(TypeView::value(&self.store, of)),
            (TypeKind::Union(members), "members") => Some(Value::from(
                members
                    .iter()
                    .map(|m| TypeView::value(&self.store, m))
                    .collect::<Vec<_>>(),
            )),
            (TypeKind::Record(id) | TypeKind::Enum(id), "entity") => {
                Some(EntityView::value(&self.store, *id))
            }
            (TypeKind::Datetime { format }, "format") => Some(Value::from(format.as_str())),
            (TypeKind::Decimal { precision, .. }, "precision") => Some(Value::from(*precision)),
            (TypeKind::Decimal { scale, .. }, "scale") => Some(Value::from(*scale)),
            (TypeKind::Fixed { size }, "size") => Some(Value::from(*size as u64)),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name", "props", "is_primary"])
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::{id, store_for, ORDER};
    use minijinja::{context, Environment, UndefinedBehavior};

    fn render(source: &str, entity: Value) -> Result<String, Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(source, context! { entity => entity })
    }

    #[test]
    fn test_entity_attributes() {
        let store = Arc::new(store_for(ORDER).unwrap());
        let order = EntityView::value(&store, id(&store, "shop.Order"));
        let out = render(
            "{{ entity.name }}|{{ entity.is_root }}|{% for f in entity.fields %}{{ f.name }}:{{ f.type }} {% endfor %}",
            order,
        )
        .unwrap();
        assert_eq!(out, "Order|true|id:int status:enum customer:record items:array ");
    }

    #[test]
    fn test_type_navigation() {
        let store = Arc::new(store_for(ORDER).unwrap());
        let order = EntityView::value(&store, id(&store, "shop.Order"));
        let out = render(
            "{% for f in entity.fields if f.type.name == 'array' %}{{ f.type.element.entity.fullname }}{% endfor %}",
            order,
        )
        .unwrap();
        assert_eq!(out, "shop.OrderItem");
    }

    #[test]
    fn test_methods() {
        let store = Arc::new(store_for(ORDER).unwrap());
        let order = EntityView::value(&store, id(&store, "shop.Order"));
        assert_eq!(render("{{ entity.primary_key().name }}", order).unwrap(), "id");

        let status = EntityView::value(&store, id(&store, "shop.Status"));
        assert_eq!(render("{{ entity.alias('DONE') }}", status.clone()).unwrap(), "d");
        assert!(render("{{ entity.alias('NOPE') }}", status).is_err());
    }

    #[test]
    fn test_strict_missing_attribute() {
        let store = Arc::new(store_for(ORDER).unwrap());
        let status = EntityView::value(&store, id(&store, "shop.Status"));
        assert!(render("{{ entity.fields }}", status).is_err());
    }

    #[test]
    fn test_primary_key_error_surfaces_core_error() {
        let store = Arc::new(store_for(ORDER).unwrap());
        let customer = EntityView::value(&store, id(&store, "shop.Customer"));
        let err = render("{{ entity.primary_key() }}", customer).unwrap_err();
        assert_eq!(
            GenError::from_render(err).category(),
            crate::error::ErrorCategory::GraphInvariant
        );
    }
}
