//! Template filters
//!
//! Thin adapters from template values to the typed core API. A filter
//! applied to a value it does not understand returns the value unchanged.

use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::objects::{template_error, EntityView, FieldView, TypeView};
use crate::convert::{ConverterSet, Token, TypeConverter};
use crate::entity::{self, EntityId, EntityStore, Field};
use crate::generator::Registry;

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("valid regex"));
static UNDERSCORED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.)").expect("valid regex"));

const DEFAULT_JOINER: &str = "_";

/// Register every filter on `env`.
///
/// `registry` is the snapshot of generators completed so far, used by `from`.
pub fn register_filters(env: &mut Environment<'static>, converters: &ConverterSet, registry: Registry) {
    env.add_filter("toSnakeCase", |value: String| to_snake_case(&value));
    env.add_filter("toCamelCase", |value: String| to_camel_case(&value));

    env.add_filter("dependenciesRecursiveAll", |value: Value| {
        map_record(value, entity::dependencies_all)
    });
    env.add_filter("dependenciesRecursiveUpToClosestDependent", |value: Value| {
        map_record(value, entity::dependencies_up_to_closest_dependent)
    });
    env.add_filter("dependenciesRecursiveToClosestDependent", |value: Value| {
        map_record(value, entity::dependencies_to_closest_dependent)
    });

    env.add_filter("flattenFields", |value: Value, joiner: Option<String>| {
        flatten_with(value, joiner, entity::flatten_fields)
    });
    env.add_filter("flattenRecords", |value: Value, joiner: Option<String>| {
        flatten_with(value, joiner, entity::flatten_records)
    });
    env.add_filter("flattenFieldsWithRecords", |value: Value, joiner: Option<String>| {
        flatten_with(value, joiner, entity::flatten_fields_with_records)
    });

    env.add_filter("enums", |value: Value| {
        filter_list(value, |item| {
            item.downcast_object_ref::<EntityView>()
                .map(|view| view.entity().as_enum().is_some())
                .unwrap_or(false)
        })
    });
    env.add_filter("recordLists", |value: Value| {
        filter_list(value, |item| is_record_list(item).unwrap_or(false))
    });
    env.add_filter("noRecordLists", |value: Value| {
        filter_list(value, |item| !is_record_list(item).unwrap_or(true))
    });

    env.add_filter("from", move |value: Value, generator: String| {
        let Some(view) = value.downcast_object_ref::<EntityView>() else {
            return Ok(value);
        };
        let fullname = &view.entity().schema().fullname;
        let (store, id) = registry
            .lookup(&generator, fullname)
            .map_err(template_error)?;
        Ok(EntityView::value(&store, id))
    });

    for converter in converters.iter() {
        let converter = Arc::clone(converter);
        env.add_filter(converter.name(), move |value: Value| {
            apply_converter(converter.as_ref(), value)
        });
    }
}

/// `OrderItem` -> `order_item`
pub fn to_snake_case(value: &str) -> String {
    UPPERCASE
        .replace_all(value, |caps: &regex::Captures| {
            let m = &caps[0];
            if caps.get(0).map(|c| c.start()) == Some(0) {
                m.to_lowercase()
            } else {
                format!("_{}", m.to_lowercase())
            }
        })
        .into_owned()
}

/// `order_item` -> `orderItem`
pub fn to_camel_case(value: &str) -> String {
    let joined = UNDERSCORED.replace_all(value, |caps: &regex::Captures| caps[1].to_uppercase());
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn map_record(value: Value, closure: fn(&EntityStore, EntityId) -> Vec<EntityId>) -> Result<Value, Error> {
    let Some(view) = value.downcast_object_ref::<EntityView>() else {
        return Ok(value);
    };
    if view.entity().as_record().is_none() {
        return Ok(value);
    }
    let ids = closure(view.store(), view.id());
    Ok(Value::from(
        ids.into_iter()
            .map(|id| EntityView::value(view.store(), id))
            .collect::<Vec<_>>(),
    ))
}

fn flatten_with(
    value: Value,
    joiner: Option<String>,
    flatten: fn(&EntityStore, EntityId, &str) -> crate::Result<Vec<Field>>,
) -> Result<Value, Error> {
    let Some(view) = value.downcast_object_ref::<EntityView>() else {
        return Ok(value);
    };
    if view.entity().as_record().is_none() {
        return Ok(value);
    }
    let joiner = joiner.as_deref().unwrap_or(DEFAULT_JOINER);
    let fields = flatten(view.store(), view.id(), joiner).map_err(template_error)?;
    Ok(FieldView::list(view.store(), &fields))
}

fn filter_list(value: Value, keep: impl Fn(&Value) -> bool) -> Result<Value, Error> {
    if value.kind() != ValueKind::Seq {
        return Ok(value);
    }
    let items = value
        .try_iter()?
        .filter(|item| keep(item))
        .collect::<Vec<_>>();
    Ok(Value::from(items))
}

fn is_record_list(item: &Value) -> Option<bool> {
    item.downcast_object_ref::<FieldView>()
        .map(|view| view.field().ty.is_record_list())
}

fn apply_converter(converter: &dyn TypeConverter, value: Value) -> Result<Value, Error> {
    let Some(view) = value.downcast_object_ref::<TypeView>() else {
        return Ok(value);
    };
    let token = converter
        .convert(view.ty(), view.store())
        .map_err(template_error)?;
    Ok(match token {
        Token::Text(text) => Value::from(text),
        Token::Flag(flag) => Value::from(flag),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::{id, store_for, ORDER};
    use crate::error::{ErrorCategory, GenError};
    use minijinja::{context, UndefinedBehavior};

    fn env_with(registry: Registry) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        register_filters(&mut env, &ConverterSet::builtin(), registry);
        env
    }

    fn order_view() -> (Arc<EntityStore>, Value) {
        let store = Arc::new(store_for(ORDER).unwrap());
        let order = EntityView::value(&store, id(&store, "shop.Order"));
        (store, order)
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(to_snake_case("OrderItem"), "order_item");
        assert_eq!(to_snake_case("orderItemId"), "order_item_id");
        assert_eq!(to_snake_case("ID"), "i_d");
        assert_eq!(to_camel_case("order_item_id"), "orderItemId");
        assert_eq!(to_camel_case("Order_item"), "orderItem");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_closure_filters() {
        let (_, order) = order_view();
        let env = env_with(Registry::new());
        let out = env
            .render_str(
                "{{ entity|dependenciesRecursiveUpToClosestDependent|join(',') }}/{{ entity|dependenciesRecursiveToClosestDependent|join(',') }}/{{ entity|dependenciesRecursiveToClosestDependent|enums|join(',') }}",
                context! { entity => order },
            )
            .unwrap();
        assert_eq!(out, "shop.Status/shop.Status,shop.OrderItem/shop.Status");
    }

    #[test]
    fn test_flatten_and_list_filters() {
        let (_, order) = order_view();
        let env = env_with(Registry::new());
        let out = env
            .render_str(
                "{{ entity|flattenFields('.')|noRecordLists|join(',') }}|{{ entity.fields|recordLists|join(',') }}",
                context! { entity => order },
            )
            .unwrap();
        assert_eq!(out, "id,status,customer.name,customer.address.city|items");
    }

    #[test]
    fn test_converter_filters() {
        let (_, order) = order_view();
        let env = env_with(Registry::new());
        let out = env
            .render_str(
                "{% for f in entity.fields %}{{ f.type|fbType }} {{ f.type|fbIsPrimitive }};{% endfor %}",
                context! { entity => order },
            )
            .unwrap();
        assert_eq!(
            out,
            "int true;shop.Status false;shop.Customer false;[shop.OrderItem] false;"
        );
    }

    #[test]
    fn test_converter_error_is_unsupported_type() {
        let store = Arc::new(
            store_for(r#"{"type": "record", "name": "u.R", "fields": [{"name": "m", "type": {"type": "map", "values": "int"}}]}"#)
                .unwrap(),
        );
        let record = EntityView::value(&store, id(&store, "u.R"));
        let env = env_with(Registry::new());
        let err = env
            .render_str("{{ entity.fields[0].type|javaType }}", context! { entity => record })
            .unwrap_err();
        let err = GenError::from_render(err);
        assert_eq!(err.category(), ErrorCategory::UnsupportedType);
        assert!(err.to_string().contains("map"));
    }

    #[test]
    fn test_from_filter() {
        let (store, order) = order_view();
        let mut registry = Registry::new();
        registry.publish("base", Arc::clone(&store)).unwrap();
        let env = env_with(registry);

        let out = env
            .render_str("{{ (entity|from('base')).fullname }}", context! { entity => order.clone() })
            .unwrap();
        assert_eq!(out, "shop.Order");

        let err = env
            .render_str("{{ entity|from('missing') }}", context! { entity => order })
            .unwrap_err();
        let err = GenError::from_render(err);
        assert!(matches!(err, GenError::UnknownGenerator { ref available, .. } if available == "base"));
    }

    #[test]
    fn test_filters_pass_through_foreign_values() {
        let env = env_with(Registry::new());
        let out = env
            .render_str("{{ 'x'|fbType }}{{ 'y'|dependenciesRecursiveAll }}", context! {})
            .unwrap();
        assert_eq!(out, "xy");
    }
}
