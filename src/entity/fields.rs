//! Field flattening
//!
//! Nested (non-array) record fields expanded into one list, with names
//! prefixed by the path of enclosing field names:
//! - [`flatten_fields`]: leaf fields only
//! - [`flatten_records`]: nested record fields only
//! - [`flatten_fields_with_records`]: leaves bracketed by record open/close markers

use super::{EntityId, EntityStore, Field};
use crate::error::{GenError, Result};
use crate::types::{Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Leaves,
    Records,
    Bracketed,
}

/// Leaf fields of `record`, descending into record-typed fields
pub fn flatten_fields(store: &EntityStore, record: EntityId, joiner: &str) -> Result<Vec<Field>> {
    walk(store, record, joiner, Mode::Leaves)
}

/// Record-typed fields of `record`, recursively
pub fn flatten_records(store: &EntityStore, record: EntityId, joiner: &str) -> Result<Vec<Field>> {
    walk(store, record, joiner, Mode::Records)
}

/// Leaf fields, each nested record opened by its field and closed by a `RecordClose` field
pub fn flatten_fields_with_records(
    store: &EntityStore,
    record: EntityId,
    joiner: &str,
) -> Result<Vec<Field>> {
    walk(store, record, joiner, Mode::Bracketed)
}

fn walk(store: &EntityStore, record: EntityId, joiner: &str, mode: Mode) -> Result<Vec<Field>> {
    let mut out = Vec::new();
    let mut path = vec![record];
    descend(store, record, "", joiner, mode, &mut path, &mut out)?;
    Ok(out)
}

fn descend(
    store: &EntityStore,
    record: EntityId,
    prefix: &str,
    joiner: &str,
    mode: Mode,
    path: &mut Vec<EntityId>,
    out: &mut Vec<Field>,
) -> Result<()> {
    let Some(entity) = store.record(record) else {
        return Ok(());
    };

    for field in entity.fields() {
        let name = format!("{}{}", prefix, field.name);
        let Some(nested) = field.ty.record() else {
            if mode != Mode::Records {
                out.push(Field::new(name, field.ty.clone()));
            }
            continue;
        };

        if path.contains(&nested) {
            return Err(GenError::schema(
                format!("{}.{}", entity.schema.fullname, field.name),
                "record nests itself and can't be flattened",
            ));
        }

        if mode != Mode::Leaves {
            out.push(Field::new(name.clone(), field.ty.clone()));
        }
        path.push(nested);
        descend(store, nested, &format!("{}{}", name, joiner), joiner, mode, path, out)?;
        path.pop();
        if mode == Mode::Bracketed {
            out.push(Field::new(
                name,
                Type::new(TypeKind::RecordClose(Box::new(field.ty.clone()))),
            ));
        }
    }
    Ok(())
}
