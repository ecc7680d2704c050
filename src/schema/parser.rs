//! Avro JSON parser
//!
//! Builds [`NamedSchema`] definitions into a registry shared by every
//! source of a run. References to named types may point forward or into
//! another file; they are checked once all sources are parsed.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::{FieldDef, NamedBody, NamedSchema, Properties, RawSchema, SchemaBody, SchemaSet};
use crate::error::{GenError, Result};

/// Attributes with Avro meaning on type nodes; everything else is a property
const RESERVED_TYPE_ATTRS: &[&str] = &[
    "type",
    "name",
    "namespace",
    "fields",
    "symbols",
    "items",
    "values",
    "size",
    "doc",
    "aliases",
    "default",
    "logicalType",
];

/// Attributes with Avro meaning on record fields
const RESERVED_FIELD_ATTRS: &[&str] = &["name", "type", "doc", "default", "order", "aliases"];

/// Parser with named type resolution context
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Named types by fullname, in definition order
    named: IndexMap<String, Arc<NamedSchema>>,
    /// Fullnames declared at the top level of each source
    top_level: Vec<String>,
    /// Enclosing namespace for unqualified names
    namespace: Option<String>,
    /// Source currently being parsed, for diagnostics
    location: String,
    /// Unresolved references: (fullname, location)
    pending: Vec<(String, String)>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one JSON source and return the fullnames it declares at top level.
    ///
    /// A top-level union declares each of its members.
    pub fn parse_source(&mut self, json: &str, origin: &str) -> Result<Vec<String>> {
        self.location = origin.to_string();
        self.namespace = None;

        let value: Value = serde_json::from_str(json)
            .map_err(|e| GenError::schema(origin, format!("invalid JSON: {}", e)))?;

        let members: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut declared = Vec::with_capacity(members.len());
        for member in members {
            let schema = self.parse(member)?;
            let fullname = schema.named().ok_or_else(|| {
                GenError::schema(origin, "top-level schema must be a named record, enum or fixed")
            })?;
            declared.push(fullname.to_string());
        }

        debug!("Parsed {} top-level definitions from {}", declared.len(), origin);
        self.top_level.extend(declared.iter().cloned());
        Ok(declared)
    }

    /// Check every reference and hand over the collected definitions
    pub fn finish(self) -> Result<SchemaSet> {
        for (fullname, location) in &self.pending {
            if !self.named.contains_key(fullname) {
                return Err(GenError::schema(
                    location.clone(),
                    format!("undefined type `{}`", fullname),
                ));
            }
        }

        let mut top_level = Vec::with_capacity(self.top_level.len());
        for fullname in self.top_level {
            if !top_level.contains(&fullname) {
                top_level.push(fullname);
            }
        }

        Ok(SchemaSet {
            named: self.named,
            top_level,
            sources: Vec::new(),
            bundle_hash: String::new(),
        })
    }

    /// Parse any JSON schema node
    pub fn parse(&mut self, value: &Value) -> Result<RawSchema> {
        match value {
            Value::String(name) => self.parse_string_schema(name),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(members) => {
                let members = members
                    .iter()
                    .map(|member| self.parse(member))
                    .collect::<Result<Vec<_>>>()?;
                Ok(RawSchema::new(SchemaBody::Union(members)))
            }
            other => Err(self.error(format!(
                "expected string, object or array schema, found {}",
                other
            ))),
        }
    }

    fn parse_string_schema(&mut self, name: &str) -> Result<RawSchema> {
        let body = match primitive(name) {
            Some(body) => body,
            None => SchemaBody::Named(self.reference(name)),
        };
        Ok(RawSchema::new(body))
    }

    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<RawSchema> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| self.error("missing 'type' attribute"))?;
        let logical_type = obj
            .get("logicalType")
            .and_then(Value::as_str)
            .map(String::from);

        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} or {"type": [...]}: annotate the nested schema
            nested => {
                let mut schema = self.parse(nested)?;
                schema.props.extend(extra_props(obj, RESERVED_TYPE_ATTRS));
                if logical_type.is_some() {
                    schema.logical_type = logical_type;
                }
                return Ok(schema);
            }
        };

        let body = match type_name {
            "record" | "error" | "enum" | "fixed" => return self.parse_named(obj, type_name),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| self.error("array missing 'items'"))?;
                SchemaBody::Array(Box::new(self.parse(items)?))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| self.error("map missing 'values'"))?;
                SchemaBody::Map(Box::new(self.parse(values)?))
            }
            other => match primitive(other) {
                Some(body) => body,
                None => SchemaBody::Named(self.reference(other)),
            },
        };

        Ok(RawSchema {
            body,
            logical_type,
            props: extra_props(obj, RESERVED_TYPE_ATTRS),
        })
    }

    fn parse_named(&mut self, obj: &Map<String, Value>, type_name: &str) -> Result<RawSchema> {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.error(format!("{} missing 'name'", type_name)))?;
        let explicit_namespace = obj.get("namespace").and_then(Value::as_str);

        let fullname = self.qualify(name, explicit_namespace);
        if self.named.contains_key(&fullname) {
            return Err(self.error(format!("can't redefine `{}`", fullname)));
        }

        let (namespace, short_name) = match fullname.rsplit_once('.') {
            Some((ns, short)) => (Some(ns.to_string()), short.to_string()),
            None => (None, fullname.clone()),
        };

        // Nested definitions inherit this type's namespace
        let previous = std::mem::replace(&mut self.namespace, namespace.clone());
        let body = self.parse_named_body(obj, type_name, &fullname);
        self.namespace = previous;

        let schema = NamedSchema {
            fullname: fullname.clone(),
            name: short_name,
            namespace,
            doc: obj.get("doc").and_then(Value::as_str).map(String::from),
            aliases: string_list(obj.get("aliases")),
            logical_type: obj
                .get("logicalType")
                .and_then(Value::as_str)
                .map(String::from),
            props: extra_props(obj, RESERVED_TYPE_ATTRS),
            body: body?,
        };

        debug!("Registered {} `{}`", type_name, fullname);
        self.named.insert(fullname.clone(), Arc::new(schema));
        Ok(RawSchema::new(SchemaBody::Named(fullname)))
    }

    fn parse_named_body(
        &mut self,
        obj: &Map<String, Value>,
        type_name: &str,
        fullname: &str,
    ) -> Result<NamedBody> {
        match type_name {
            "enum" => {
                let symbols = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| self.error(format!("enum `{}` missing 'symbols'", fullname)))?;
                let symbols = symbols
                    .iter()
                    .map(|s| {
                        s.as_str().map(String::from).ok_or_else(|| {
                            self.error(format!("enum `{}` has a non-string symbol", fullname))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(NamedBody::Enum { symbols })
            }
            "fixed" => {
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| self.error(format!("fixed `{}` missing 'size'", fullname)))?;
                let size = usize::try_from(size)
                    .map_err(|_| self.error(format!("fixed `{}` size {} is out of range", fullname, size)))?;
                Ok(NamedBody::Fixed { size })
            }
            _ => {
                let fields = obj
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| self.error(format!("record `{}` missing 'fields'", fullname)))?;
                let fields = fields
                    .iter()
                    .map(|field| self.parse_field(field, fullname))
                    .collect::<Result<Vec<_>>>()?;
                Ok(NamedBody::Record { fields })
            }
        }
    }

    fn parse_field(&mut self, value: &Value, record: &str) -> Result<FieldDef> {
        let obj = value
            .as_object()
            .ok_or_else(|| self.error(format!("field of `{}` must be an object", record)))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.error(format!("field of `{}` missing 'name'", record)))?;
        let type_value = obj
            .get("type")
            .ok_or_else(|| self.error(format!("field `{}.{}` missing 'type'", record, name)))?;

        Ok(FieldDef {
            name: name.to_string(),
            doc: obj.get("doc").and_then(Value::as_str).map(String::from),
            schema: self.parse(type_value)?,
            default: obj.get("default").cloned(),
            props: extra_props(obj, RESERVED_FIELD_ATTRS),
        })
    }

    /// Fullname for a declared name
    fn qualify(&self, name: &str, explicit_namespace: Option<&str>) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        match explicit_namespace.or(self.namespace.as_deref()) {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
            _ => name.to_string(),
        }
    }

    /// Fullname for a referenced name; unknown names are checked in [`finish`](Self::finish)
    fn reference(&mut self, name: &str) -> String {
        let qualified = self.qualify(name, None);
        if self.named.contains_key(&qualified) {
            return qualified;
        }
        if self.named.contains_key(name) {
            return name.to_string();
        }
        self.pending.push((qualified.clone(), self.location.clone()));
        qualified
    }

    fn error(&self, message: impl Into<String>) -> GenError {
        GenError::schema(self.location.clone(), message)
    }
}

fn primitive(name: &str) -> Option<SchemaBody> {
    Some(match name {
        "null" => SchemaBody::Null,
        "boolean" => SchemaBody::Boolean,
        "int" => SchemaBody::Int,
        "long" => SchemaBody::Long,
        "float" => SchemaBody::Float,
        "double" => SchemaBody::Double,
        "bytes" => SchemaBody::Bytes,
        "string" => SchemaBody::String,
        _ => return None,
    })
}

fn extra_props(obj: &Map<String, Value>, reserved: &[&str]) -> Properties {
    obj.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
