//! Per-node classification and declaration synthesis.
//!
//! Everything here looks at a single schema node and never at the walk state;
//! memoized record names are layered on top by the walker.
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{display_path, Result, SchemaError};
use crate::ir::{FieldKind, FieldSpec};

const STRING: &str = "string";
const KNOWN_SCALARS: [&str; 3] = ["string", "integer", "float"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType<'a> {
    Object,
    Array,
    Scalar(&'a str),
}

/// Reads the `type` of a field value.
///
/// `null` values, a missing `type` and `"type": null` all read as `string`,
/// and so do the empty type name and any unrecognized type name.
pub fn node_type<'a>(value: &'a Value, path: &str) -> Result<NodeType<'a>> {
    let map = match value {
        Value::Null => return Ok(NodeType::Scalar(STRING)),
        Value::Object(map) => map,
        other => {
            return Err(SchemaError::malformed(
                path,
                format!("expected a schema object, found {}", json_kind(other)),
            ));
        }
    };
    match map.get("type") {
        None | Some(Value::Null) => Ok(NodeType::Scalar(STRING)),
        Some(Value::String(t)) => Ok(match t.as_str() {
            "object" => NodeType::Object,
            "array" => NodeType::Array,
            "" => NodeType::Scalar(STRING),
            known if KNOWN_SCALARS.contains(&known) => NodeType::Scalar(known),
            other => {
                warn!(path = %display_path(path), ty = other, "unrecognized type, reading as string");
                NodeType::Scalar(STRING)
            }
        }),
        Some(other) => Err(SchemaError::malformed(
            path,
            format!("`type` must be a string, found {}", json_kind(other)),
        )),
    }
}

/// Element schema of an `array` node: the first entry of its `properties`
/// sequence, or its `items` when `properties` is absent.
pub fn element_schema<'a>(value: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let Some(map) = value.as_object() else { return Ok(None) };
    match map.get("properties") {
        Some(Value::Array(xs)) => return Ok(xs.first()),
        None | Some(Value::Null) => {}
        Some(other) => {
            return Err(SchemaError::malformed(
                path,
                format!("array `properties` must be a sequence, found {}", json_kind(other)),
            ));
        }
    }
    match map.get("items") {
        Some(Value::Array(xs)) => Ok(xs.first()),
        Some(items @ Value::Object(_)) => Ok(Some(items)),
        None | Some(Value::Null) => Ok(None),
        Some(other) => Err(SchemaError::malformed(
            path,
            format!("array `items` must be a schema or a sequence, found {}", json_kind(other)),
        )),
    }
}

/// Scalars and (possibly nested) lists of scalars are elementary.
/// An array without an element schema is a list of strings.
pub fn is_elementary_schema(value: &Value, path: &str) -> Result<bool> {
    match node_type(value, path)? {
        NodeType::Scalar(_) => Ok(true),
        NodeType::Object => Ok(false),
        NodeType::Array => match element_schema(value, path)? {
            None => Ok(true),
            Some(el) => is_elementary_schema(el, &element_path(path)),
        },
    }
}

/// Scalar name carried by an elementary schema, descending through arrays.
fn elementary_kind<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    match node_type(value, path)? {
        NodeType::Scalar(t) => Ok(t),
        NodeType::Array => match element_schema(value, path)? {
            None => Ok(STRING),
            Some(el) => elementary_kind(el, &element_path(path)),
        },
        NodeType::Object => Err(SchemaError::malformed(path, "object where a scalar was expected")),
    }
}

/// Builds the declaration a field contributes to its parent record.
///
/// | type                      | kind              |
/// |---------------------------|-------------------|
/// | array of elementary       | element's scalar, list |
/// | array without element     | `string`, list    |
/// | array otherwise           | `key`, list       |
/// | object                    | `key`             |
/// | string / integer / float  | the type itself   |
/// | anything else             | `string`          |
pub fn declare(key: &str, value: &Value, path: &str) -> Result<FieldSpec> {
    Ok(match node_type(value, path)? {
        NodeType::Scalar(t) => FieldSpec::new(key, FieldKind::scalar(t)),
        NodeType::Object => FieldSpec::new(key, FieldKind::record(key)),
        NodeType::Array => match element_schema(value, path)? {
            None => FieldSpec::list(key, FieldKind::scalar(STRING)),
            Some(el) => {
                let el_path = element_path(path);
                if is_elementary_schema(el, &el_path)? {
                    FieldSpec::list(key, FieldKind::scalar(elementary_kind(el, &el_path)?))
                } else {
                    FieldSpec::list(key, FieldKind::record(key))
                }
            }
        },
    })
}

/// Property mapping a compound field decomposes into: the element's
/// `properties` for arrays, the node's own `properties` otherwise.
pub fn inner_properties<'a>(key: &str, value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    match node_type(value, path)? {
        NodeType::Object => match value.get("properties") {
            Some(Value::Object(props)) => Ok(props),
            _ => Err(SchemaError::MissingProperties {
                field: key.to_string(),
                path: display_path(path),
            }),
        },
        NodeType::Array => {
            let el_path = element_path(path);
            match element_schema(value, path)? {
                Some(el) => match node_type(el, &el_path)? {
                    NodeType::Object => inner_properties(key, el, &el_path),
                    NodeType::Array => Err(SchemaError::malformed(
                        &el_path,
                        "arrays of arrays of objects are not supported",
                    )),
                    NodeType::Scalar(_) => Err(SchemaError::malformed(
                        &el_path,
                        "scalar element has no properties",
                    )),
                },
                None => Err(SchemaError::MissingProperties {
                    field: key.to_string(),
                    path: display_path(path),
                }),
            }
        }
        NodeType::Scalar(_) => Err(SchemaError::malformed(path, "scalar field has no properties")),
    }
}

pub(crate) fn element_path(path: &str) -> String {
    format!("{path}/0")
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
