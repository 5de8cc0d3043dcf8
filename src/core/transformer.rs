//! Flat-to-nested transformation: one validated [`RawRecord`] becomes one
//! [`StructuredRecord`]. Pure and idempotent; empty values are omitted, never
//! emitted as null.

use serde_json::{Map, Value};

use crate::core::schema::{FieldKind, Schema};
use crate::domain::model::{RawRecord, StructuredRecord};
use crate::utils::error::TransformError;

/// Converts one record. A coercion failure here means the record did not go
/// through validation first; it aborts the run.
pub fn transform(record: &RawRecord, schema: &Schema) -> Result<StructuredRecord, TransformError> {
    for (header, value) in record.iter() {
        if !header.is_empty() && !value.trim().is_empty() && !schema.contains(header) {
            return Err(TransformError::MissingRule {
                row: record.row(),
                path: header.to_string(),
            });
        }
    }

    let mut root = Map::new();
    for rule in schema.rules() {
        let raw = record.get(&rule.path).unwrap_or("").trim();
        if raw.is_empty() {
            continue;
        }
        let value = coerce(record.row(), &rule.path, raw, &rule.kind)?;
        set_nested(&mut root, record.row(), &rule.path, value)?;
    }
    Ok(StructuredRecord { fields: root })
}

pub fn transform_all(
    records: &[RawRecord],
    schema: &Schema,
) -> Result<Vec<StructuredRecord>, TransformError> {
    records
        .iter()
        .map(|record| transform(record, schema))
        .collect()
}

fn coerce(row: usize, path: &str, raw: &str, kind: &FieldKind) -> Result<Value, TransformError> {
    match kind {
        FieldKind::String { .. } | FieldKind::Enum { .. } => Ok(Value::String(raw.to_string())),
        FieldKind::Integer { .. } => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| TransformError::Coercion {
                row,
                path: path.to_string(),
                value: raw.to_string(),
                kind: "integer",
            }),
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(Value::Bool(true)),
            "false" | "no" => Ok(Value::Bool(false)),
            _ => Err(TransformError::Coercion {
                row,
                path: path.to_string(),
                value: raw.to_string(),
                kind: "boolean",
            }),
        },
        FieldKind::Array { delimiter, .. } => Ok(Value::Array(
            delimiter.split(raw).into_iter().map(Value::String).collect(),
        )),
    }
}

/// Inserts `value` at a dot-notation path, creating intermediate objects.
fn set_nested(
    root: &mut Map<String, Value>,
    row: usize,
    path: &str,
    value: Value,
) -> Result<(), TransformError> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = root;
    for part in &parts[..parts.len() - 1] {
        let entry = current
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(TransformError::PathCollision {
                    row,
                    path: path.to_string(),
                })
            }
        };
    }
    let leaf = parts[parts.len() - 1];
    if current.get(leaf).is_some_and(Value::is_object) {
        return Err(TransformError::PathCollision {
            row,
            path: path.to_string(),
        });
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}
