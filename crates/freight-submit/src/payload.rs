//! Shapes one upload record into the API's nested request body.

use serde_json::{Map, Number, Value};

use freight_model::{FieldMapping, UploadRecord};
use freight_schema::{self as schema, FieldType};

/// Builds the JSON request body for one record.
///
/// Dotted target paths expand into nested objects, numeric segments into
/// array indices: `load.pickups.0.address.city` becomes
/// `{"load":{"pickups":[{"address":{"city":…}}]}}`. Empty source values
/// are omitted rather than sent as empty strings; values are typed per
/// the registry (numbers as JSON numbers, enums canonicalized).
///
/// # Panics
///
/// Panics when a mapping names a target path outside the schema registry,
/// which confirmed mappings cannot do.
pub fn build_payload(mappings: &[FieldMapping], record: &UploadRecord) -> Value {
    let mut root = Value::Object(Map::new());
    for mapping in mappings {
        let Some(raw) = record.get_trimmed(&mapping.source_column) else {
            continue;
        };
        let value = typed_value(&mapping.target_path, raw);
        insert_path(&mut root, &mapping.target_path, value);
    }
    root
}

fn typed_value(path: &str, raw: &str) -> Value {
    match schema::field_type(path) {
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(raw.to_string()), Value::Number),
        FieldType::Enum => schema::canonicalize_enum(path, raw)
            .map_or_else(|| Value::String(raw.to_string()), |v| Value::String(v.to_string())),
        FieldType::Text | FieldType::Date => Value::String(raw.to_string()),
    }
}

fn insert_path(root: &mut Value, path: &str, value: Value) {
    let mut current = root;
    for segment in path.split('.') {
        current = slot_for(current, segment);
    }
    *current = value;
}

/// Descends one path segment, materializing the container it implies.
fn slot_for<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Ok(index) = segment.parse::<usize>() {
        if !current.is_array() {
            *current = Value::Array(Vec::new());
        }
        let array = current.as_array_mut().expect("array ensured above");
        while array.len() <= index {
            array.push(Value::Null);
        }
        &mut array[index]
    } else {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current
            .as_object_mut()
            .expect("object ensured above")
            .entry(segment.to_string())
            .or_insert(Value::Null)
    }
}
