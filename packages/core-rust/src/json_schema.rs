//! Export of an inferred [`SchemaSet`] as a draft-07 JSON Schema for the
//! `geo_meta` object.

use serde_json::{json, Map, Value};

use crate::inference::{FieldSchema, FieldType, SchemaSet};
use crate::known::{LINE_COLORS, LINE_NUMBERS, LINE_PATTERNS, SCALE_MAX, SCALE_MIN};

const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";
const ROAD_LINE_REF: &str = "#/definitions/roadLine";

/// Builds the JSON Schema document. Every field is required but nullable.
#[must_use]
pub fn to_json_schema(schemas: &SchemaSet) -> Value {
    let mut properties = Map::new();
    let mut uses_lines = false;
    for schema in schemas.iter() {
        let (property, lines) = field_schema(schema);
        uses_lines |= lines;
        properties.insert(schema.name.clone(), property);
    }

    let mut root = json!({
        "$schema": DRAFT_07,
        "title": "geo_meta",
        "type": "object",
        "properties": properties,
        "required": schemas.field_names(),
        "additionalProperties": false,
    });
    if uses_lines {
        root["definitions"] = json!({ "roadLine": road_line_definition() });
    }
    root
}

/// Schema of one property, and whether it references the road-line definition.
fn field_schema(schema: &FieldSchema) -> (Value, bool) {
    let enum_values = || -> Vec<Value> { schema.possible_values.iter().map(|v| v.to_json()).collect() };
    let mut lines = false;

    let mut property = match schema.field_type {
        FieldType::Boolean => json!({ "type": ["boolean", "null"] }),
        FieldType::Number => json!({ "type": ["number", "null"] }),
        FieldType::String => {
            let mut p = json!({ "type": ["string", "null"] });
            if !schema.possible_values.is_empty() {
                let mut values = enum_values();
                values.push(Value::Null);
                p["enum"] = Value::Array(values);
            }
            p
        }
        FieldType::Array => {
            let mut items = json!({});
            if !schema.possible_values.is_empty() {
                items["enum"] = Value::Array(enum_values());
            }
            json!({ "type": ["array", "null"], "items": items })
        }
        FieldType::Scale => {
            let bound = json!({
                "type": "integer",
                "minimum": schema.min.unwrap_or(SCALE_MIN),
                "maximum": schema.max.unwrap_or(SCALE_MAX),
            });
            json!({
                "type": ["object", "null"],
                "properties": { "min": bound, "max": bound },
                "required": ["min", "max"],
                "additionalProperties": false,
            })
        }
        FieldType::Object if !schema.free_form_objects => {
            lines = true;
            let list = json!({ "type": "array", "items": { "$ref": ROAD_LINE_REF } });
            json!({
                "type": ["object", "null"],
                "properties": { "inner": list, "outer": list },
                "additionalProperties": false,
            })
        }
        FieldType::Object => json!({ "type": ["object", "null"] }),
        FieldType::Unknown => json!({}),
    };
    property["title"] = Value::String(schema.display_name.clone());
    (property, lines)
}

fn road_line_definition() -> Value {
    json!({
        "type": "object",
        "properties": {
            "number": { "type": "string", "enum": LINE_NUMBERS },
            "color": { "type": "string", "enum": LINE_COLORS },
            "pattern": { "type": "string", "enum": LINE_PATTERNS },
        },
        "required": ["number", "color", "pattern"],
        "additionalProperties": false,
    })
}
