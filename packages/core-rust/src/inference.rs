//! Field-schema inference.
//!
//! The set of metadata fields is not declared anywhere: it is discovered by
//! scanning every record in the loaded document. For each field the scan
//! produces a [`FieldSchema`] describing the observed shape and the sorted set
//! of observed primitive values.
//!
//! # Type precedence
//!
//! The first non-null value seen for a field decides its [`FieldType`]. Later
//! values with a different shape do not change the type, but the `is_*` flags
//! accumulate, so a schema may have several flags set at once.
//!
//! # Fallback
//!
//! A freshly stubbed document has nothing but nulls. When every inferred field
//! is either [`FieldType::Unknown`] or has no observed values, the known
//! fields are replaced by their hardcoded shapes from [`crate::known`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::known::{self, KNOWN_FIELDS};
use crate::types::{FieldValue, MetadataRecord, Scalar};

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// Abstract shape of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Number,
    String,
    Array,
    Object,
    Scale,
    Unknown,
}

impl FieldType {
    /// Lowercase name, as used in JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Scale => "scale",
            Self::Unknown => "unknown",
        }
    }

    fn of_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Bool(_) => Self::Boolean,
            Scalar::Number(_) => Self::Number,
            Scalar::Text(_) => Self::String,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldSchema
// ---------------------------------------------------------------------------

/// Inferred description of one metadata field. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldSchema {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Observed primitive values, sorted and deduplicated.
    pub possible_values: Vec<Scalar>,
    pub is_array: bool,
    pub is_object: bool,
    pub is_boolean: bool,
    pub is_number: bool,
    pub is_string: bool,
    /// Lowest observed scale bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Highest observed scale bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Set when an object that is not road-line shaped was observed.
    pub free_form_objects: bool,
    /// Records holding a non-null value.
    pub value_count: usize,
    /// Records holding an explicit null.
    pub null_count: usize,
    /// Whether the shape came from the known-fields table.
    pub from_fallback: bool,
}

impl FieldSchema {
    /// A schema with nothing observed.
    #[must_use]
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name(name),
            field_type: FieldType::Unknown,
            possible_values: Vec::new(),
            is_array: false,
            is_object: false,
            is_boolean: false,
            is_number: false,
            is_string: false,
            min: None,
            max: None,
            free_form_objects: false,
            value_count: 0,
            null_count: 0,
            from_fallback: false,
        }
    }

    /// Inference could not learn anything useful from this field.
    #[must_use]
    pub fn is_inconclusive(&self) -> bool {
        self.field_type == FieldType::Unknown || self.possible_values.is_empty()
    }

    fn observe_type(&mut self, field_type: FieldType) {
        if self.field_type == FieldType::Unknown {
            self.field_type = field_type;
        }
    }

    fn flag_scalar(&mut self, value: &Scalar) {
        match value {
            Scalar::Bool(_) => self.is_boolean = true,
            Scalar::Number(_) => self.is_number = true,
            Scalar::Text(_) => self.is_string = true,
        }
    }

    fn widen(&mut self, min: i64, max: i64) {
        self.min = Some(self.min.map_or(min, |m| m.min(min)));
        self.max = Some(self.max.map_or(max, |m| m.max(max)));
    }
}

/// Turns `snake_case` keys into title-cased labels: `soil_color` -> `Soil Color`.
#[must_use]
pub fn display_name(field: &str) -> String {
    if let Some(known) = known::known_field(field) {
        return known.display_name.to_string();
    }
    field
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Infers the schema of one field across all records.
///
/// Records without the field and records holding null are skipped (nulls are
/// counted). Never fails: a field with no data is [`FieldType::Unknown`].
pub fn infer_schema<'a, I>(field_name: &str, records: I) -> FieldSchema
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let mut schema = FieldSchema::unknown(field_name);
    let mut observed = BTreeSet::new();

    for record in records {
        let Some(value) = record.get(field_name) else {
            continue;
        };
        match value {
            FieldValue::Null => {
                schema.null_count += 1;
                continue;
            }
            FieldValue::Scalar(scalar) => {
                schema.observe_type(FieldType::of_scalar(scalar));
                schema.flag_scalar(scalar);
                observed.insert(scalar.clone());
            }
            FieldValue::List(items) => {
                schema.is_array = true;
                schema.observe_type(FieldType::Array);
                for item in items {
                    schema.flag_scalar(item);
                    observed.insert(item.clone());
                }
            }
            FieldValue::Range(range) => {
                schema.observe_type(FieldType::Scale);
                schema.widen(range.min, range.max);
            }
            FieldValue::Lines(_) => {
                schema.is_object = true;
                schema.observe_type(FieldType::Object);
            }
            FieldValue::Other(serde_json::Value::Array(_)) => {
                schema.is_array = true;
                schema.observe_type(FieldType::Array);
            }
            FieldValue::Other(_) => {
                schema.is_object = true;
                schema.free_form_objects = true;
                schema.observe_type(FieldType::Object);
            }
        }
        schema.value_count += 1;
    }

    schema.possible_values = observed.into_iter().collect();
    schema
}

/// Inferred schemas for every field of a document, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSet {
    fields: BTreeMap<String, FieldSchema>,
    fallback: bool,
}

impl SchemaSet {
    /// Schema for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldSchema> {
        self.fields.get(field)
    }

    /// All schemas, ordered by field name.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.values()
    }

    /// Field names, sorted.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if no field was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the known-fields fallback was applied.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl FromIterator<FieldSchema> for SchemaSet {
    fn from_iter<T: IntoIterator<Item = FieldSchema>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|s| (s.name.clone(), s)).collect(),
            fallback: false,
        }
    }
}

/// Infers schemas for every field present in any record, applying the
/// known-fields fallback when the scan is inconclusive.
pub fn infer_schemas<'a, I>(records: I) -> SchemaSet
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let records: Vec<&MetadataRecord> = records.into_iter().collect();
    let names: BTreeSet<&str> = records.iter().flat_map(|r| r.field_names()).collect();

    let mut set: SchemaSet = names
        .into_iter()
        .map(|name| infer_schema(name, records.iter().copied()))
        .collect();

    if set.fields.values().all(FieldSchema::is_inconclusive) {
        for known in KNOWN_FIELDS {
            let mut schema = known.schema();
            if let Some(scanned) = set.fields.get(known.name) {
                schema.value_count = scanned.value_count;
                schema.null_count = scanned.null_count;
            }
            set.fields.insert(known.name.to_string(), schema);
        }
        set.fallback = true;
        tracing::debug!(fields = set.len(), "metadata inconclusive, using known-field shapes");
    }

    set
}

/// Live sorted, deduplicated category keys for a field.
///
/// List values contribute each element. Road lines and other nested values
/// contribute their compact JSON text so they can still be ranked.
pub fn sorted_values_for_field<'a, I>(values: I) -> Vec<Scalar>
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    let mut keys = BTreeSet::new();
    for value in values {
        match value {
            FieldValue::Null | FieldValue::Range(_) => {}
            FieldValue::Scalar(s) => {
                keys.insert(s.clone());
            }
            FieldValue::List(items) => keys.extend(items.iter().cloned()),
            FieldValue::Lines(_) | FieldValue::Other(_) => {
                keys.insert(nested_key(value));
            }
        }
    }
    keys.into_iter().collect()
}

/// Category key of a value: itself, its first element, or compact JSON for
/// nested shapes. `None` for null, empty lists and ranges.
#[must_use]
pub fn category_key(value: &FieldValue) -> Option<Scalar> {
    match value {
        FieldValue::Null | FieldValue::Range(_) => None,
        FieldValue::Scalar(s) => Some(s.clone()),
        FieldValue::List(items) => items.first().cloned(),
        FieldValue::Lines(_) | FieldValue::Other(_) => Some(nested_key(value)),
    }
}

fn nested_key(value: &FieldValue) -> Scalar {
    let json: serde_json::Value = value.clone().into();
    Scalar::Text(json.to_string())
}
