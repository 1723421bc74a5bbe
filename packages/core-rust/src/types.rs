//! Metadata value model.
//!
//! A [`MetadataRecord`] maps field names to [`FieldValue`]s. Every stored JSON
//! value is classified into exactly one tagged shape when it is read, and
//! converted back to the same JSON when it is written, so a document survives
//! load and save without loss even for shapes the editor does not understand
//! (those land in [`FieldValue::Other`]).
//!
//! Writing back also keeps member order: records remember the order their
//! fields were read in, and a composite shape is only recognized when its
//! canonical form writes the same keys in the same order.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number};

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single primitive metadata value.
///
/// Scalars are totally ordered so that observed value sets can be kept in a
/// `BTreeSet`: booleans sort before numbers, numbers before strings. Numbers
/// compare numerically, strings lexicographically.
#[derive(Debug, Clone)]
pub enum Scalar {
    /// JSON boolean.
    Bool(bool),
    /// JSON number, kept in its original representation.
    Number(Number),
    /// JSON string.
    Text(String),
}

impl Scalar {
    /// Creates a text scalar.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates an integer scalar.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    /// Returns the string slice for text scalars.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean for boolean scalars.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i64` for integral numbers.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Converts back into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => {
                let x = a.as_f64().unwrap_or(f64::NAN);
                let y = b.as_f64().unwrap_or(f64::NAN);
                // `1` and `1.0` are distinct JSON numbers; fall back to their text.
                x.total_cmp(&y)
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

// ---------------------------------------------------------------------------
// Composite shapes
// ---------------------------------------------------------------------------

/// An inclusive integer range, stored as `{"min": .., "max": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRange {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
}

impl ScaleRange {
    /// Creates a range without checking bounds. Use validation for that.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Arithmetic mean of both bounds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

/// One painted road line: how many lines, their color and their pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoadLine {
    /// Line count, e.g. `single` or `double`.
    pub number: String,
    /// Paint color, e.g. `white`.
    pub color: String,
    /// Stroke pattern, e.g. `dashed`.
    pub pattern: String,
}

impl RoadLine {
    /// Convenience constructor.
    #[must_use]
    pub fn new(number: &str, color: &str, pattern: &str) -> Self {
        Self {
            number: number.to_string(),
            color: color.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// Center (`inner`) and edge (`outer`) road markings.
///
/// Either list may be absent; absence and an empty list are both "no lines"
/// but are kept apart so that stored documents round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoadLines {
    /// Center lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Vec<RoadLine>>,
    /// Edge lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<Vec<RoadLine>>,
}

impl RoadLines {
    /// Builds a value with both lists present.
    #[must_use]
    pub fn new(inner: Vec<RoadLine>, outer: Vec<RoadLine>) -> Self {
        Self {
            inner: Some(inner),
            outer: Some(outer),
        }
    }

    /// Center lines, empty when absent.
    #[must_use]
    pub fn inner(&self) -> &[RoadLine] {
        self.inner.as_deref().unwrap_or_default()
    }

    /// Edge lines, empty when absent.
    #[must_use]
    pub fn outer(&self) -> &[RoadLine] {
        self.outer.as_deref().unwrap_or_default()
    }

    /// `true` when neither list holds a line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner().is_empty() && self.outer().is_empty()
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// The value of one metadata field.
///
/// Serialized through `serde_json::Value`: reading classifies, writing
/// restores the exact JSON that was read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum FieldValue {
    /// Explicit absence of data.
    #[default]
    Null,
    /// A single primitive.
    Scalar(Scalar),
    /// A list of primitives.
    List(Vec<Scalar>),
    /// A `{min, max}` integer range.
    Range(ScaleRange),
    /// Road markings.
    Lines(RoadLines),
    /// Any other JSON shape, carried through untouched.
    Other(serde_json::Value),
}

/// Shared null used when a field or a whole record is missing.
pub static NULL_VALUE: FieldValue = FieldValue::Null;

impl FieldValue {
    /// Text scalar shorthand.
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Scalar(Scalar::text(value))
    }

    /// List-of-text shorthand.
    #[must_use]
    pub fn text_list(values: &[&str]) -> Self {
        Self::List(values.iter().map(|v| Scalar::text(*v)).collect())
    }

    /// Range shorthand.
    #[must_use]
    pub fn range(min: i64, max: i64) -> Self {
        Self::Range(ScaleRange::new(min, max))
    }

    /// `true` for [`FieldValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the stored shape, used in messages.
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(Scalar::Bool(_)) => "boolean",
            Self::Scalar(Scalar::Number(_)) => "number",
            Self::Scalar(Scalar::Text(_)) => "string",
            Self::List(_) => "list",
            Self::Range(_) => "range",
            Self::Lines(_) => "road lines",
            Self::Other(serde_json::Value::Array(_)) => "nested list",
            Self::Other(_) => "object",
        }
    }

    /// `true` if this value is, or contains, `needle`.
    #[must_use]
    pub fn contains(&self, needle: &Scalar) -> bool {
        match self {
            Self::Scalar(s) => s == needle,
            Self::List(items) => items.contains(needle),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::Text(s)),
            Value::Array(items) => match scalar_list(&items) {
                Some(list) => Self::List(list),
                None => Self::Other(Value::Array(items)),
            },
            Value::Object(map) => {
                if let Some(range) = scale_range(&map) {
                    return Self::Range(range);
                }
                let candidate = Value::Object(map);
                if candidate.as_object().is_some_and(|m| m.values().all(Value::is_array)) {
                    if let Some(lines) = road_lines(&candidate) {
                        return Self::Lines(lines);
                    }
                }
                Self::Other(candidate)
            }
        }
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Scalar(s) => s.to_json(),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(Scalar::to_json).collect())
            }
            FieldValue::Range(range) => serde_json::json!({ "min": range.min, "max": range.max }),
            FieldValue::Lines(lines) => {
                serde_json::to_value(lines).unwrap_or(serde_json::Value::Null)
            }
            FieldValue::Other(v) => v,
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

fn scalar_list(items: &[serde_json::Value]) -> Option<Vec<Scalar>> {
    items
        .iter()
        .map(|item| match FieldValue::from(item.clone()) {
            FieldValue::Scalar(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Exactly `{"min": int, "max": int}`, in that key order.
fn scale_range(map: &Map<String, serde_json::Value>) -> Option<ScaleRange> {
    let mut entries = map.iter();
    let (Some(("min", min)), Some(("max", max)), None) = (
        entries.next().map(|(k, v)| (k.as_str(), v)),
        entries.next().map(|(k, v)| (k.as_str(), v)),
        entries.next(),
    ) else {
        return None;
    };
    Some(ScaleRange {
        min: min.as_i64()?,
        max: max.as_i64()?,
    })
}

/// Road lines whose canonical serialization is the same text as `value`.
fn road_lines(value: &serde_json::Value) -> Option<RoadLines> {
    let lines: RoadLines = serde_json::from_value(value.clone()).ok()?;
    let canonical = serde_json::to_string(&lines).ok()?;
    (canonical == value.to_string()).then_some(lines)
}

// ---------------------------------------------------------------------------
// MetadataRecord
// ---------------------------------------------------------------------------

/// Per-feature metadata (`properties.geo_meta`).
///
/// Fields keep the order they were read or first set in, so an unedited
/// record is written back unchanged. Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: IndexMap<String, FieldValue>,
}

impl MetadataRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record holding an explicit null for each given field.
    #[must_use]
    pub fn all_null<S: AsRef<str>>(field_names: &[S]) -> Self {
        let fields = field_names
            .iter()
            .map(|name| (name.as_ref().to_string(), FieldValue::Null))
            .collect();
        Self { fields }
    }

    /// Returns the stored value, `None` if the key is absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Returns the stored value, treating an absent key as null.
    #[must_use]
    pub fn value(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL_VALUE)
    }

    /// Stores a value and returns the previous one. An existing field keeps
    /// its position; a new one is appended.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    /// Whether the key is present (null or not).
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names in stored order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates `(name, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `true` when every field is null.
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.fields.values().all(FieldValue::is_null)
    }
}

impl FromIterator<(String, FieldValue)> for MetadataRecord {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
