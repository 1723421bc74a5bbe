//! Structural validation of metadata records.
//!
//! Validation never fails: it returns human-readable violations and leaves the
//! decision to block a write to the caller. Only the known fields carry rules;
//! ad hoc fields are accepted in any shape.

use serde_json::Value;

use crate::known::{
    self, DRIVING_SIDE, DRIVING_SIDES, HAS_OFFICIAL_COVERAGE, HEMISPHERE, HEMISPHERES,
    LINE_COLORS, LINE_NUMBERS, LINE_PATTERNS, ROAD_LINES, ROAD_QUALITIES, ROAD_QUALITY,
    SCALE_FIELDS, SCALE_MAX, SCALE_MIN, SOIL_COLOR, SOIL_COLORS,
};
use crate::traits::DocumentProvider;
use crate::types::{FieldValue, MetadataRecord, RoadLine, Scalar};

/// Result of validating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The record conforms.
    Valid,
    /// The record violates one or more rules.
    Invalid {
        /// Human-readable descriptions of each violation.
        errors: Vec<String>,
    },
}

impl ValidationResult {
    /// `true` for [`ValidationResult::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<Vec<String>> for ValidationResult {
    fn from(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid { errors }
        }
    }
}

/// Checks a record against the rules of the known fields.
#[must_use]
pub fn validate(record: &MetadataRecord) -> Vec<String> {
    record
        .iter()
        .flat_map(|(field, value)| validate_field(field, value))
        .collect()
}

/// Checks setting `field` to `value` on each feature at `indices`, against
/// the rest of that feature's record. Each error is prefixed with the
/// feature's display name. Out-of-range indices are skipped.
pub fn validate_field_change<P>(
    provider: &P,
    indices: &[usize],
    field: &str,
    value: &FieldValue,
    name_property: &str,
) -> ValidationResult
where
    P: DocumentProvider + ?Sized,
{
    let mut errors = Vec::new();
    for &index in indices {
        let Some(feature) = provider.features().get(index) else {
            continue;
        };
        let mut candidate = feature.metadata().cloned().unwrap_or_default();
        candidate.set(field, value.clone());
        let name = feature
            .name(name_property)
            .map_or_else(|| format!("Feature #{index}"), str::to_string);
        errors.extend(validate(&candidate).into_iter().map(|e| format!("{name}: {e}")));
    }
    errors.into()
}

/// Checks one field value. Unknown fields always pass.
#[must_use]
pub fn validate_field(field: &str, value: &FieldValue) -> Vec<String> {
    if value.is_null() {
        return Vec::new();
    }
    let mut errors = Vec::new();
    match field {
        DRIVING_SIDE => check_enum_list(field, value, DRIVING_SIDES, &mut errors),
        ROAD_QUALITY => check_enum_list(field, value, ROAD_QUALITIES, &mut errors),
        SOIL_COLOR => check_enum_list(field, value, SOIL_COLORS, &mut errors),
        HEMISPHERE => check_hemisphere(value, &mut errors),
        HAS_OFFICIAL_COVERAGE => {
            if !matches!(value, FieldValue::Scalar(Scalar::Bool(_))) {
                errors.push(format!("{field} must be true, false or null"));
            }
        }
        ROAD_LINES => check_road_lines(value, &mut errors),
        f if SCALE_FIELDS.contains(&f) => check_scale(field, value, &mut errors),
        _ => {}
    }
    errors
}

fn check_enum_list(field: &str, value: &FieldValue, allowed: &[&str], errors: &mut Vec<String>) {
    let FieldValue::List(items) = value else {
        errors.push(format!("{field} must be a list, got {}", value.shape_name()));
        return;
    };
    if items.is_empty() {
        errors.push(format!("{field} must not be an empty list; use null for no data"));
    }
    for item in items {
        if !item.as_str().is_some_and(|s| allowed.contains(&s)) {
            errors.push(format!(
                "{field} contains '{item}', expected one of {}",
                allowed.join(", ")
            ));
        }
    }
}

fn check_hemisphere(value: &FieldValue, errors: &mut Vec<String>) {
    match value {
        FieldValue::Scalar(Scalar::Text(s)) if HEMISPHERES.contains(&s.as_str()) => {}
        FieldValue::Scalar(Scalar::Text(s)) => errors.push(format!(
            "{HEMISPHERE} is '{s}', expected one of {}",
            HEMISPHERES.join(", ")
        )),
        FieldValue::List(_) => {
            errors.push(format!("{HEMISPHERE} must be a single value, not a list"));
        }
        other => errors.push(format!(
            "{HEMISPHERE} must be a string, got {}",
            other.shape_name()
        )),
    }
}

fn check_scale(field: &str, value: &FieldValue, errors: &mut Vec<String>) {
    let (min, max) = match value {
        FieldValue::Range(range) => (Some(range.min), Some(range.max)),
        FieldValue::Other(Value::Object(map)) => {
            let bound = |key: &str| -> Option<i64> { map.get(key).and_then(Value::as_i64) };
            (bound("min"), bound("max"))
        }
        other => {
            errors.push(format!(
                "{field} must be a {{min, max}} range, got {}",
                other.shape_name()
            ));
            return;
        }
    };
    let (Some(min), Some(max)) = (min, max) else {
        errors.push(format!("{field} needs both an integer min and max"));
        return;
    };
    for (name, bound) in [("min", min), ("max", max)] {
        if !(SCALE_MIN..=SCALE_MAX).contains(&bound) {
            errors.push(format!(
                "{field}.{name} is {bound}, must be between {SCALE_MIN} and {SCALE_MAX}"
            ));
        }
    }
    if min > max {
        errors.push(format!("{field}.min ({min}) is greater than max ({max})"));
    }
}

fn check_road_lines(value: &FieldValue, errors: &mut Vec<String>) {
    let FieldValue::Lines(lines) = value else {
        errors.push(format!(
            "{ROAD_LINES} must hold inner/outer lists of lines with number, color and pattern"
        ));
        return;
    };
    for (side, list) in [("inner", lines.inner()), ("outer", lines.outer())] {
        for (i, line) in list.iter().enumerate() {
            check_line(side, i, line, errors);
        }
    }
}

fn check_line(side: &str, index: usize, line: &RoadLine, errors: &mut Vec<String>) {
    let parts = [
        ("number", line.number.as_str(), LINE_NUMBERS),
        ("color", line.color.as_str(), LINE_COLORS),
        ("pattern", line.pattern.as_str(), LINE_PATTERNS),
    ];
    for (name, got, allowed) in parts {
        if !allowed.contains(&got) {
            errors.push(format!(
                "{ROAD_LINES}.{side}[{index}].{name} is '{got}', expected one of {}",
                allowed.join(", ")
            ));
        }
    }
}

/// Record with every known field null; convenience for callers and tests.
#[must_use]
pub fn empty_known_record() -> MetadataRecord {
    MetadataRecord::all_null(&known::known_field_names())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::RoadLines;

    fn with(field: &str, value: FieldValue) -> MetadataRecord {
        let mut record = empty_known_record();
        record.set(field, value);
        record
    }

    // ---- baseline ----

    #[test]
    fn field_change_checks_every_target() {
        let doc = crate::document::Document::from_json_str(
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"ADMIN": "Aruba", "geo_meta": {"hemisphere": "N"}}},
                    {"type": "Feature", "properties": {"ADMIN": "Kenya", "geo_meta": {"soil_color": ["plaid"]}}},
                    {"type": "Feature", "properties": null}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let south = FieldValue::text("S");
        assert!(validate_field_change(&doc, &[0, 2, 9], HEMISPHERE, &south, "ADMIN").is_valid());

        let ValidationResult::Invalid { errors } =
            validate_field_change(&doc, &[0, 1, 2], HEMISPHERE, &FieldValue::text("W"), "ADMIN")
        else {
            panic!("expected violations");
        };
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("Aruba: hemisphere"));
        assert!(errors.iter().any(|e| e.starts_with("Kenya: soil_color")));
        assert!(errors[3].starts_with("Feature #2: "));
    }

    #[test]
    fn all_null_record_is_valid() {
        assert!(validate(&empty_known_record()).is_empty());
        assert!(ValidationResult::from(validate(&empty_known_record())).is_valid());
    }

    #[test]
    fn unknown_fields_pass() {
        let record = with("population", FieldValue::text_list(&[]));
        assert!(validate(&record).is_empty());
    }

    // ---- lists ----

    #[test]
    fn empty_list_is_rejected() {
        let errors = validate(&with(DRIVING_SIDE, FieldValue::List(vec![])));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("empty"));
    }

    #[test]
    fn list_values_must_be_known() {
        let errors = validate(&with(SOIL_COLOR, FieldValue::text_list(&["red", "purple"])));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("purple"));
        assert!(validate(&with(ROAD_QUALITY, FieldValue::text_list(&["poor"]))).is_empty());
    }

    #[test]
    fn scalar_where_list_expected() {
        let errors = validate(&with(ROAD_QUALITY, FieldValue::text("poor")));
        assert_eq!(errors.len(), 1);
    }

    // ---- hemisphere ----

    #[test]
    fn hemisphere_must_be_scalar() {
        assert!(validate(&with(HEMISPHERE, FieldValue::text("N"))).is_empty());
        let errors = validate(&with(HEMISPHERE, FieldValue::text_list(&["N"])));
        assert_eq!(errors, vec!["hemisphere must be a single value, not a list"]);
        assert_eq!(validate(&with(HEMISPHERE, FieldValue::text("W"))).len(), 1);
    }

    // ---- scales ----

    #[test]
    fn scale_boundary() {
        assert_eq!(validate(&with("arid_lush", FieldValue::range(5, 1))).len(), 1);
        assert!(validate(&with("arid_lush", FieldValue::range(1, 5))).is_empty());
    }

    #[test]
    fn scale_out_of_bounds() {
        let errors = validate(&with("cold_hot", FieldValue::range(0, 6)));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn scale_missing_bound() {
        let value = FieldValue::from(json!({"min": 2}));
        let errors = validate(&with("flat_mountainous", value));
        assert_eq!(errors, vec!["flat_mountainous needs both an integer min and max"]);
    }

    #[test]
    fn fractional_scale_bound_is_rejected() {
        let value = FieldValue::from(json!({"min": 1.5, "max": 3}));
        assert!(matches!(value, FieldValue::Other(_)));
        let errors = validate(&with("arid_lush", value));
        assert_eq!(errors, vec!["arid_lush needs both an integer min and max"]);
    }

    #[test]
    fn scale_wrong_shape() {
        assert_eq!(validate(&with("cold_hot", FieldValue::text("hot"))).len(), 1);
    }

    // ---- other known fields ----

    #[test]
    fn coverage_must_be_boolean() {
        let yes = FieldValue::Scalar(Scalar::Bool(true));
        assert!(validate(&with(HAS_OFFICIAL_COVERAGE, yes)).is_empty());
        assert_eq!(validate(&with(HAS_OFFICIAL_COVERAGE, FieldValue::text("yes"))).len(), 1);
    }

    #[test]
    fn road_lines_rules() {
        let good = FieldValue::Lines(RoadLines::new(
            vec![RoadLine::new("single", "yellow", "dashed")],
            vec![],
        ));
        assert!(validate(&with(ROAD_LINES, good)).is_empty());

        let bad_enum = FieldValue::Lines(RoadLines::new(
            vec![],
            vec![RoadLine::new("triple", "white", "solid")],
        ));
        let errors = validate(&with(ROAD_LINES, bad_enum));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("road_lines.outer[0].number"));

        let partial = FieldValue::from(json!({"inner": [{"number": "single"}]}));
        assert_eq!(validate(&with(ROAD_LINES, partial)).len(), 1);
    }

    #[test]
    fn violations_accumulate() {
        let mut record = empty_known_record();
        record.set(DRIVING_SIDE, FieldValue::List(vec![]));
        record.set("arid_lush", FieldValue::range(4, 2));
        let result = ValidationResult::from(validate(&record));
        let ValidationResult::Invalid { errors } = result else {
            panic!("expected invalid");
        };
        assert_eq!(errors.len(), 2);
    }
}
