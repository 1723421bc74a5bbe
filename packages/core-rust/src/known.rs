//! Known GeoMeta fields and their value sets.
//!
//! The editor discovers fields from data, so nothing here restricts which keys
//! a record may hold. The table is consulted in three places: the inference
//! fallback for documents whose metadata is entirely null, validation of the
//! known fields, and display labels.

use crate::inference::{FieldSchema, FieldType};
use crate::types::Scalar;

/// `driving_side`: list of `left` / `right`.
pub const DRIVING_SIDE: &str = "driving_side";
/// `hemisphere`: single `N` / `S` / `E`.
pub const HEMISPHERE: &str = "hemisphere";
/// `road_lines`: nested road markings.
pub const ROAD_LINES: &str = "road_lines";
/// `road_quality`: list of `maintained` / `poor`.
pub const ROAD_QUALITY: &str = "road_quality";
/// `has_official_coverage`: boolean.
pub const HAS_OFFICIAL_COVERAGE: &str = "has_official_coverage";
/// `arid_lush`: 1-5 range.
pub const ARID_LUSH: &str = "arid_lush";
/// `cold_hot`: 1-5 range.
pub const COLD_HOT: &str = "cold_hot";
/// `flat_mountainous`: 1-5 range.
pub const FLAT_MOUNTAINOUS: &str = "flat_mountainous";
/// `soil_color`: list of soil colors.
pub const SOIL_COLOR: &str = "soil_color";

/// Lowest value a scale bound may take.
pub const SCALE_MIN: i64 = 1;
/// Highest value a scale bound may take.
pub const SCALE_MAX: i64 = 5;

pub const DRIVING_SIDES: &[&str] = &["left", "right"];
pub const HEMISPHERES: &[&str] = &["E", "N", "S"];
pub const ROAD_QUALITIES: &[&str] = &["maintained", "poor"];
pub const SOIL_COLORS: &[&str] = &["black", "brown", "gray", "other", "red"];
pub const LINE_NUMBERS: &[&str] = &["double", "single"];
pub const LINE_COLORS: &[&str] = &["white", "yellow"];
pub const LINE_PATTERNS: &[&str] = &["dashed", "solid"];

/// The three range fields.
pub const SCALE_FIELDS: &[&str] = &[ARID_LUSH, COLD_HOT, FLAT_MOUNTAINOUS];

/// Hardcoded shape of one known field.
#[derive(Debug, Clone, Copy)]
pub struct KnownField {
    /// Field key in `geo_meta`.
    pub name: &'static str,
    /// Label shown in forms and legends.
    pub display_name: &'static str,
    /// Canonical type.
    pub field_type: FieldType,
    /// Allowed text values (sorted). Empty for boolean, scale and nested fields.
    pub values: &'static [&'static str],
}

/// The nine fields of the default GeoMeta schema.
pub const KNOWN_FIELDS: &[KnownField] = &[
    KnownField {
        name: DRIVING_SIDE,
        display_name: "Driving Side",
        field_type: FieldType::Array,
        values: DRIVING_SIDES,
    },
    KnownField {
        name: HEMISPHERE,
        display_name: "Hemisphere",
        field_type: FieldType::String,
        values: HEMISPHERES,
    },
    KnownField {
        name: ROAD_LINES,
        display_name: "Road Lines",
        field_type: FieldType::Object,
        values: &[],
    },
    KnownField {
        name: ROAD_QUALITY,
        display_name: "Road Quality",
        field_type: FieldType::Array,
        values: ROAD_QUALITIES,
    },
    KnownField {
        name: HAS_OFFICIAL_COVERAGE,
        display_name: "Has Official Coverage",
        field_type: FieldType::Boolean,
        values: &[],
    },
    KnownField {
        name: ARID_LUSH,
        display_name: "Arid / Lush",
        field_type: FieldType::Scale,
        values: &[],
    },
    KnownField {
        name: COLD_HOT,
        display_name: "Cold / Hot",
        field_type: FieldType::Scale,
        values: &[],
    },
    KnownField {
        name: FLAT_MOUNTAINOUS,
        display_name: "Flat / Mountainous",
        field_type: FieldType::Scale,
        values: &[],
    },
    KnownField {
        name: SOIL_COLOR,
        display_name: "Soil Color",
        field_type: FieldType::Array,
        values: SOIL_COLORS,
    },
];

/// Looks up a known field by key.
#[must_use]
pub fn known_field(name: &str) -> Option<&'static KnownField> {
    KNOWN_FIELDS.iter().find(|f| f.name == name)
}

/// Names of all known fields, in table order.
#[must_use]
pub fn known_field_names() -> Vec<&'static str> {
    KNOWN_FIELDS.iter().map(|f| f.name).collect()
}

impl KnownField {
    /// Builds the fallback schema for this field.
    #[must_use]
    pub fn schema(&self) -> FieldSchema {
        let mut schema = FieldSchema::unknown(self.name);
        schema.display_name = self.display_name.to_string();
        schema.field_type = self.field_type;
        schema.from_fallback = true;
        match self.field_type {
            FieldType::Array => {
                schema.is_array = true;
                schema.is_string = true;
                schema.possible_values = self.values.iter().map(|v| Scalar::text(*v)).collect();
            }
            FieldType::String => {
                schema.is_string = true;
                schema.possible_values = self.values.iter().map(|v| Scalar::text(*v)).collect();
            }
            FieldType::Boolean => {
                schema.is_boolean = true;
                schema.possible_values = vec![Scalar::Bool(false), Scalar::Bool(true)];
            }
            FieldType::Scale => {
                schema.min = Some(SCALE_MIN);
                schema.max = Some(SCALE_MAX);
            }
            FieldType::Object => schema.is_object = true,
            FieldType::Number | FieldType::Unknown => {}
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_nine_fields() {
        assert_eq!(KNOWN_FIELDS.len(), 9);
        assert_eq!(known_field_names().len(), 9);
    }

    #[test]
    fn value_sets_are_sorted() {
        for set in [
            DRIVING_SIDES,
            HEMISPHERES,
            ROAD_QUALITIES,
            SOIL_COLORS,
            LINE_NUMBERS,
            LINE_COLORS,
            LINE_PATTERNS,
        ] {
            let mut sorted = set.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, set);
        }
    }

    #[test]
    fn scale_fallback_carries_bounds() {
        let schema = known_field(COLD_HOT).unwrap().schema();
        assert_eq!(schema.field_type, FieldType::Scale);
        assert_eq!(schema.min, Some(1));
        assert_eq!(schema.max, Some(5));
        assert!(schema.from_fallback);
    }

    #[test]
    fn boolean_fallback_lists_both_values() {
        let schema = known_field(HAS_OFFICIAL_COVERAGE).unwrap().schema();
        assert_eq!(
            schema.possible_values,
            vec![Scalar::Bool(false), Scalar::Bool(true)]
        );
    }

    #[test]
    fn unknown_name_is_not_known() {
        assert!(known_field("population").is_none());
    }
}
