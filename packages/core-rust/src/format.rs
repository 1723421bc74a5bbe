//! Human-readable labels for stored values.
//!
//! Used by list views, tooltips, legends and statistics. [`format_value`] is
//! total over every [`FieldValue`]; [`parse_label`] maps a scalar label back
//! to the stored value.

use crate::inference::FieldSchema;
use crate::known::{self, DRIVING_SIDE, HAS_OFFICIAL_COVERAGE, HEMISPHERE, ROAD_QUALITY, SOIL_COLOR};
use crate::types::{FieldValue, RoadLine, Scalar};

/// Which rendering a call site wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    /// Lists, tooltips, legends.
    #[default]
    Full,
    /// Dense tables.
    Compact,
}

/// Label used for missing data in [`FormatStyle::Full`].
pub const NO_DATA: &str = "No data";
/// Label used for missing data in [`FormatStyle::Compact`].
pub const COMPACT_NULL: &str = "null";

/// Hand-authored labels for known enum fields.
fn enum_labels(field: &str) -> &'static [(&'static str, &'static str)] {
    match field {
        HEMISPHERE => &[("N", "North"), ("S", "South"), ("E", "Equator")],
        DRIVING_SIDE => &[("left", "Left"), ("right", "Right")],
        ROAD_QUALITY => &[("maintained", "Maintained"), ("poor", "Poor")],
        SOIL_COLOR => &[
            ("red", "Red"),
            ("brown", "Brown"),
            ("gray", "Gray"),
            ("black", "Black"),
            ("other", "Other"),
        ],
        _ => &[],
    }
}

/// Label of a single primitive value of `field`.
#[must_use]
pub fn label_for_scalar(field: &str, value: &Scalar) -> String {
    match value {
        Scalar::Bool(b) if field == HAS_OFFICIAL_COVERAGE => {
            let label = if *b { "Yes" } else { "No" };
            label.to_string()
        }
        Scalar::Text(s) => enum_labels(field)
            .iter()
            .find(|(raw, _)| raw == s)
            .map_or_else(|| s.clone(), |(_, label)| (*label).to_string()),
        other => other.to_string(),
    }
}

/// Formats any stored value for display.
#[must_use]
pub fn format_value(field: &str, value: &FieldValue, style: FormatStyle) -> String {
    match value {
        FieldValue::Null => match style {
            FormatStyle::Full => NO_DATA.to_string(),
            FormatStyle::Compact => COMPACT_NULL.to_string(),
        },
        FieldValue::Scalar(s) => label_for_scalar(field, s),
        FieldValue::List(items) => items
            .iter()
            .map(|item| label_for_scalar(field, item))
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Range(range) => match style {
            FormatStyle::Full => format!(
                "{}-{} (scale {}-{})",
                range.min,
                range.max,
                known::SCALE_MIN,
                known::SCALE_MAX
            ),
            FormatStyle::Compact => format!("{}-{}", range.min, range.max),
        },
        FieldValue::Lines(lines) => match style {
            FormatStyle::Full => {
                let mut parts = Vec::new();
                if !lines.inner().is_empty() {
                    parts.push(format!("Inner: {}", describe_lines(lines.inner())));
                }
                if !lines.outer().is_empty() {
                    parts.push(format!("Outer: {}", describe_lines(lines.outer())));
                }
                if parts.is_empty() {
                    "No lines".to_string()
                } else {
                    parts.join("; ")
                }
            }
            FormatStyle::Compact => {
                format!("{} inner / {} outer", lines.inner().len(), lines.outer().len())
            }
        },
        FieldValue::Other(json) => json.to_string(),
    }
}

fn describe_lines(lines: &[RoadLine]) -> String {
    lines
        .iter()
        .map(|line| {
            format!(
                "{} {} {}",
                title_case(&line.number),
                line.color,
                line.pattern
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Maps a label produced by [`label_for_scalar`] back to the stored value.
///
/// Candidates are the schema's observed values, then the hand-authored label
/// tables; anything else is taken as literal text.
#[must_use]
pub fn parse_label(schema: &FieldSchema, label: &str) -> Scalar {
    if let Some(found) = schema
        .possible_values
        .iter()
        .find(|v| label_for_scalar(&schema.name, v) == label)
    {
        return found.clone();
    }
    if schema.name == HAS_OFFICIAL_COVERAGE {
        match label {
            "Yes" => return Scalar::Bool(true),
            "No" => return Scalar::Bool(false),
            _ => {}
        }
    }
    enum_labels(&schema.name)
        .iter()
        .find(|(_, l)| *l == label)
        .map_or_else(|| Scalar::text(label), |(raw, _)| Scalar::text(*raw))
}
