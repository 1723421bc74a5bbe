//! Choropleth colors and legends.
//!
//! Categorical values are colored by their rank in the sorted list of values
//! currently present in the document, so the same value set always yields the
//! same colors and a palette switch keeps each value in the same palette slot.
//! Colors are not pinned to values: a new value that sorts before existing
//! ones moves each of them to the next slot.
//! Scale values index a five-step ramp by the floor of their midpoint.
//!
//! A value missing from the live list means the caller colored with stale
//! data. That case falls back to a hash of the value and is logged at `warn`.

use std::fmt;

use serde::Serialize;

use crate::document::Document;
use crate::format::{label_for_scalar, NO_DATA};
use crate::hash::hash_bucket;
use crate::inference::{category_key, sorted_values_for_field, FieldSchema, FieldType};
use crate::known::{SCALE_MAX, SCALE_MIN};
use crate::types::{FieldValue, Scalar};

/// A CSS hex color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(pub &'static str);

impl Color {
    /// The hex string, e.g. `#cccccc`.
    #[must_use]
    pub fn hex(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Fill for missing data, identical in every palette.
pub const NULL_COLOR: Color = Color("#cccccc");

/// A named set of categorical colors plus a five-step ramp for scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub name: &'static str,
    pub categorical: &'static [Color],
    pub scale: [Color; 5],
}

/// Built-in palettes. The first is the default.
pub const PALETTES: &[Palette] = &[
    Palette {
        name: "default",
        categorical: &[
            Color("#1f77b4"),
            Color("#ff7f0e"),
            Color("#2ca02c"),
            Color("#d62728"),
            Color("#9467bd"),
            Color("#8c564b"),
            Color("#e377c2"),
            Color("#7f7f7f"),
            Color("#bcbd22"),
            Color("#17becf"),
        ],
        scale: [
            Color("#fee5d9"),
            Color("#fcae91"),
            Color("#fb6a4a"),
            Color("#de2d26"),
            Color("#a50f15"),
        ],
    },
    Palette {
        name: "colorblind",
        categorical: &[
            Color("#e69f00"),
            Color("#56b4e9"),
            Color("#009e73"),
            Color("#f0e442"),
            Color("#0072b2"),
            Color("#d55e00"),
            Color("#cc79a7"),
            Color("#000000"),
        ],
        scale: [
            Color("#f0f9e8"),
            Color("#bae4bc"),
            Color("#7bccc4"),
            Color("#43a2ca"),
            Color("#0868ac"),
        ],
    },
    Palette {
        name: "pastel",
        categorical: &[
            Color("#fbb4ae"),
            Color("#b3cde3"),
            Color("#ccebc5"),
            Color("#decbe4"),
            Color("#fed9a6"),
            Color("#ffffcc"),
            Color("#e5d8bd"),
            Color("#fddaec"),
            Color("#f2f2f2"),
        ],
        scale: [
            Color("#edf8fb"),
            Color("#b3cde3"),
            Color("#8c96c6"),
            Color("#8856a7"),
            Color("#810f7c"),
        ],
    },
    Palette {
        name: "earth",
        categorical: &[
            Color("#8c510a"),
            Color("#bf812d"),
            Color("#dfc27d"),
            Color("#80cdc1"),
            Color("#35978f"),
            Color("#01665e"),
        ],
        scale: [
            Color("#ffffd4"),
            Color("#fed98e"),
            Color("#fe9929"),
            Color("#d95f0e"),
            Color("#993404"),
        ],
    },
];

impl Palette {
    /// Looks up a built-in palette by name.
    #[must_use]
    pub fn named(name: &str) -> Option<&'static Palette> {
        PALETTES.iter().find(|p| p.name == name)
    }

    /// The default palette.
    #[must_use]
    pub fn default_palette() -> &'static Palette {
        &PALETTES[0]
    }

    /// Names of all built-in palettes.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        PALETTES.iter().map(|p| p.name).collect()
    }

    /// Ramp color for a scale midpoint; clamped to the scale bounds.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn scale_color(&self, midpoint: f64) -> Color {
        let clamped = midpoint.clamp(SCALE_MIN as f64, SCALE_MAX as f64).floor() as usize;
        let index = clamped - 1;
        self.scale[index.min(self.scale.len() - 1)]
    }

    /// Categorical color for a rank, wrapping past the palette size.
    #[must_use]
    pub fn categorical_color(&self, rank: usize) -> Color {
        self.categorical[rank % self.categorical.len()]
    }
}

// ---------------------------------------------------------------------------
// Color assignment
// ---------------------------------------------------------------------------

/// Colors for one field, computed from the live values of a document.
#[derive(Debug, Clone)]
pub struct FieldColors<'p> {
    field: String,
    palette: &'p Palette,
    scale: bool,
    sorted: Vec<Scalar>,
}

impl<'p> FieldColors<'p> {
    /// Prepares coloring for `schema`'s field from the current values.
    pub fn new<'a, I>(schema: &FieldSchema, values: I, palette: &'p Palette) -> Self
    where
        I: IntoIterator<Item = &'a FieldValue>,
    {
        Self {
            field: schema.name.clone(),
            palette,
            scale: schema.field_type == FieldType::Scale,
            sorted: sorted_values_for_field(values),
        }
    }

    /// The live sorted category keys.
    #[must_use]
    pub fn sorted_values(&self) -> &[Scalar] {
        &self.sorted
    }

    /// Color of one stored value.
    #[must_use]
    pub fn color_of(&self, value: &FieldValue) -> Color {
        match value {
            FieldValue::Null => NULL_COLOR,
            FieldValue::Range(range) => self.palette.scale_color(range.midpoint()),
            other => match category_key(other) {
                Some(key) => self.color_of_key(&key),
                None => NULL_COLOR,
            },
        }
    }

    fn color_of_key(&self, key: &Scalar) -> Color {
        if let Ok(rank) = self.sorted.binary_search(key) {
            return self.palette.categorical_color(rank);
        }
        tracing::warn!(
            field = %self.field,
            value = %key,
            "value not among live field values; using hash color"
        );
        self.palette.categorical[hash_bucket(&key.to_string(), self.palette.categorical.len())]
    }

    /// Whether values are colored on the scale ramp.
    #[must_use]
    pub fn is_scale(&self) -> bool {
        self.scale
    }
}

/// Color of one value of `schema`'s field given all current values.
pub fn color_for<'a, I>(value: &FieldValue, schema: &FieldSchema, values: I, palette: &Palette) -> Color
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    FieldColors::new(schema, values, palette).color_of(value)
}

// ---------------------------------------------------------------------------
// Choropleth + legend
// ---------------------------------------------------------------------------

/// Fill color of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureColor {
    pub index: usize,
    pub name: String,
    pub color: Color,
}

/// Colors every feature of the document for `schema`'s field.
#[must_use]
pub fn paint_choropleth(
    document: &Document,
    schema: &FieldSchema,
    palette: &Palette,
    name_property: &str,
) -> Vec<FeatureColor> {
    let colors = FieldColors::new(schema, document.field_values(&schema.name), palette);
    document
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| FeatureColor {
            index,
            name: document.feature_name(index, name_property),
            color: colors.color_of(feature.field_value(&schema.name)),
        })
        .collect()
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    /// Features this row covers.
    pub count: usize,
    /// The category value; `None` for scale steps and the null bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

/// Builds the legend for a field: one row per category (or per scale step),
/// always followed by the null bucket.
pub fn build_legend<'a, I>(schema: &FieldSchema, values: I, palette: &Palette) -> Vec<LegendEntry>
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    let values: Vec<&FieldValue> = values.into_iter().collect();
    let colors = FieldColors::new(schema, values.iter().copied(), palette);
    let null_count = values.iter().filter(|v| v.is_null()).count();

    let mut entries: Vec<LegendEntry> = if colors.is_scale() {
        (SCALE_MIN..=SCALE_MAX)
            .map(|step| {
                #[allow(clippy::cast_precision_loss)]
                let color = palette.scale_color(step as f64);
                let count = values
                    .iter()
                    .filter(|v| matches!(v, FieldValue::Range(_)) && colors.color_of(v) == color)
                    .count();
                LegendEntry {
                    label: step.to_string(),
                    color,
                    count,
                    value: None,
                }
            })
            .collect()
    } else {
        colors
            .sorted_values()
            .iter()
            .enumerate()
            .map(|(rank, key)| LegendEntry {
                label: label_for_scalar(&schema.name, key),
                color: palette.categorical_color(rank),
                count: values
                    .iter()
                    .filter(|v| v.contains(key) || category_key(v).as_ref() == Some(key))
                    .count(),
                value: Some(key.clone()),
            })
            .collect()
    };

    entries.push(LegendEntry {
        label: NO_DATA.to_string(),
        color: NULL_COLOR,
        count: null_count,
        value: None,
    });
    entries
}
