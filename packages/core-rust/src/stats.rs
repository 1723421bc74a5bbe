//! Per-field value statistics for the coverage panel.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::Document;
use crate::format::label_for_scalar;
use crate::inference::{category_key, FieldSchema, SchemaSet};
use crate::types::{FieldValue, Scalar};

/// How many features carry one category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: Scalar,
    pub label: String,
    pub count: usize,
}

/// Aggregate over the ranges of a scale field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSummary {
    pub lowest_min: i64,
    pub highest_max: i64,
    pub mean_midpoint: f64,
}

/// Coverage and distribution of one field across a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatistics {
    pub field: String,
    pub display_name: String,
    /// Features considered.
    pub total: usize,
    /// Features with a non-null value.
    pub with_data: usize,
    pub null_count: usize,
    /// Category counts, sorted by value. List elements count individually.
    pub value_counts: Vec<ValueCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleSummary>,
}

impl FieldStatistics {
    /// Share of features with data, in `0.0..=1.0`.
    #[must_use]
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.with_data as f64 / self.total as f64;
        ratio
    }
}

/// Computes statistics of `schema`'s field over one value per feature.
pub fn field_statistics<'a, I>(schema: &FieldSchema, values: I) -> FieldStatistics
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    let mut total = 0;
    let mut null_count = 0;
    let mut counts: BTreeMap<Scalar, usize> = BTreeMap::new();
    let mut ranges = Vec::new();

    for value in values {
        total += 1;
        match value {
            FieldValue::Null => null_count += 1,
            FieldValue::List(items) => {
                for item in items {
                    *counts.entry(item.clone()).or_default() += 1;
                }
            }
            FieldValue::Range(range) => ranges.push(*range),
            other => {
                if let Some(key) = category_key(other) {
                    *counts.entry(key).or_default() += 1;
                }
            }
        }
    }

    let scale = (!ranges.is_empty()).then(|| {
        #[allow(clippy::cast_precision_loss)]
        let mean = ranges.iter().map(|r| r.midpoint()).sum::<f64>() / ranges.len() as f64;
        ScaleSummary {
            lowest_min: ranges.iter().map(|r| r.min).min().unwrap_or_default(),
            highest_max: ranges.iter().map(|r| r.max).max().unwrap_or_default(),
            mean_midpoint: mean,
        }
    });

    FieldStatistics {
        field: schema.name.clone(),
        display_name: schema.display_name.clone(),
        total,
        with_data: total - null_count,
        null_count,
        value_counts: counts
            .into_iter()
            .map(|(value, count)| ValueCount {
                label: label_for_scalar(&schema.name, &value),
                value,
                count,
            })
            .collect(),
        scale,
    }
}

/// Statistics for every schema field, in field-name order.
#[must_use]
pub fn document_statistics(document: &Document, schemas: &SchemaSet) -> Vec<FieldStatistics> {
    schemas
        .iter()
        .map(|schema| field_statistics(schema, document.field_values(&schema.name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::inference::infer_schemas;

    fn document() -> Document {
        Document::from_json_str(
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "A",
                        "geo_meta": {"driving_side": ["left"], "arid_lush": {"min": 1, "max": 3}}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "B",
                        "geo_meta": {"driving_side": ["left", "right"], "arid_lush": {"min": 3, "max": 5}}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "C",
                        "geo_meta": {"driving_side": null, "arid_lush": null}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "D"}}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn counts_list_elements_and_nulls() {
        let doc = document();
        let schemas = infer_schemas(doc.metadata_records());
        let stats = document_statistics(&doc, &schemas);
        let driving = stats.iter().find(|s| s.field == "driving_side").unwrap();

        assert_eq!(driving.total, 4);
        assert_eq!(driving.with_data, 2);
        assert_eq!(driving.null_count, 2);
        assert_eq!(driving.value_counts.len(), 2);
        assert_eq!(driving.value_counts[0].label, "Left");
        assert_eq!(driving.value_counts[0].count, 2);
        assert_eq!(driving.value_counts[1].count, 1);
        assert!((driving.coverage() - 0.5).abs() < f64::EPSILON);
        assert!(driving.scale.is_none());
    }

    #[test]
    fn summarizes_scale_ranges() {
        let doc = document();
        let schemas = infer_schemas(doc.metadata_records());
        let schema = schemas.get("arid_lush").unwrap();
        let stats = field_statistics(schema, doc.field_values("arid_lush"));
        let scale = stats.scale.unwrap();

        assert_eq!(scale.lowest_min, 1);
        assert_eq!(scale.highest_max, 5);
        assert!((scale.mean_midpoint - 3.0).abs() < f64::EPSILON);
        assert!(stats.value_counts.is_empty());
    }

    #[test]
    fn empty_input() {
        let stats = field_statistics(&FieldSchema::unknown("x"), std::iter::empty());
        assert_eq!(stats.total, 0);
        assert!(stats.coverage().abs() < f64::EPSILON);
    }
}
