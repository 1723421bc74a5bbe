//! Feature filtering for the list view.

use regex::Regex;

use crate::document::Document;
use crate::types::Scalar;

/// Predicate over a feature, evaluated against its metadata and name.
#[derive(Debug, Clone)]
pub enum FeatureFilter {
    /// Field equals `value`, or contains it when the field holds a list.
    FieldEquals { field: String, value: Scalar },
    /// Field is null or missing.
    FieldIsNull { field: String },
    /// Display name matches the pattern.
    NameMatches(Regex),
    /// Every inner filter matches. An empty list matches everything.
    All(Vec<FeatureFilter>),
}

impl FeatureFilter {
    /// Case-insensitive name filter.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn name_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::NameMatches(Regex::new(&format!("(?i){pattern}"))?))
    }

    /// Convenience for [`FeatureFilter::FieldEquals`].
    #[must_use]
    pub fn field_equals(field: &str, value: impl Into<Scalar>) -> Self {
        Self::FieldEquals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Whether the feature at `index` passes.
    #[must_use]
    pub fn matches(&self, document: &Document, index: usize, name_property: &str) -> bool {
        let Some(feature) = document.features.get(index) else {
            return false;
        };
        match self {
            Self::FieldEquals { field, value } => feature.field_value(field).contains(value),
            Self::FieldIsNull { field } => feature.field_value(field).is_null(),
            Self::NameMatches(re) => re.is_match(&document.feature_name(index, name_property)),
            Self::All(filters) => filters
                .iter()
                .all(|f| f.matches(document, index, name_property)),
        }
    }
}

/// Indices of the features that pass `filter`, in document order.
#[must_use]
pub fn filter_features(document: &Document, filter: &FeatureFilter, name_property: &str) -> Vec<usize> {
    (0..document.features.len())
        .filter(|&i| filter.matches(document, i, name_property))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> Document {
        Document::from_json_str(
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "Kenya",
                        "geo_meta": {"driving_side": ["left"], "hemisphere": "S"}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "Aruba",
                        "geo_meta": {"driving_side": ["right"], "hemisphere": "N"}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "Kiribati"}}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn list_membership_and_scalar_equality() {
        let doc = document();
        let left = FeatureFilter::field_equals("driving_side", "left");
        assert_eq!(filter_features(&doc, &left, "ADMIN"), vec![0]);
        let north = FeatureFilter::field_equals("hemisphere", "N");
        assert_eq!(filter_features(&doc, &north, "ADMIN"), vec![1]);
    }

    #[test]
    fn null_filter_includes_missing_metadata() {
        let doc = document();
        let filter = FeatureFilter::FieldIsNull {
            field: "hemisphere".to_string(),
        };
        assert_eq!(filter_features(&doc, &filter, "ADMIN"), vec![2]);
    }

    #[test]
    fn name_pattern_is_case_insensitive() {
        let doc = document();
        let filter = FeatureFilter::name_pattern("^k").unwrap();
        assert_eq!(filter_features(&doc, &filter, "ADMIN"), vec![0, 2]);
        assert!(FeatureFilter::name_pattern("(").is_err());
    }

    #[test]
    fn all_combines() {
        let doc = document();
        let filter = FeatureFilter::All(vec![
            FeatureFilter::name_pattern("^k").unwrap(),
            FeatureFilter::field_equals("hemisphere", "S"),
        ]);
        assert_eq!(filter_features(&doc, &filter, "ADMIN"), vec![0]);
        assert_eq!(filter_features(&doc, &FeatureFilter::All(vec![]), "ADMIN").len(), 3);
        assert!(!filter.matches(&doc, 99, "ADMIN"));
    }
}
