//! In-place document migrations applied at load time.
//!
//! Both passes are idempotent and report what they changed.

use serde::Serialize;
use tracing::info;

use crate::document::Document;
use crate::known::HEMISPHERE;
use crate::types::{FieldValue, MetadataRecord};

/// Counts of what [`ensure_full_metadata`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Features that had no metadata record and received an all-null one.
    pub records_created: usize,
    /// Missing fields filled with explicit null across existing records.
    pub fields_added: usize,
}

impl MigrationReport {
    /// `true` if the document was not touched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.records_created == 0 && self.fields_added == 0
    }
}

/// Gives every feature a record holding every one of `field_names`.
pub fn ensure_full_metadata<S: AsRef<str>>(document: &mut Document, field_names: &[S]) -> MigrationReport {
    let mut report = MigrationReport::default();
    for feature in &mut document.features {
        if feature.metadata().is_none() {
            feature.set_metadata(MetadataRecord::all_null(field_names));
            report.records_created += 1;
            continue;
        }
        let record = feature.metadata_or_insert();
        for name in field_names {
            let name = name.as_ref();
            if !record.contains_field(name) {
                record.set(name, FieldValue::Null);
                report.fields_added += 1;
            }
        }
    }
    if !report.is_noop() {
        info!(
            records_created = report.records_created,
            fields_added = report.fields_added,
            "stubbed missing metadata"
        );
    }
    report
}

/// Rewrites single-element `hemisphere` lists to the bare value. Returns the
/// number of records changed.
pub fn normalize_legacy_shapes(document: &mut Document) -> usize {
    let mut changed = 0;
    for feature in &mut document.features {
        let Some(record) = feature.metadata_mut() else {
            continue;
        };
        if let Some(FieldValue::List(items)) = record.get(HEMISPHERE) {
            if let [single] = items.as_slice() {
                let bare = FieldValue::Scalar(single.clone());
                record.set(HEMISPHERE, bare);
                changed += 1;
            }
        }
    }
    if changed > 0 {
        info!(records = changed, field = HEMISPHERE, "normalized legacy list values");
    }
    changed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::known::known_field_names;

    fn document() -> Document {
        Document::from_json_str(
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "A",
                        "geo_meta": {"hemisphere": ["N"], "driving_side": ["left"]}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "B",
                        "geo_meta": {"hemisphere": ["N", "S"]}}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "C"}},
                    {"type": "Feature", "geometry": null, "properties": {"ADMIN": "D", "geo_meta": null}}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn stubs_every_feature() {
        let mut doc = document();
        let names = known_field_names();
        let report = ensure_full_metadata(&mut doc, &names);

        assert_eq!(report.records_created, 2);
        assert_eq!(report.fields_added, 7 + 8);
        for feature in &doc.features {
            let record = feature.metadata().unwrap();
            assert_eq!(record.len(), names.len());
        }
        assert_eq!(doc.features[0].field_value("driving_side"), &FieldValue::text_list(&["left"]));
        assert!(doc.features[2].metadata().unwrap().is_all_null());

        assert!(ensure_full_metadata(&mut doc, &names).is_noop());
    }

    #[test]
    fn normalizes_single_element_hemisphere() {
        let mut doc = document();
        assert_eq!(normalize_legacy_shapes(&mut doc), 1);
        assert_eq!(doc.features[0].field_value(HEMISPHERE), &FieldValue::text("N"));
        // Multi-element lists are left for validation to report.
        assert!(matches!(doc.features[1].field_value(HEMISPHERE), FieldValue::List(_)));
        assert_eq!(normalize_legacy_shapes(&mut doc), 0);
    }
}
