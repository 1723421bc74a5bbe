//! Load, inspect, color, edit, save and reload a small document through the
//! public API of both crates.

use std::sync::{Arc, Mutex};

use geometa_core::color::{color_for, FeatureColor, LegendEntry, Palette, NULL_COLOR};
use geometa_core::inference::FieldType;
use geometa_core::traits::{NotificationSink, RenderSink};
use geometa_core::types::{FieldValue, Scalar};
use geometa_editor::{EditorConfig, EditorSession, FileSource, StaticSource};
use proptest::prelude::*;
use serde_json::json;

#[derive(Default)]
struct Sink {
    messages: Mutex<Vec<String>>,
}

impl RenderSink for Sink {
    fn paint_choropleth(&self, _field: &str, _colors: &[FeatureColor]) -> anyhow::Result<()> {
        Ok(())
    }

    fn show_legend(&self, _field: &str, _entries: &[LegendEntry]) -> anyhow::Result<()> {
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl NotificationSink for Sink {
    fn notify(&self, messages: &[String]) {
        self.messages.lock().unwrap().extend_from_slice(messages);
    }
}

fn new_session() -> EditorSession {
    let sink = Arc::new(Sink::default());
    EditorSession::new(EditorConfig::default(), sink.clone(), sink).unwrap()
}

fn aruba_kenya_json() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "name": "countries",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-69.97, 12.52]},
                "properties": {
                    "ADMIN": "Aruba",
                    "ISO_A3": "ABW",
                    "geo_meta": {
                        "driving_side": ["left"],
                        "hemisphere": "N",
                        "road_lines": {
                            "inner": [{"number": "single", "color": "white", "pattern": "dashed"}],
                            "outer": []
                        },
                        "road_quality": ["maintained"],
                        "has_official_coverage": true,
                        "arid_lush": {"min": 1, "max": 2},
                        "cold_hot": {"min": 4, "max": 5},
                        "flat_mountainous": {"min": 1, "max": 1},
                        "soil_color": ["brown", "red"]
                    }
                }
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [37.9, 0.02]},
                "properties": {
                    "ADMIN": "Kenya",
                    "ISO_A3": "KEN",
                    "geo_meta": {
                        "driving_side": null,
                        "hemisphere": null,
                        "road_lines": null,
                        "road_quality": null,
                        "has_official_coverage": null,
                        "arid_lush": null,
                        "cold_hot": null,
                        "flat_mountainous": null,
                        "soil_color": null
                    }
                }
            }
        ]
    })
}

fn aruba_kenya() -> String {
    aruba_kenya_json().to_string()
}

/// The same document as a pretty-printed file, the way the editor writes it.
fn aruba_kenya_file() -> String {
    let mut text = serde_json::to_string_pretty(&aruba_kenya_json()).unwrap();
    text.push('\n');
    text
}

#[tokio::test]
async fn aruba_kenya_scenario() {
    let mut session = new_session();
    let summary = session
        .load_from(&StaticSource(aruba_kenya()))
        .await
        .unwrap();
    assert_eq!(summary.features, 2);
    assert_eq!(summary.fields, 9);
    assert!(!summary.fallback);

    let schema = session.schemas().get("driving_side").unwrap().clone();
    assert_eq!(schema.field_type, FieldType::Array);
    assert_eq!(schema.possible_values, vec![Scalar::text("left")]);

    let document = session.document().unwrap();
    let palette = Palette::default_palette();
    let values: Vec<&FieldValue> = document.field_values("driving_side").collect();
    let left = FieldValue::text_list(&["left"]);
    assert_eq!(
        color_for(&left, &schema, values.iter().copied(), palette),
        palette.categorical_color(0)
    );
    assert_eq!(
        color_for(&FieldValue::Null, &schema, values.iter().copied(), palette),
        NULL_COLOR
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("countries.geojson");
    session.save_to_file(&path).await.unwrap();

    let mut reloaded = new_session();
    reloaded.load_from(&FileSource::new(&path)).await.unwrap();

    let before = session.document().unwrap();
    let after = reloaded.document().unwrap();
    for (a, b) in before.features.iter().zip(&after.features) {
        let a = serde_json::to_string(a.metadata().unwrap()).unwrap();
        let b = serde_json::to_string(b.metadata().unwrap()).unwrap();
        assert_eq!(a, b);
    }
    // Pass-through members survive too.
    assert_eq!(reloaded.to_json().unwrap(), session.to_json().unwrap());
    assert_eq!(after.extra.get("name"), Some(&json!("countries")));
}

#[tokio::test]
async fn saving_unedited_document_is_stable() {
    let input = aruba_kenya_file();
    let mut session = new_session();
    session.load_str(&input).unwrap();
    let first = session.to_json().unwrap();
    assert_eq!(first, input);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.geojson");
    session.save_to_file(&path).await.unwrap();
    let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(on_disk, input);

    session.load_str(&on_disk).unwrap();
    assert_eq!(session.to_json().unwrap(), input);
}

#[tokio::test]
async fn failed_fetch_installs_nothing() {
    let mut session = new_session();
    session.load_str(&aruba_kenya()).unwrap();
    let result = session
        .load_from(&FileSource::new("/nonexistent/countries.geojson"))
        .await;
    assert!(result.is_err());
    assert_eq!(session.feature_names(), vec!["Aruba", "Kenya"]);
}

#[test]
fn all_null_document_falls_back_to_known_fields() {
    let mut session = new_session();
    let text = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": null,
             "properties": {"ADMIN": "Kenya", "geo_meta": {"driving_side": null, "population": null}}}
        ]
    })
    .to_string();
    let summary = session.load_str(&text).unwrap();
    assert!(summary.fallback);
    assert_eq!(summary.fields, 10);
    assert_eq!(session.schemas().get("arid_lush").unwrap().field_type, FieldType::Scale);
    assert_eq!(session.schemas().get("population").unwrap().field_type, FieldType::Unknown);
}

fn mass_edit_values() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        Just(FieldValue::text_list(&["left"])),
        Just(FieldValue::text_list(&["right"])),
        Just(FieldValue::text_list(&["left", "right"])),
    ]
}

proptest! {
    #[test]
    fn mass_edit_is_idempotent(value in mass_edit_values(), both in any::<bool>()) {
        let names: &[&str] = if both { &["Aruba", "Kenya"] } else { &["Kenya"] };

        let mut once = new_session();
        once.load_str(&aruba_kenya()).unwrap();
        once.mass_commit(names, "driving_side", value.clone()).unwrap();

        let mut twice = new_session();
        twice.load_str(&aruba_kenya()).unwrap();
        twice.mass_commit(names, "driving_side", value.clone()).unwrap();
        let changed = twice.mass_commit(names, "driving_side", value).unwrap();

        prop_assert_eq!(changed, 0);
        prop_assert_eq!(once.to_json().unwrap(), twice.to_json().unwrap());
    }
}
