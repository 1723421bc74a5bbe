//! GeoJSON document model.
//!
//! Only the parts the editor touches are typed: the feature list and each
//! feature's `properties.geo_meta`. Geometry, other properties and unknown
//! members are kept as raw JSON and written back unchanged.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::traits::DocumentProvider;
use crate::types::{FieldValue, MetadataRecord, NULL_VALUE};

/// Key under `properties` that holds the metadata record.
pub const GEO_META_KEY: &str = "geo_meta";

/// Property keys tried, in order, after the configured name property.
pub const NAME_FALLBACKS: &[&str] = &["ADMIN", "NAME", "name", "ADMIN_NAME"];

/// Errors from reading or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid GeoJSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("expected a FeatureCollection, found type {found:?}")]
    NotFeatureCollection { found: String },
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// Member names of a JSON object in the order they were read. Empty for
/// values built in code. Order does not take part in equality.
#[derive(Debug, Clone, Default)]
struct KeyOrder(Vec<String>);

impl PartialEq for KeyOrder {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl KeyOrder {
    fn of(map: &Map<String, Value>) -> Self {
        Self(map.keys().cloned().collect())
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Deduplicates `keys` and sorts them by read position. Keys that were
    /// never read keep their given order after the rest.
    fn arrange<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        let mut arranged: Vec<&str> = Vec::new();
        for key in keys {
            if !arranged.contains(&key) {
                arranged.push(key);
            }
        }
        arranged.sort_by_key(|key| {
            self.0.iter().position(|k| k.as_str() == *key).unwrap_or(usize::MAX)
        });
        arranged
    }
}

/// Removes `key` from `map` and decodes it, keeping the order of the rest.
fn take<T, E>(map: &mut Map<String, Value>, key: &str) -> Result<Option<T>, E>
where
    T: DeserializeOwned,
    E: serde::de::Error,
{
    map.shift_remove(key)
        .map(|value| serde_json::from_value(value).map_err(E::custom))
        .transpose()
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// A GeoJSON `FeatureCollection`.
///
/// Members are written back in the order they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The `type` member.
    pub kind: String,
    pub features: Vec<Feature>,
    /// Any other top-level members (`name`, `crs`, `bbox`, ...).
    pub extra: Map<String, Value>,
    order: KeyOrder,
}

/// One GeoJSON feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The `type` member.
    pub kind: String,
    /// `None` when the member is absent or null.
    pub properties: Option<Properties>,
    /// Opaque geometry.
    pub geometry: Value,
    pub extra: Map<String, Value>,
    order: KeyOrder,
}

/// Feature properties with the metadata record split out.
///
/// `geo_meta` is written back in the slot it was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// `None`: key absent. `Some(None)`: explicit null.
    #[allow(clippy::option_option)]
    pub geo_meta: Option<Option<MetadataRecord>>,
    pub other: Map<String, Value>,
    order: KeyOrder,
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut extra = Map::deserialize(deserializer)?;
        let order = KeyOrder::of(&extra);
        let kind = take::<_, D::Error>(&mut extra, "type")?.unwrap_or_else(feature_collection_type);
        let features = take::<_, D::Error>(&mut extra, "features")?.unwrap_or_default();
        Ok(Self {
            kind,
            features,
            extra,
            order,
        })
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keys = self
            .order
            .arrange(["type", "features"].into_iter().chain(self.extra.keys().map(String::as_str)));
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            match key {
                "type" => map.serialize_entry(key, &self.kind)?,
                "features" => map.serialize_entry(key, &self.features)?,
                _ => map.serialize_entry(key, &self.extra[key])?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut extra = Map::deserialize(deserializer)?;
        let order = KeyOrder::of(&extra);
        let kind = take::<_, D::Error>(&mut extra, "type")?.unwrap_or_else(feature_type);
        let properties = take::<Option<Properties>, D::Error>(&mut extra, "properties")?.flatten();
        let geometry = extra.shift_remove("geometry").unwrap_or(Value::Null);
        Ok(Self {
            kind,
            properties,
            geometry,
            extra,
            order,
        })
    }
}

impl Serialize for Feature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Built features always carry both members; read ones keep an absent
        // member absent until it gets a value.
        let built = self.order.is_empty();
        let properties = built || self.properties.is_some() || self.order.contains("properties");
        let geometry = built || !self.geometry.is_null() || self.order.contains("geometry");
        let typed = ["type"]
            .into_iter()
            .chain(properties.then_some("properties"))
            .chain(geometry.then_some("geometry"));
        let keys = self
            .order
            .arrange(typed.chain(self.extra.keys().map(String::as_str)));
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            match key {
                "type" => map.serialize_entry(key, &self.kind)?,
                "properties" => map.serialize_entry(key, &self.properties)?,
                "geometry" => map.serialize_entry(key, &self.geometry)?,
                _ => map.serialize_entry(key, &self.extra[key])?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut other = Map::deserialize(deserializer)?;
        let order = KeyOrder::of(&other);
        let geo_meta = match other.shift_remove(GEO_META_KEY) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => Some(Some(serde_json::from_value(value).map_err(D::Error::custom)?)),
        };
        Ok(Self {
            geo_meta,
            other,
            order,
        })
    }
}

impl Serialize for Properties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keys = self.order.arrange(
            self.other
                .keys()
                .map(String::as_str)
                .filter(|key| *key != GEO_META_KEY)
                .chain(self.geo_meta.is_some().then_some(GEO_META_KEY)),
        );
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            match (key, &self.geo_meta) {
                (GEO_META_KEY, Some(record)) => map.serialize_entry(key, record)?,
                _ => map.serialize_entry(key, &self.other[key])?,
            }
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

impl Feature {
    /// Creates a feature with the given name property and no metadata.
    #[must_use]
    pub fn named(name_property: &str, name: &str) -> Self {
        let mut other = Map::new();
        other.insert(name_property.to_string(), Value::String(name.to_string()));
        Self {
            kind: feature_type(),
            properties: Some(Properties {
                geo_meta: None,
                other,
                order: KeyOrder::default(),
            }),
            geometry: Value::Null,
            extra: Map::new(),
            order: KeyOrder::default(),
        }
    }

    /// Creates a feature with no properties.
    #[must_use]
    pub fn unnamed() -> Self {
        Self {
            kind: feature_type(),
            properties: None,
            geometry: Value::Null,
            extra: Map::new(),
            order: KeyOrder::default(),
        }
    }

    /// Display name from `name_property`, then [`NAME_FALLBACKS`].
    #[must_use]
    pub fn name(&self, name_property: &str) -> Option<&str> {
        let props = self.properties.as_ref()?;
        std::iter::once(name_property)
            .chain(NAME_FALLBACKS.iter().copied())
            .find_map(|key| props.other.get(key).and_then(Value::as_str))
    }

    /// The metadata record, if present and not null.
    #[must_use]
    pub fn metadata(&self) -> Option<&MetadataRecord> {
        self.properties.as_ref()?.geo_meta.as_ref()?.as_ref()
    }

    /// Mutable metadata record, if present and not null.
    pub fn metadata_mut(&mut self) -> Option<&mut MetadataRecord> {
        self.properties.as_mut()?.geo_meta.as_mut()?.as_mut()
    }

    /// Value of one metadata field; null when the record or the key is missing.
    #[must_use]
    pub fn field_value(&self, field: &str) -> &FieldValue {
        self.metadata().map_or(&NULL_VALUE, |m| m.value(field))
    }

    /// Replaces the whole metadata record.
    pub fn set_metadata(&mut self, record: MetadataRecord) {
        self.properties.get_or_insert_with(Properties::default).geo_meta = Some(Some(record));
    }

    /// Returns the metadata record, creating an empty one if needed.
    pub fn metadata_or_insert(&mut self) -> &mut MetadataRecord {
        let props = self.properties.get_or_insert_with(Properties::default);
        props
            .geo_meta
            .get_or_insert(None)
            .get_or_insert_with(MetadataRecord::new)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

impl Default for Document {
    fn default() -> Self {
        Self {
            kind: feature_collection_type(),
            features: Vec::new(),
            extra: Map::new(),
            order: KeyOrder::default(),
        }
    }
}

impl Document {
    /// Parses a GeoJSON `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] for malformed JSON and
    /// [`DocumentError::NotFeatureCollection`] for other GeoJSON types.
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_str(text).map_err(DocumentError::Parse)?;
        if document.kind != "FeatureCollection" {
            return Err(DocumentError::NotFeatureCollection {
                found: document.kind,
            });
        }
        Ok(document)
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        let mut text = serde_json::to_string_pretty(self).map_err(DocumentError::Serialize)?;
        text.push('\n');
        Ok(text)
    }

    /// Single-line JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if serialization fails.
    pub fn to_compact_json(&self) -> Result<String, DocumentError> {
        let mut text = serde_json::to_string(self).map_err(DocumentError::Serialize)?;
        text.push('\n');
        Ok(text)
    }

    /// Metadata records of all features that have one.
    pub fn metadata_records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.features.iter().filter_map(Feature::metadata)
    }

    /// One value per feature for `field`, null where missing.
    pub fn field_values<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldValue> {
        self.features.iter().map(move |f| f.field_value(field))
    }

    /// Display name of the feature at `index`, `Feature #<index>` if it has none.
    #[must_use]
    pub fn feature_name(&self, index: usize, name_property: &str) -> String {
        self.features
            .get(index)
            .and_then(|f| f.name(name_property))
            .map_or_else(|| format!("Feature #{index}"), str::to_string)
    }

    /// Index of the first feature with the given display name.
    #[must_use]
    pub fn find_feature(&self, name: &str, name_property: &str) -> Option<usize> {
        (0..self.features.len()).find(|&i| self.feature_name(i, name_property) == name)
    }
}

impl DocumentProvider for Document {
    fn features(&self) -> &[Feature] {
        &self.features
    }

    fn set_metadata_field(
        &mut self,
        index: usize,
        field: &str,
        value: FieldValue,
    ) -> Option<FieldValue> {
        let feature = self.features.get_mut(index)?;
        feature.metadata_or_insert().set(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "name": "countries",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADMIN": "Aruba", "ISO_A3": "ABW", "geo_meta": {"hemisphere": "N"}},
                "geometry": {"type": "Point", "coordinates": [-69.9, 12.5]}
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "Kenya", "geo_meta": null},
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": {"NAME": "Nowhere"},
                "geometry": null
            }
        ]
    }"#;

    // ---- parsing ----

    #[test]
    fn parses_feature_collection() {
        let doc = Document::from_json_str(SAMPLE).unwrap();
        assert_eq!(doc.features.len(), 3);
        assert_eq!(doc.extra.get("name"), Some(&Value::String("countries".into())));
        assert_eq!(doc.metadata_records().count(), 1);
    }

    #[test]
    fn distinguishes_null_and_absent_metadata() {
        let doc = Document::from_json_str(SAMPLE).unwrap();
        let kenya = doc.features[1].properties.as_ref().unwrap();
        let nowhere = doc.features[2].properties.as_ref().unwrap();
        assert_eq!(kenya.geo_meta, Some(None));
        assert_eq!(nowhere.geo_meta, None);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Document::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn rejects_non_collection() {
        let err = Document::from_json_str(r#"{"type": "Feature"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::NotFeatureCollection { .. }));
    }

    // ---- names ----

    #[test]
    fn names_use_property_then_fallbacks() {
        let doc = Document::from_json_str(SAMPLE).unwrap();
        assert_eq!(doc.feature_name(0, "ADMIN"), "Aruba");
        assert_eq!(doc.feature_name(2, "ADMIN"), "Nowhere");
        assert_eq!(doc.feature_name(0, "ISO_A3"), "ABW");
        assert_eq!(doc.find_feature("Kenya", "ADMIN"), Some(1));
        assert_eq!(doc.find_feature("Atlantis", "ADMIN"), None);
    }

    #[test]
    fn unnamed_feature_gets_index_name() {
        let mut doc = Document::default();
        doc.features.push(Feature::unnamed());
        assert_eq!(doc.feature_name(0, "ADMIN"), "Feature #0");
    }

    // ---- writing ----

    #[test]
    fn save_and_reload_is_stable() {
        let doc = Document::from_json_str(SAMPLE).unwrap();
        let first = doc.to_pretty_json().unwrap();
        let reloaded = Document::from_json_str(&first).unwrap();
        assert_eq!(reloaded, doc);
        assert_eq!(reloaded.to_pretty_json().unwrap(), first);
        assert!(first.ends_with('\n'));
        assert!(first.contains("\"geo_meta\": null"));
    }

    const ORDERED: &str = r#"{
  "name": "countries",
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": 7,
      "geometry": {
        "coordinates": [
          -69.97,
          12.52
        ],
        "type": "Point"
      },
      "properties": {
        "ADMIN": "Aruba",
        "geo_meta": {
          "soil_color": [
            "red",
            "brown"
          ],
          "arid_lush": {
            "min": 1,
            "max": 2
          },
          "road_lines": {
            "inner": [
              {
                "number": "single",
                "color": "white",
                "pattern": "dashed"
              }
            ],
            "outer": []
          },
          "hemisphere": "N",
          "elevation": 12.5
        },
        "ISO_A3": "ABW"
      }
    },
    {
      "type": "Feature",
      "properties": null
    }
  ],
  "crs": {
    "type": "name"
  }
}
"#;

    #[test]
    fn unedited_document_is_written_back_byte_for_byte() {
        let doc = Document::from_json_str(ORDERED).unwrap();
        assert_eq!(doc.to_pretty_json().unwrap(), ORDERED);
    }

    #[test]
    fn edited_field_keeps_geo_meta_slot() {
        let mut doc = Document::from_json_str(ORDERED).unwrap();
        doc.set_metadata_field(0, "hemisphere", FieldValue::text("S"));
        let expected = ORDERED.replace("\"hemisphere\": \"N\"", "\"hemisphere\": \"S\"");
        assert_eq!(doc.to_pretty_json().unwrap(), expected);
    }

    #[test]
    fn new_metadata_goes_after_existing_properties() {
        let mut doc = Document::from_json_str(ORDERED).unwrap();
        doc.set_metadata_field(1, "hemisphere", FieldValue::text("S"));
        let text = doc.to_compact_json().unwrap();
        assert!(text.contains(r#"{"type":"Feature","properties":{"geo_meta":{"hemisphere":"S"}}}"#));
    }

    #[test]
    fn built_features_carry_geometry_and_properties() {
        let mut doc = Document::default();
        doc.features.push(Feature::named("ADMIN", "Aruba"));
        doc.features.push(Feature::unnamed());
        let text = doc.to_compact_json().unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"type":"FeatureCollection","features":["#,
                r#"{"type":"Feature","properties":{"ADMIN":"Aruba"},"geometry":null},"#,
                r#"{"type":"Feature","properties":null,"geometry":null}]}"#,
                "\n"
            )
        );
    }

    #[test]
    fn set_field_creates_metadata() {
        let mut doc = Document::from_json_str(SAMPLE).unwrap();
        let previous = doc.set_metadata_field(2, "hemisphere", FieldValue::text("S"));
        assert_eq!(previous, None);
        assert_eq!(doc.features[2].field_value("hemisphere"), &FieldValue::text("S"));
        assert!(doc.set_metadata_field(99, "hemisphere", FieldValue::Null).is_none());
    }

    #[test]
    fn field_values_yield_null_for_missing() {
        let doc = Document::from_json_str(SAMPLE).unwrap();
        let values: Vec<&FieldValue> = doc.field_values("hemisphere").collect();
        assert_eq!(values, vec![&FieldValue::text("N"), &FieldValue::Null, &FieldValue::Null]);
    }
}
