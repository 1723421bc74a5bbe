//! Editor session: the single owner of application state.
//!
//! All document mutation goes through three operations: [`EditorSession::load_str`]
//! (or [`EditorSession::load_from`]), [`EditorSession::commit_edit`] and
//! [`EditorSession::mass_commit`]. Each one re-infers the schema set and
//! rebuilds the form afterwards. The selected field, palette and filter are
//! view state; changing them only repaints.
//!
//! Errors are both returned and forwarded to the [`NotificationSink`], so a UI
//! can ignore the `Result` and still show the user what went wrong.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use geometa_core::color::{self, FeatureColor, Palette, NULL_COLOR};
use geometa_core::document::Document;
use geometa_core::filter::{filter_features, FeatureFilter};
use geometa_core::form::{render_field, EditorForm, FieldWidget};
use geometa_core::format::{format_value, parse_label, FormatStyle, NO_DATA};
use geometa_core::inference::{infer_schemas, SchemaSet};
use geometa_core::json_schema::to_json_schema;
use geometa_core::known::known_field_names;
use geometa_core::migrate::{ensure_full_metadata, normalize_legacy_shapes, MigrationReport};
use geometa_core::stats::{document_statistics, FieldStatistics};
use geometa_core::traits::{DocumentProvider, NotificationSink, RenderSink};
use geometa_core::types::{FieldValue, MetadataRecord};
use geometa_core::validation::{validate, validate_field_change, ValidationResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::source::DocumentSource;

/// What a load installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub features: usize,
    pub fields: usize,
    /// Whether the known-fields fallback shaped the schema set.
    pub fallback: bool,
    /// Records whose legacy value shapes were rewritten.
    pub normalized: usize,
    pub migration: MigrationReport,
}

/// Application state of one editor window.
pub struct EditorSession {
    config: EditorConfig,
    document: Option<Document>,
    schemas: SchemaSet,
    form: EditorForm,
    editing: Option<usize>,
    selected_field: Option<String>,
    palette: &'static Palette,
    filter: Option<FeatureFilter>,
    renderer: Arc<dyn RenderSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("features", &self.document.as_ref().map(|d| d.features.len()))
            .field("fields", &self.schemas.len())
            .field("editing", &self.editing)
            .field("selected_field", &self.selected_field)
            .field("palette", &self.palette.name)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Creates an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnknownPalette`] if the configured palette does not exist.
    pub fn new(
        config: EditorConfig,
        renderer: Arc<dyn RenderSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, EditorError> {
        let palette = Palette::named(&config.palette).ok_or_else(|| EditorError::UnknownPalette {
            name: config.palette.clone(),
        })?;
        let form = EditorForm::synthesize(&SchemaSet::default(), &config.form);
        Ok(Self {
            config,
            document: None,
            schemas: SchemaSet::default(),
            form,
            editing: None,
            selected_field: None,
            palette,
            filter: None,
            renderer,
            notifier,
        })
    }

    // -----------------------------------------------------------------------
    // Load / save
    // -----------------------------------------------------------------------

    /// Fetches and installs a document.
    ///
    /// # Errors
    ///
    /// [`EditorError::Fetch`] if the source fails, otherwise as [`Self::load_str`].
    /// On error the previous document stays installed.
    pub async fn load_from(&mut self, source: &dyn DocumentSource) -> Result<LoadSummary, EditorError> {
        debug!(source = %source.describe(), "fetching document");
        let text = match source.fetch().await {
            Ok(text) => text,
            Err(e) => {
                return Err(self.report(EditorError::Fetch {
                    location: source.describe(),
                    message: format!("{e:#}"),
                }));
            }
        };
        self.load_str(&text)
    }

    /// Parses and installs a document, replacing any open edit.
    ///
    /// # Errors
    ///
    /// [`EditorError::Document`] if the text is not a `FeatureCollection`.
    /// Nothing is installed in that case.
    pub fn load_str(&mut self, text: &str) -> Result<LoadSummary, EditorError> {
        let mut document = Document::from_json_str(text).map_err(|e| self.report(e.into()))?;

        let normalized = if self.config.normalize_legacy {
            normalize_legacy_shapes(&mut document)
        } else {
            0
        };
        let migration = if self.config.stub_missing_metadata {
            let mut names: BTreeSet<String> =
                known_field_names().into_iter().map(str::to_string).collect();
            names.extend(document.metadata_records().flat_map(|r| r.field_names().map(str::to_string)));
            ensure_full_metadata(&mut document, &names.into_iter().collect::<Vec<_>>())
        } else {
            MigrationReport::default()
        };

        self.document = Some(document);
        self.editing = None;
        self.reinfer();
        if let Some(field) = &self.selected_field {
            if self.schemas.get(field).is_none() {
                self.selected_field = None;
            }
        }

        let summary = LoadSummary {
            features: self.document.as_ref().map_or(0, |d| d.features.len()),
            fields: self.schemas.len(),
            fallback: self.schemas.is_fallback(),
            normalized,
            migration,
        };
        info!(
            features = summary.features,
            fields = summary.fields,
            fallback = summary.fallback,
            "document loaded"
        );
        self.refresh_view();
        Ok(summary)
    }

    /// Serializes the current document, pretty or compact per configuration.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoDocument`] or a serialization error.
    pub fn to_json(&self) -> Result<String, EditorError> {
        let document = self.document()?;
        let text = if self.config.pretty_output {
            document.to_pretty_json()?
        } else {
            document.to_compact_json()?
        };
        Ok(text)
    }

    /// Writes the current document to `path`.
    ///
    /// # Errors
    ///
    /// As [`Self::to_json`], or [`EditorError::Io`] if the write fails.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        let text = self.to_json()?;
        tokio::fs::write(path.as_ref(), text.as_bytes()).await?;
        info!(path = %path.as_ref().display(), bytes = text.len(), "document saved");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Single-feature edit
    // -----------------------------------------------------------------------

    /// Opens the editor form for a feature and fills it from its metadata.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoDocument`] or [`EditorError::UnknownFeature`].
    pub fn open_editor(&mut self, name: &str) -> Result<&mut EditorForm, EditorError> {
        let index = self.feature_index(name)?;
        let record = self.document()?.features[index].metadata().cloned();
        self.form.populate(record.as_ref());
        self.editing = Some(index);
        debug!(feature = name, "editor opened");
        Ok(&mut self.form)
    }

    /// Collects the form, validates it and writes it to the feature being edited.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotEditing`], a collection error, or
    /// [`EditorError::Validation`]. On error the form keeps its input and the
    /// edit stays open.
    pub fn commit_edit(&mut self) -> Result<MetadataRecord, EditorError> {
        let index = self.editing.ok_or(EditorError::NotEditing)?;
        let record = self.form.collect().map_err(|e| self.report(e.into()))?;
        if let ValidationResult::Invalid { errors } = ValidationResult::from(validate(&record)) {
            return Err(self.report(EditorError::Validation { errors }));
        }

        let name = self.feature_name(index);
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        for (field, value) in record.iter() {
            document.set_metadata_field(index, field, value.clone());
        }
        self.editing = None;
        self.reinfer();
        info!(feature = %name, fields = record.len(), "metadata committed");
        self.refresh_view();
        Ok(record)
    }

    /// Closes the editor without writing.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.form.populate(None);
    }

    // -----------------------------------------------------------------------
    // Mass edit
    // -----------------------------------------------------------------------

    /// A fresh widget for entering a mass-edit value of `field`.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownField`] if the field is not in the schema set.
    pub fn mass_edit_widget(&self, field: &str) -> Result<FieldWidget, EditorError> {
        let schema = self.schemas.get(field).ok_or_else(|| EditorError::UnknownField {
            field: field.to_string(),
        })?;
        Ok(render_field(schema, &self.config.form))
    }

    /// Collects `widget` and applies its value with [`Self::mass_commit`].
    ///
    /// # Errors
    ///
    /// A collection error, or anything [`Self::mass_commit`] returns.
    pub fn mass_commit_widget(&mut self, names: &[&str], widget: &FieldWidget) -> Result<usize, EditorError> {
        let value = widget
            .collect(&self.config.form)
            .map_err(|e| self.report(e.into()))?;
        self.mass_commit(names, &widget.field, value)
    }

    /// Sets one field to `value` on every named feature.
    ///
    /// Every affected record is validated with the new value first; if any
    /// fails, nothing is written. Returns how many records actually changed.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoDocument`], [`EditorError::UnknownField`],
    /// [`EditorError::UnknownFeature`] or [`EditorError::Validation`].
    pub fn mass_commit(&mut self, names: &[&str], field: &str, value: FieldValue) -> Result<usize, EditorError> {
        if self.schemas.get(field).is_none() {
            return Err(self.report(EditorError::UnknownField {
                field: field.to_string(),
            }));
        }
        let indices = names
            .iter()
            .map(|name| self.feature_index(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.report(e))?;

        let document = self.document()?;
        let result = validate_field_change(document, &indices, field, &value, &self.config.name_property);
        if let ValidationResult::Invalid { errors } = result {
            return Err(self.report(EditorError::Validation { errors }));
        }

        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;
        let mut changed = 0;
        for &index in &indices {
            let previous = document.set_metadata_field(index, field, value.clone());
            if previous.as_ref() != Some(&value) {
                changed += 1;
            }
        }
        self.reinfer();
        info!(field, features = indices.len(), changed, "mass edit committed");
        self.refresh_view();
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    /// Selects the field to color by, or clears the selection.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownField`] if the field is not in the schema set.
    pub fn select_field(&mut self, field: Option<&str>) -> Result<(), EditorError> {
        if let Some(f) = field {
            if self.schemas.get(f).is_none() {
                return Err(self.report(EditorError::UnknownField { field: f.to_string() }));
            }
        }
        self.selected_field = field.map(str::to_string);
        self.refresh_view();
        Ok(())
    }

    /// Switches the palette. Color ranks are unaffected.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownPalette`] if no palette has that name.
    pub fn set_palette(&mut self, name: &str) -> Result<(), EditorError> {
        let Some(palette) = Palette::named(name) else {
            return Err(self.report(EditorError::UnknownPalette {
                name: name.to_string(),
            }));
        };
        self.palette = palette;
        info!(palette = name, "palette switched");
        self.refresh_view();
        Ok(())
    }

    /// Sets or clears the feature filter. Filtered-out features paint gray.
    pub fn set_filter(&mut self, filter: Option<FeatureFilter>) {
        self.filter = filter;
        self.refresh_view();
    }

    /// Filters to the features whose `field` shows `label` in the legend or
    /// a tooltip. The no-data label selects features where the field is null.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownField`] if the field is not in the schema set.
    pub fn filter_by_label(&mut self, field: &str, label: &str) -> Result<(), EditorError> {
        let filter = match self.schemas.get(field) {
            Some(_) if label == NO_DATA => FeatureFilter::FieldIsNull {
                field: field.to_string(),
            },
            Some(schema) => FeatureFilter::field_equals(field, parse_label(schema, label)),
            None => {
                return Err(self.report(EditorError::UnknownField {
                    field: field.to_string(),
                }))
            }
        };
        debug!(field, label, "filtering by label");
        self.set_filter(Some(filter));
        Ok(())
    }

    /// Pushes choropleth colors and the legend for the selected field to the
    /// render sink, or clears it when nothing is selected.
    ///
    /// # Errors
    ///
    /// [`EditorError::Internal`] if the sink fails.
    pub fn render(&self) -> Result<(), EditorError> {
        let (Some(document), Some(field)) = (&self.document, &self.selected_field) else {
            self.renderer.clear()?;
            return Ok(());
        };
        let Some(schema) = self.schemas.get(field) else {
            self.renderer.clear()?;
            return Ok(());
        };
        let colors = self.choropleth(document, field)?;
        self.renderer.paint_choropleth(field, &colors)?;
        let legend = color::build_legend(schema, document.field_values(field), self.palette);
        self.renderer.show_legend(field, &legend)?;
        Ok(())
    }

    fn choropleth(&self, document: &Document, field: &str) -> Result<Vec<FeatureColor>, EditorError> {
        let schema = self.schemas.get(field).ok_or_else(|| EditorError::UnknownField {
            field: field.to_string(),
        })?;
        let mut colors = color::paint_choropleth(document, schema, self.palette, &self.config.name_property);
        if let Some(filter) = &self.filter {
            for entry in &mut colors {
                if !filter.matches(document, entry.index, &self.config.name_property) {
                    entry.color = NULL_COLOR;
                }
            }
        }
        Ok(colors)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Display names of all features, in document order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.document.as_ref().map_or_else(Vec::new, |d| {
            (0..d.features.len())
                .map(|i| d.feature_name(i, &self.config.name_property))
                .collect()
        })
    }

    /// Names of the features that pass the current filter.
    #[must_use]
    pub fn visible_feature_names(&self) -> Vec<String> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        let indices = match &self.filter {
            Some(filter) => filter_features(document, filter, &self.config.name_property),
            None => (0..document.features.len()).collect(),
        };
        indices
            .into_iter()
            .map(|i| document.feature_name(i, &self.config.name_property))
            .collect()
    }

    /// Display name and formatted value of every schema field for one feature.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoDocument`] or [`EditorError::UnknownFeature`].
    pub fn describe_feature(&self, name: &str, style: FormatStyle) -> Result<Vec<(String, String)>, EditorError> {
        let index = self.feature_index(name)?;
        let feature = &self.document()?.features[index];
        Ok(self
            .schemas
            .iter()
            .map(|schema| {
                let value = feature.field_value(&schema.name);
                (schema.display_name.clone(), format_value(&schema.name, value, style))
            })
            .collect())
    }

    /// Per-field statistics of the current document.
    #[must_use]
    pub fn statistics(&self) -> Vec<FieldStatistics> {
        self.document
            .as_ref()
            .map_or_else(Vec::new, |d| document_statistics(d, &self.schemas))
    }

    /// JSON Schema of the current schema set.
    #[must_use]
    pub fn json_schema(&self) -> serde_json::Value {
        to_json_schema(&self.schemas)
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The loaded document.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoDocument`] before the first successful load.
    pub fn document(&self) -> Result<&Document, EditorError> {
        self.document.as_ref().ok_or(EditorError::NoDocument)
    }

    #[must_use]
    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    #[must_use]
    pub fn form(&self) -> &EditorForm {
        &self.form
    }

    /// Mutable form, for UI input while an edit is open.
    pub fn form_mut(&mut self) -> &mut EditorForm {
        &mut self.form
    }

    /// Index of the feature being edited.
    #[must_use]
    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    #[must_use]
    pub fn selected_field(&self) -> Option<&str> {
        self.selected_field.as_deref()
    }

    #[must_use]
    pub fn palette(&self) -> &'static Palette {
        self.palette
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reinfer(&mut self) {
        self.schemas = self
            .document
            .as_ref()
            .map_or_else(SchemaSet::default, |d| infer_schemas(d.metadata_records()));
        self.form = EditorForm::synthesize(&self.schemas, &self.config.form);
    }

    fn feature_index(&self, name: &str) -> Result<usize, EditorError> {
        self.document()?
            .find_feature(name, &self.config.name_property)
            .ok_or_else(|| EditorError::UnknownFeature {
                name: name.to_string(),
            })
    }

    fn feature_name(&self, index: usize) -> String {
        self.document
            .as_ref()
            .map_or_else(String::new, |d| d.feature_name(index, &self.config.name_property))
    }

    fn refresh_view(&self) {
        if let Err(e) = self.render() {
            warn!(error = %e, "render failed");
        }
    }

    fn report(&self, error: EditorError) -> EditorError {
        warn!(error = %error, "editor operation failed");
        self.notifier.notify(&error.messages());
        error
    }
}
