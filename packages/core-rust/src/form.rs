//! Schema-driven editor forms.
//!
//! [`render_field`] turns a [`FieldSchema`] into a [`FieldWidget`] whose
//! [`Control`] describes the input the UI should draw. A widget is filled from
//! a stored value with [`FieldWidget::populate`] and read back with
//! [`FieldWidget::collect`]; the two are inverses for every well-formed value.
//!
//! Because fields are discovered from data, the whole form is rebuilt on each
//! document load via [`EditorForm::synthesize`], which always starts from a
//! clean slate.
//!
//! # Partial input
//!
//! A scale with only one bound typed, or a road-line entry with an empty
//! select, is handled by [`resolve_partial_input`] according to the form's
//! [`PartialInputPolicy`]. The default drops the incomplete value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::format::label_for_scalar;
use crate::inference::{FieldSchema, FieldType, SchemaSet};
use crate::known::{self, LINE_COLORS, LINE_NUMBERS, LINE_PATTERNS, ROAD_LINES};
use crate::types::{FieldValue, MetadataRecord, RoadLine, RoadLines, Scalar, ScaleRange};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How a single-choice (radio) control submits its selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSubmission {
    /// The bare value: `"N"`.
    #[default]
    Bare,
    /// Wrapped in a one-element list: `["N"]`. Only for legacy documents.
    SingleElementList,
}

/// What to do with composite input that is only partly filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialInputPolicy {
    /// Treat it as no value.
    #[default]
    Drop,
    /// Fail collection with [`CollectError::PartialInput`].
    Reject,
}

/// Form synthesis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// String fields with at most this many values get a single-choice
    /// control, larger ones a dropdown.
    pub choice_threshold: usize,
    pub choice_submission: ChoiceSubmission,
    pub partial_input: PartialInputPolicy,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            choice_threshold: 5,
            choice_submission: ChoiceSubmission::Bare,
            partial_input: PartialInputPolicy::Drop,
        }
    }
}

/// Errors from reading a widget back into a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    #[error("{field}: {reason}")]
    PartialInput { field: String, reason: String },
    #[error("{field}: invalid JSON ({message})")]
    InvalidJson { field: String, message: String },
}

/// Decides the fate of incomplete composite input.
///
/// # Errors
///
/// Returns [`CollectError::PartialInput`] under [`PartialInputPolicy::Reject`].
pub fn resolve_partial_input(
    policy: PartialInputPolicy,
    field: &str,
    reason: &str,
) -> Result<(), CollectError> {
    match policy {
        PartialInputPolicy::Drop => {
            tracing::debug!(field, reason, "dropping partial input");
            Ok(())
        }
        PartialInputPolicy::Reject => Err(CollectError::PartialInput {
            field: field.to_string(),
            reason: reason.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: Scalar,
    pub label: String,
}

/// Inclusive numeric bounds of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub lower: i64,
    pub upper: i64,
}

/// Which list of a road-line value an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSide {
    Inner,
    Outer,
}

/// One road-line entry being edited; each select may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineDraft {
    pub number: Option<String>,
    pub color: Option<String>,
    pub pattern: Option<String>,
}

impl LineDraft {
    fn from_line(line: &RoadLine) -> Self {
        Self {
            number: Some(line.number.clone()),
            color: Some(line.color.clone()),
            pattern: Some(line.pattern.clone()),
        }
    }

    fn is_blank(&self) -> bool {
        self.number.is_none() && self.color.is_none() && self.pattern.is_none()
    }

    fn complete(&self) -> Option<RoadLine> {
        Some(RoadLine {
            number: self.number.clone()?,
            color: self.color.clone()?,
            pattern: self.pattern.clone()?,
        })
    }
}

/// Option lists of the three road-line selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChoices {
    pub numbers: Vec<String>,
    pub colors: Vec<String>,
    pub patterns: Vec<String>,
}

impl Default for LineChoices {
    fn default() -> Self {
        let owned = |values: &[&str]| values.iter().map(ToString::to_string).collect();
        Self {
            numbers: owned(LINE_NUMBERS),
            colors: owned(LINE_COLORS),
            patterns: owned(LINE_PATTERNS),
        }
    }
}

/// Input state of one field, by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    /// Unset / yes / no.
    TriState { value: Option<bool> },
    /// One checkbox per option.
    Checkboxes {
        options: Vec<ChoiceOption>,
        checked: BTreeSet<Scalar>,
    },
    /// Mutually exclusive options (radio group).
    SingleChoice {
        options: Vec<ChoiceOption>,
        selected: Option<Scalar>,
    },
    /// Single-select dropdown.
    Dropdown {
        options: Vec<ChoiceOption>,
        selected: Option<Scalar>,
    },
    /// Two bounded numeric inputs, raw text as typed.
    Range {
        bounds: Bounds,
        min: String,
        max: String,
    },
    /// One numeric input, raw text as typed.
    Number { input: String },
    /// Repeatable road-line entries.
    Lines {
        choices: LineChoices,
        inner: Vec<LineDraft>,
        outer: Vec<LineDraft>,
    },
    /// JSON text for objects the form cannot break down.
    Json { text: String },
    /// Free text.
    Text { text: String },
}

/// A rendered input for one metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWidget {
    pub field: String,
    pub label: String,
    pub field_type: FieldType,
    pub control: Control,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Builds the empty widget for a field.
#[must_use]
pub fn render_field(schema: &FieldSchema, options: &FormOptions) -> FieldWidget {
    let choice_options = || {
        schema
            .possible_values
            .iter()
            .map(|value| option_for(&schema.name, value))
            .collect::<Vec<_>>()
    };

    let control = match schema.field_type {
        FieldType::Boolean => Control::TriState { value: None },
        FieldType::Array => Control::Checkboxes {
            options: choice_options(),
            checked: BTreeSet::new(),
        },
        FieldType::String if schema.possible_values.len() <= options.choice_threshold => {
            Control::SingleChoice {
                options: choice_options(),
                selected: None,
            }
        }
        FieldType::String => Control::Dropdown {
            options: choice_options(),
            selected: None,
        },
        FieldType::Scale => Control::Range {
            bounds: Bounds {
                lower: known::SCALE_MIN,
                upper: known::SCALE_MAX,
            },
            min: String::new(),
            max: String::new(),
        },
        FieldType::Number => Control::Number {
            input: String::new(),
        },
        FieldType::Object if schema.name == ROAD_LINES || !schema.free_form_objects => {
            Control::Lines {
                choices: LineChoices::default(),
                inner: Vec::new(),
                outer: Vec::new(),
            }
        }
        FieldType::Object => Control::Json {
            text: String::new(),
        },
        FieldType::Unknown => Control::Text {
            text: String::new(),
        },
    };

    FieldWidget {
        field: schema.name.clone(),
        label: schema.display_name.clone(),
        field_type: schema.field_type,
        control,
    }
}

fn option_for(field: &str, value: &Scalar) -> ChoiceOption {
    ChoiceOption {
        value: value.clone(),
        label: label_for_scalar(field, value),
    }
}

/// Adds `value` to `options` if missing, keeping them sorted by value.
fn ensure_option(field: &str, options: &mut Vec<ChoiceOption>, value: &Scalar) {
    if let Err(pos) = options.binary_search_by(|o| o.value.cmp(value)) {
        options.insert(pos, option_for(field, value));
    }
}

fn ensure_choice(options: &mut Vec<String>, value: &str) {
    if !options.iter().any(|o| o == value) {
        options.push(value.to_string());
    }
}

// ---------------------------------------------------------------------------
// Populate / collect
// ---------------------------------------------------------------------------

impl FieldWidget {
    /// Clears all input state, keeping the options.
    pub fn reset(&mut self) {
        match &mut self.control {
            Control::TriState { value } => *value = None,
            Control::Checkboxes { checked, .. } => checked.clear(),
            Control::SingleChoice { selected, .. } | Control::Dropdown { selected, .. } => {
                *selected = None;
            }
            Control::Range { min, max, .. } => {
                min.clear();
                max.clear();
            }
            Control::Number { input } => input.clear(),
            Control::Lines { inner, outer, .. } => {
                inner.clear();
                outer.clear();
            }
            Control::Json { text } | Control::Text { text } => text.clear(),
        }
    }

    /// Loads a stored value into the widget, replacing previous input.
    ///
    /// Values missing from the option lists are added so that nothing stored
    /// is lost by opening and saving the form.
    pub fn populate(&mut self, value: &FieldValue) {
        self.reset();
        let field = self.field.as_str();
        match (&mut self.control, value) {
            (_, FieldValue::Null) => {}
            (Control::TriState { value: state }, FieldValue::Scalar(Scalar::Bool(b))) => {
                *state = Some(*b);
            }
            (Control::Checkboxes { options, checked }, FieldValue::List(items)) => {
                for item in items {
                    ensure_option(field, options, item);
                    checked.insert(item.clone());
                }
            }
            (Control::Checkboxes { options, checked }, FieldValue::Scalar(item)) => {
                ensure_option(field, options, item);
                checked.insert(item.clone());
            }
            (
                Control::SingleChoice { options, selected } | Control::Dropdown { options, selected },
                FieldValue::Scalar(item),
            ) => {
                ensure_option(field, options, item);
                *selected = Some(item.clone());
            }
            (
                Control::SingleChoice { options, selected } | Control::Dropdown { options, selected },
                FieldValue::List(items),
            ) if items.len() == 1 => {
                ensure_option(field, options, &items[0]);
                *selected = Some(items[0].clone());
            }
            (Control::Range { min, max, .. }, FieldValue::Range(range)) => {
                *min = range.min.to_string();
                *max = range.max.to_string();
            }
            (Control::Number { input }, FieldValue::Scalar(item)) => *input = item.to_string(),
            (Control::Lines { choices, inner, outer }, FieldValue::Lines(lines)) => {
                for line in lines.inner().iter().chain(lines.outer()) {
                    ensure_choice(&mut choices.numbers, &line.number);
                    ensure_choice(&mut choices.colors, &line.color);
                    ensure_choice(&mut choices.patterns, &line.pattern);
                }
                *inner = lines.inner().iter().map(LineDraft::from_line).collect();
                *outer = lines.outer().iter().map(LineDraft::from_line).collect();
            }
            (Control::Text { text }, FieldValue::Scalar(item)) => *text = item.to_string(),
            (Control::Json { text } | Control::Text { text }, other) => {
                let json: serde_json::Value = other.clone().into();
                *text = serde_json::to_string_pretty(&json).unwrap_or_default();
            }
            (_, other) => {
                tracing::warn!(
                    field,
                    shape = other.shape_name(),
                    "stored value does not fit the field's control; leaving it empty"
                );
            }
        }
    }

    /// Reads the widget back into a value.
    ///
    /// # Errors
    ///
    /// [`CollectError::PartialInput`] for incomplete composite input when the
    /// policy is [`PartialInputPolicy::Reject`], and
    /// [`CollectError::InvalidJson`] for unparseable JSON text.
    pub fn collect(&self, options: &FormOptions) -> Result<FieldValue, CollectError> {
        let field = self.field.as_str();
        let policy = options.partial_input;
        let value = match &self.control {
            Control::TriState { value } => {
                value.map_or(FieldValue::Null, |b| FieldValue::Scalar(Scalar::Bool(b)))
            }
            Control::Checkboxes { options, checked } => {
                let values: Vec<Scalar> = options
                    .iter()
                    .filter(|o| checked.contains(&o.value))
                    .map(|o| o.value.clone())
                    .collect();
                if values.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::List(values)
                }
            }
            Control::SingleChoice { selected, .. } => match (selected, options.choice_submission) {
                (None, _) => FieldValue::Null,
                (Some(v), ChoiceSubmission::Bare) => FieldValue::Scalar(v.clone()),
                (Some(v), ChoiceSubmission::SingleElementList) => FieldValue::List(vec![v.clone()]),
            },
            Control::Dropdown { selected, .. } => {
                selected.clone().map_or(FieldValue::Null, FieldValue::Scalar)
            }
            Control::Range { min, max, .. } => collect_range(field, min, max, policy)?,
            Control::Number { input } => {
                let input = input.trim();
                if input.is_empty() {
                    FieldValue::Null
                } else if let Ok(n) = input.parse::<serde_json::Number>() {
                    FieldValue::Scalar(Scalar::Number(n))
                } else {
                    resolve_partial_input(policy, field, "not a number")?;
                    FieldValue::Null
                }
            }
            Control::Lines { inner, outer, .. } => {
                let inner = collect_lines(field, inner, policy)?;
                let outer = collect_lines(field, outer, policy)?;
                if inner.is_empty() && outer.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::Lines(RoadLines::new(inner, outer))
                }
            }
            Control::Json { text } => {
                let text = text.trim();
                if text.is_empty() {
                    FieldValue::Null
                } else {
                    let json: serde_json::Value =
                        serde_json::from_str(text).map_err(|e| CollectError::InvalidJson {
                            field: field.to_string(),
                            message: e.to_string(),
                        })?;
                    FieldValue::from(json)
                }
            }
            Control::Text { text } => {
                let text = text.trim();
                if text.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::text(text)
                }
            }
        };
        Ok(value)
    }

    // ---- input helpers for UI layers ----

    /// Checks or unchecks a checkbox option. Returns `false` if not a checkbox control.
    pub fn set_checked(&mut self, value: &Scalar, on: bool) -> bool {
        let Control::Checkboxes { options, checked } = &mut self.control else {
            return false;
        };
        if on {
            ensure_option(&self.field, options, value);
            checked.insert(value.clone());
        } else {
            checked.remove(value);
        }
        true
    }

    /// Selects an option (or clears with `None`) on choice and tri-state controls.
    pub fn select(&mut self, value: Option<Scalar>) -> bool {
        match &mut self.control {
            Control::SingleChoice { options, selected } | Control::Dropdown { options, selected } => {
                if let Some(v) = &value {
                    ensure_option(&self.field, options, v);
                }
                *selected = value;
                true
            }
            Control::TriState { value: state } => {
                *state = value.as_ref().and_then(Scalar::as_bool);
                true
            }
            _ => false,
        }
    }

    /// Sets the typed text of number, text and JSON controls.
    pub fn set_text(&mut self, input: &str) -> bool {
        match &mut self.control {
            Control::Number { input: text } | Control::Json { text } | Control::Text { text } => {
                *text = input.to_string();
                true
            }
            _ => false,
        }
    }

    /// Sets the typed text of both range inputs.
    pub fn set_range(&mut self, min_text: &str, max_text: &str) -> bool {
        let Control::Range { min, max, .. } = &mut self.control else {
            return false;
        };
        *min = min_text.to_string();
        *max = max_text.to_string();
        true
    }

    /// Appends a road-line entry. Returns its index.
    pub fn push_line(&mut self, side: LineSide, draft: LineDraft) -> Option<usize> {
        let Control::Lines { inner, outer, .. } = &mut self.control else {
            return None;
        };
        let list = match side {
            LineSide::Inner => inner,
            LineSide::Outer => outer,
        };
        list.push(draft);
        Some(list.len() - 1)
    }

    /// Removes a road-line entry.
    pub fn remove_line(&mut self, side: LineSide, index: usize) -> Option<LineDraft> {
        let Control::Lines { inner, outer, .. } = &mut self.control else {
            return None;
        };
        let list = match side {
            LineSide::Inner => inner,
            LineSide::Outer => outer,
        };
        (index < list.len()).then(|| list.remove(index))
    }
}

fn collect_range(
    field: &str,
    min: &str,
    max: &str,
    policy: PartialInputPolicy,
) -> Result<FieldValue, CollectError> {
    let (min, max) = (min.trim(), max.trim());
    if min.is_empty() && max.is_empty() {
        return Ok(FieldValue::Null);
    }
    match (min.parse::<i64>(), max.parse::<i64>()) {
        (Ok(min), Ok(max)) => Ok(FieldValue::Range(ScaleRange { min, max })),
        _ => {
            resolve_partial_input(policy, field, "scale needs both a numeric min and max")?;
            Ok(FieldValue::Null)
        }
    }
}

fn collect_lines(
    field: &str,
    drafts: &[LineDraft],
    policy: PartialInputPolicy,
) -> Result<Vec<RoadLine>, CollectError> {
    let mut lines = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if let Some(line) = draft.complete() {
            lines.push(line);
        } else if !draft.is_blank() {
            resolve_partial_input(policy, field, "road line needs number, color and pattern")?;
        }
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Whole form
// ---------------------------------------------------------------------------

/// The editor form: one widget per discovered field, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditorForm {
    widgets: Vec<FieldWidget>,
    #[serde(skip)]
    options: FormOptions,
}

impl EditorForm {
    /// Builds a fresh form for the given schemas.
    #[must_use]
    pub fn synthesize(schemas: &SchemaSet, options: &FormOptions) -> Self {
        let widgets = schemas.iter().map(|s| render_field(s, options)).collect();
        Self {
            widgets,
            options: options.clone(),
        }
    }

    /// Replaces every widget from a new schema set. Earlier input is discarded.
    pub fn resynthesize(&mut self, schemas: &SchemaSet) {
        *self = Self::synthesize(schemas, &self.options);
    }

    /// Fills every widget from a record; `None` clears the form.
    pub fn populate(&mut self, record: Option<&MetadataRecord>) {
        for widget in &mut self.widgets {
            let value = record.map_or(&crate::types::NULL_VALUE, |r| r.value(&widget.field));
            widget.populate(value);
        }
    }

    /// Collects a full record: every field present, explicit null for no data.
    ///
    /// # Errors
    ///
    /// The first [`CollectError`] raised by any widget.
    pub fn collect(&self) -> Result<MetadataRecord, CollectError> {
        self.widgets
            .iter()
            .map(|w| -> Result<(String, FieldValue), CollectError> {
                Ok((w.field.clone(), w.collect(&self.options)?))
            })
            .collect()
    }

    /// Widgets in display order.
    #[must_use]
    pub fn widgets(&self) -> &[FieldWidget] {
        &self.widgets
    }

    /// Widget for one field.
    #[must_use]
    pub fn widget(&self, field: &str) -> Option<&FieldWidget> {
        self.widgets.iter().find(|w| w.field == field)
    }

    /// Mutable widget for one field.
    pub fn widget_mut(&mut self, field: &str) -> Option<&mut FieldWidget> {
        self.widgets.iter_mut().find(|w| w.field == field)
    }

    /// Options the form was built with.
    #[must_use]
    pub fn options(&self) -> &FormOptions {
        &self.options
    }
}
