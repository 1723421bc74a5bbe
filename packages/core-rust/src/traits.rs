use crate::color::{FeatureColor, LegendEntry};
use crate::document::Feature;
use crate::types::FieldValue;

/// Access to the in-memory document: read the records, mutate one field.
pub trait DocumentProvider {
    /// Current features, in display order.
    fn features(&self) -> &[Feature];

    /// Sets one metadata field of the feature at `index`, creating the
    /// metadata record if needed. Returns the previous value, or `None` if
    /// the index is out of range or the field was absent.
    fn set_metadata_field(&mut self, index: usize, field: &str, value: FieldValue)
        -> Option<FieldValue>;
}

/// Receives choropleth colors and legend entries for the map layer.
pub trait RenderSink: Send + Sync {
    /// Paint every feature for the selected field.
    fn paint_choropleth(&self, field: &str, colors: &[FeatureColor]) -> anyhow::Result<()>;

    /// Replace the legend for the selected field.
    fn show_legend(&self, field: &str, entries: &[LegendEntry]) -> anyhow::Result<()>;

    /// Remove any field coloring (no field selected).
    fn clear(&self) -> anyhow::Result<()>;
}

/// Surfaces messages (validation failures, load errors) to the user.
pub trait NotificationSink: Send + Sync {
    /// Show one or more messages together.
    fn notify(&self, messages: &[String]);
}
