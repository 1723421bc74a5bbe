//! Editor configuration types.

use std::path::Path;

use geometa_core::form::FormOptions;
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Top-level configuration for an editor session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Feature property used as the display name.
    pub name_property: String,
    /// Palette selected at startup.
    pub palette: String,
    /// Form synthesis settings.
    pub form: FormOptions,
    /// Logging settings, read by [`crate::telemetry::init_tracing`].
    pub log: LogConfig,
    /// Rewrite legacy value shapes (single-element hemisphere lists) on load.
    pub normalize_legacy: bool,
    /// Give every feature a full all-null record on load. Off by default so
    /// loading never changes a document that is saved unedited.
    pub stub_missing_metadata: bool,
    /// Indent saved documents.
    pub pretty_output: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            name_property: "ADMIN".to_string(),
            palette: "default".to_string(),
            form: FormOptions::default(),
            log: LogConfig::default(),
            normalize_legacy: true,
            stub_missing_metadata: false,
            pretty_output: true,
        }
    }
}

impl EditorConfig {
    /// Parses a JSON configuration. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Config`] if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> Result<Self, EditorError> {
        serde_json::from_str(text).map_err(|e| EditorError::Config {
            message: e.to_string(),
        })
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Io`] if the file cannot be read, or
    /// [`EditorError::Config`] if it does not parse.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use geometa_core::form::{ChoiceSubmission, PartialInputPolicy};

    use super::*;

    #[test]
    fn editor_config_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.name_property, "ADMIN");
        assert_eq!(config.palette, "default");
        assert_eq!(config.form.choice_threshold, 5);
        assert_eq!(config.form.choice_submission, ChoiceSubmission::Bare);
        assert_eq!(config.form.partial_input, PartialInputPolicy::Drop);
        assert!(config.normalize_legacy);
        assert!(!config.stub_missing_metadata);
        assert!(config.pretty_output);
    }

    #[test]
    fn log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json_str(
            r#"{"palette": "earth", "form": {"partial_input": "reject"}, "log": {"format": "json"}}"#,
        )
        .unwrap();
        assert_eq!(config.palette, "earth");
        assert_eq!(config.form.partial_input, PartialInputPolicy::Reject);
        assert_eq!(config.form.choice_threshold, 5);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.name_property, "ADMIN");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = EditorConfig::from_json_str("{\"palette\": 3}").unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name_property": "NAME"}}"#).unwrap();
        let config = EditorConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.name_property, "NAME");

        let missing = EditorConfig::from_file("/nonexistent/geometa.json").await;
        assert!(matches!(missing, Err(EditorError::Io(_))));
    }
}
