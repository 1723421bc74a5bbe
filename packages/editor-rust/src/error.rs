//! Editor error type.

use geometa_core::document::DocumentError;
use geometa_core::form::CollectError;

/// Errors returned by editor session operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),
    #[error("invalid configuration: {message}")]
    Config { message: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("validation failed: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },
    #[error("form input rejected: {0}")]
    Collect(#[from] CollectError),
    #[error("no document loaded")]
    NoDocument,
    #[error("no feature is being edited")]
    NotEditing,
    #[error("unknown feature: {name}")]
    UnknownFeature { name: String },
    #[error("unknown field: {field}")]
    UnknownField { field: String },
    #[error("unknown palette: {name}")]
    UnknownPalette { name: String },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EditorError {
    /// Messages suitable for a [`geometa_core::NotificationSink`].
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_lists_every_error() {
        let err = EditorError::Validation {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "validation failed: a; b");
        assert_eq!(err.messages(), vec!["a", "b"]);
    }

    #[test]
    fn single_message_for_other_errors() {
        let err = EditorError::UnknownFeature {
            name: "Atlantis".to_string(),
        };
        assert_eq!(err.messages(), vec!["unknown feature: Atlantis"]);
    }

    #[test]
    fn anyhow_converts_to_internal() {
        let err: EditorError = anyhow::anyhow!("sink closed").into();
        assert!(matches!(err, EditorError::Internal(_)));
    }
}
