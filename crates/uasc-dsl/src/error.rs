use crate::validation::ValidationError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All possible errors that can occur while loading graph documents
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Errors that occur during JSON processing
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A single validation error
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// Unsupported DSL version
    #[error("Unsupported DSL version: {0}")]
    UnsupportedVersion(String),

    /// Document is not a mapping
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// File extension is not yaml, yml or json
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl DslError {
    /// Create a DslError from one or more validation errors
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        match errors.len() {
            0 => DslError::InternalError(
                "Called from_validation_errors with empty vector".to_string(),
            ),
            1 => match errors.pop() {
                Some(error) => DslError::ValidationError(error),
                None => DslError::InternalError("validation error vanished".to_string()),
            },
            _ => DslError::MultipleValidationErrors(errors),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::YamlError(_) => "ERR_DSL_YAML_PARSE",
            DslError::JsonError(_) => "ERR_DSL_JSON_PARSE",
            DslError::ValidationError(err) => err.code,
            DslError::MultipleValidationErrors(_) => "ERR_DSL_VALIDATION_MULTIPLE",
            DslError::UnsupportedVersion(_) => "ERR_DSL_UNSUPPORTED_VERSION",
            DslError::InvalidDocument(_) => "ERR_DSL_INVALID_DOCUMENT",
            DslError::UnsupportedFormat(_) => "ERR_DSL_UNSUPPORTED_FORMAT",
            DslError::Io { .. } => "ERR_DSL_IO",
            DslError::InternalError(_) => "ERR_DSL_INTERNAL",
        }
    }

    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> Vec<&ValidationError> {
        match self {
            DslError::ValidationError(err) => vec![err],
            DslError::MultipleValidationErrors(errs) => errs.iter().collect(),
            _ => Vec::new(),
        }
    }
}
