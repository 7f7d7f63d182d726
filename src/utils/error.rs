use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Schema violation in field '{field}'{}: {reason}", record_suffix(.record_index))]
    SchemaViolation {
        field: String,
        reason: String,
        record_index: Option<usize>,
    },

    #[error("Translation service error: {message}")]
    TranslationError { message: String },

    #[error("Checkpoint error: {message}")]
    CheckpointError { message: String },

    #[error("Dataset source error: {message}")]
    SourceError { message: String },

    #[error("Dataset sink error: {message}")]
    SinkError { message: String },
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" (record #{})", i),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Data,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
            record_index: None,
        }
    }

    /// 為 schema 錯誤補上記錄索引，其他錯誤原樣返回
    pub fn at_record(self, index: usize) -> Self {
        match self {
            EtlError::SchemaViolation { field, reason, .. } => EtlError::SchemaViolation {
                field,
                reason,
                record_index: Some(index),
            },
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::IoError(_) | EtlError::CheckpointError { .. } => ErrorCategory::Storage,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::SchemaViolation { .. } => ErrorCategory::Data,
            EtlError::TranslationError { .. }
            | EtlError::SourceError { .. }
            | EtlError::SinkError { .. } => ErrorCategory::External,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::TranslationError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_) | EtlError::SourceError { .. } | EtlError::SinkError { .. } => {
                ErrorSeverity::Medium
            }
            EtlError::SchemaViolation { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::SerializationError(_)
            | EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) | EtlError::CheckpointError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and the remote endpoint, then rerun; progress resumes from the last checkpoint",
            EtlError::IoError(_) => "Check disk space and permissions for the checkpoint and output directories",
            EtlError::SerializationError(_) => "The input or a checkpoint file is not valid JSON; inspect or remove it",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Fix the configuration file and rerun",
            EtlError::ProcessingError { .. } => "Inspect the input collection for malformed records",
            EtlError::SchemaViolation { .. } => "The input no longer matches the expected record schema; fix the source data before rerunning",
            EtlError::TranslationError { .. } => "Check the translation endpoint and rate limits",
            EtlError::CheckpointError { .. } => "Inspect the checkpoint directory; remove checkpoints from other datasets",
            EtlError::SourceError { .. } => "Check the dataset id, file name and access token",
            EtlError::SinkError { .. } => "Check the target repository name and token write permissions; the translated data can be republished from the final checkpoint",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::SchemaViolation { .. } => format!("Input data does not match the expected schema: {}", self),
            EtlError::SourceError { .. } => format!("Could not load the source dataset: {}", self),
            EtlError::SinkError { .. } => format!("Could not publish the translated dataset: {}", self),
            EtlError::ApiError(_) => format!("A remote service could not be reached: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_carries_record_index() {
        let err = EtlError::schema("context", "missing key 'title'").at_record(7);
        assert_eq!(
            err.to_string(),
            "Schema violation in field 'context' (record #7): missing key 'title'"
        );
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn test_at_record_leaves_other_errors_alone() {
        let err = EtlError::SourceError {
            message: "404".to_string(),
        }
        .at_record(3);
        assert!(matches!(err, EtlError::SourceError { .. }));
    }
}
