use crate::core::types::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub public_message: Option<String>,
    pub context: BTreeMap<String, String>,
    pub recovery_suggestions: Vec<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        let severity = match category {
            ErrorCategory::ValidationError => ErrorSeverity::Warning,
            ErrorCategory::ProvisioningError
            | ErrorCategory::TimeoutError
            | ErrorCategory::ToolExecutionError
            | ErrorCategory::OutputNotFound
            | ErrorCategory::IoError
            | ErrorCategory::ConfigError
            | ErrorCategory::InternalError => ErrorSeverity::Error,
        };
        AppError {
            category,
            severity,
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            public_message: None,
            context: BTreeMap::new(),
            recovery_suggestions: vec![],
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_source<T: Into<String>>(
        category: ErrorCategory,
        message: T,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        let mut error = AppError::new(category, message);
        error.source = Some(anyhow::anyhow!(source));
        error
    }

    pub fn with_context<T: Into<String>>(mut self, context: T) -> Self {
        self.context.insert("context".to_string(), context.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    /// Message safe to hand back to a remote caller.
    pub fn with_public_message<T: Into<String>>(mut self, message: T) -> Self {
        self.public_message = Some(message.into());
        self
    }

    pub fn with_suggestion<T: Into<String>>(mut self, suggestion: T) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    /// Returns the caller-facing message. Validation messages are already
    /// caller-facing; everything else falls back to a generic description of
    /// the category so internal paths and tool output never leak.
    pub fn public_message(&self) -> String {
        if let Some(message) = &self.public_message {
            return message.clone();
        }
        match self.category {
            ErrorCategory::ValidationError => self.message.clone(),
            ErrorCategory::ProvisioningError => "failed to prepare job workspace".to_string(),
            ErrorCategory::TimeoutError => "obfuscator timed out".to_string(),
            ErrorCategory::ToolExecutionError => "obfuscator exited with an error".to_string(),
            ErrorCategory::OutputNotFound => "obfuscated output could not be located".to_string(),
            ErrorCategory::IoError => "failed to read obfuscated output".to_string(),
            ErrorCategory::ConfigError | ErrorCategory::InternalError => {
                "internal server error".to_string()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (Context: {:?})", self.context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        let mut error = AppError::new(ErrorCategory::InternalError, e.to_string())
            .with_code("ANYHOW_ERROR")
            .with_suggestion("Check the error details");
        error.source = Some(e);
        error
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        let message = e.to_string();
        AppError::with_source(ErrorCategory::IoError, message, Box::new(e))
            .with_code("IO_ERROR")
            .with_suggestion("Check file permissions and paths")
    }
}
