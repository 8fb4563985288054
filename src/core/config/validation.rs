#![allow(clippy::result_large_err)]

use super::ServiceConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::net::SocketAddr;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &ServiceConfig) -> Result<(), AppError> {
        config.server.bind.parse::<SocketAddr>().map_err(|e| {
            invalid(format!(
                "server.bind is not a socket address ({}): {}",
                config.server.bind, e
            ))
        })?;

        if config.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes must be greater than zero"));
        }

        if config.tool.runtime.trim().is_empty() {
            return Err(invalid("tool.runtime cannot be empty"));
        }

        if config.tool.entrypoint.trim().is_empty() {
            return Err(invalid("tool.entrypoint cannot be empty"));
        }

        if config.tool.timeout.is_zero() {
            return Err(invalid("tool.timeout must be greater than zero"));
        }

        // The extension is spliced into generated file names.
        let extension = &config.tool.source_extension;
        if extension.is_empty()
            || extension
                .chars()
                .any(|c| c == '.' || c == '/' || c == '\\' || c.is_whitespace())
        {
            return Err(invalid(format!(
                "tool.source_extension '{}' must be a bare extension such as lua",
                extension
            )));
        }

        if config.workspace.sweep_interval.is_zero() {
            return Err(invalid("workspace.sweep_interval must be greater than zero"));
        }

        if config.workspace.retention.is_zero() {
            return Err(invalid("workspace.retention must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ConfigError, message).with_code("CFG-010")
}
