#![allow(clippy::result_large_err)]

use super::{ConfigValidator, ServiceConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file looked up in the current directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "obfuscator.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from an explicit path, or from ./obfuscator.toml when none is given.
    /// An explicit path must exist; the default path may be absent (defaults + env vars apply).
    /// Environment variables override config file values.
    pub fn load(path: Option<&Path>) -> Result<ServiceConfig, AppError> {
        let mut config = match path {
            Some(explicit) => Self::load_from_file(explicit)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("Config file not found: {}", explicit.display()),
                )
                .with_code("CFG-001")
            })?,
            None => Self::load_from_file(Path::new(DEFAULT_CONFIG_FILE))?.unwrap_or_default(),
        };

        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<ServiceConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        })?;

        let config: ServiceConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-003")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Environment variables take precedence over config file values
    fn apply_env_overrides(config: &mut ServiceConfig) -> Result<(), AppError> {
        if let Ok(bind) = env::var("OBFUSCATOR_BIND") {
            config.server.bind = bind;
        }

        // PORT only swaps the port of whatever bind address is configured.
        if let Ok(port) = env::var("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("PORT must be a valid port number, got '{}'", port),
                )
                .with_code("CFG-004")
            })?;
            let mut addr: SocketAddr = config.server.bind.parse().map_err(|_| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("invalid server.bind address {}", config.server.bind),
                )
                .with_code("CFG-004")
            })?;
            addr.set_port(port);
            config.server.bind = addr.to_string();
        }

        if let Ok(max_body) = env::var("OBFUSCATOR_MAX_BODY_BYTES") {
            if let Ok(max_body) = max_body.trim().parse::<usize>() {
                config.server.max_body_bytes = max_body;
            }
        }

        if let Ok(scratch_dir) = env::var("OBFUSCATOR_SCRATCH_DIR") {
            config.workspace.scratch_dir = PathBuf::from(scratch_dir);
        }

        if let Ok(runtime) = env::var("OBFUSCATOR_TOOL_RUNTIME") {
            config.tool.runtime = runtime;
        }

        if let Ok(entrypoint) = env::var("OBFUSCATOR_TOOL_ENTRYPOINT") {
            config.tool.entrypoint = entrypoint;
        }

        if let Ok(install_root) = env::var("OBFUSCATOR_INSTALL_ROOT") {
            config.tool.install_root = PathBuf::from(install_root);
        }

        if let Ok(timeout) = env::var("OBFUSCATOR_TOOL_TIMEOUT") {
            config.tool.timeout = humantime::parse_duration(timeout.trim()).map_err(|e| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("OBFUSCATOR_TOOL_TIMEOUT is not a valid duration: {}", e),
                )
                .with_code("CFG-004")
            })?;
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "PORT - Override the listening port (keeps the configured host)",
            "OBFUSCATOR_BIND - Override the bind address (default: 0.0.0.0:3000)",
            "OBFUSCATOR_MAX_BODY_BYTES - Override the request body limit (default: 10485760)",
            "OBFUSCATOR_SCRATCH_DIR - Override the scratch directory (default: temp)",
            "OBFUSCATOR_TOOL_RUNTIME - Override the obfuscator runtime (default: luajit)",
            "OBFUSCATOR_TOOL_ENTRYPOINT - Override the obfuscator entrypoint (default: cli.lua)",
            "OBFUSCATOR_INSTALL_ROOT - Override the obfuscator working directory (default: .)",
            "OBFUSCATOR_TOOL_TIMEOUT - Override the per-job timeout, e.g. 30s",
            "OTEL_EXPORTER_OTLP_ENDPOINT - Enable OpenTelemetry export to this endpoint",
        ]
    }
}
