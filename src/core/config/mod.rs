use crate::logging::config::LoggingSection;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration loaded from obfuscator.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// External obfuscator invocation
    #[serde(default)]
    pub tool: ToolConfig,

    /// Scratch directory and janitor settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Raw logging section, resolved by the logging module
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Directory of static assets served for unknown routes
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Message returned by the health endpoint
    #[serde(default = "default_health_message")]
    pub health_message: String,
}

/// External obfuscator invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Interpreter used to launch the entrypoint
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Script passed to the runtime, relative to install_root
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    /// Working directory of every invocation
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// Wall-clock budget per invocation
    #[serde(
        default = "default_tool_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,

    /// Extension of source and output files
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

/// Scratch directory and janitor settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Shared directory holding per-job files
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Period between janitor sweeps
    #[serde(
        default = "default_sweep_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub sweep_interval: Duration,

    /// Age after which the janitor removes an entry
    #[serde(
        default = "default_retention",
        deserialize_with = "deserialize_duration"
    )]
    pub retention: Duration,
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

// Default functions
fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_health_message() -> String {
    "Obfuscator API is running".to_string()
}

fn default_runtime() -> String {
    "luajit".to_string()
}

fn default_entrypoint() -> String {
    "cli.lua".to_string()
}

fn default_install_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_source_extension() -> String {
    "lua".to_string()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_retention() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            static_dir: default_static_dir(),
            health_message: default_health_message(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            runtime: default_runtime(),
            entrypoint: default_entrypoint(),
            install_root: default_install_root(),
            timeout: default_tool_timeout(),
            source_extension: default_source_extension(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            scratch_dir: default_scratch_dir(),
            sweep_interval: default_sweep_interval(),
            retention: default_retention(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
