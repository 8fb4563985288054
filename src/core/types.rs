use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transformation intensity accepted by the obfuscator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Preset {
    Weak,
    Medium,
    #[default]
    Strong,
    Extreme,
}

impl Preset {
    /// Every preset the service accepts, in increasing intensity.
    pub const ALL: [Preset; 4] = [
        Preset::Weak,
        Preset::Medium,
        Preset::Strong,
        Preset::Extreme,
    ];

    /// Name passed verbatim to the external tool.
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Weak => "Weak",
            Preset::Medium => "Medium",
            Preset::Strong => "Strong",
            Preset::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    // Matching is case-sensitive; the tool only understands these exact names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == value)
            .ok_or_else(|| format!("unknown preset '{}'", value))
    }
}

/// Lifecycle phases a job moves through while handling one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Validating,
    Provisioning,
    Invoking,
    Resolving,
    Reading,
    CleaningUp,
    Responding,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    ProvisioningError,
    TimeoutError,
    ToolExecutionError,
    OutputNotFound,
    IoError,
    ConfigError,
    InternalError,
}

impl ErrorCategory {
    /// Whether the failure was caused by the caller rather than the service.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorCategory::ValidationError)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
}
