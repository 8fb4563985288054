use crate::core::types::Preset;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Path to the config file (default: ./obfuscator.toml when present)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Override the bind address, e.g. 127.0.0.1:8080
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Source file to obfuscate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Obfuscation preset (Weak, Medium, Strong, Extreme)
    #[arg(long, default_value = "Strong", value_parser = parse_preset)]
    pub preset: Preset,

    /// Path to the config file (default: ./obfuscator.toml when present)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Path to the config file (default: ./obfuscator.toml when present)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

fn parse_preset(value: &str) -> Result<Preset, String> {
    value.parse::<Preset>().map_err(|_| {
        format!(
            "invalid preset '{}'; expected one of {}",
            value,
            Preset::ALL.map(Preset::as_str).join(", ")
        )
    })
}
