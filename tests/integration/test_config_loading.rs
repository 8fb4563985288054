use obfuscator_api::core::config::ConfigLoader;
use obfuscator_api::core::types::ErrorCategory;
use serial_test::serial;
use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

const OVERRIDE_VARS: &[&str] = &[
    "PORT",
    "OBFUSCATOR_BIND",
    "OBFUSCATOR_MAX_BODY_BYTES",
    "OBFUSCATOR_SCRATCH_DIR",
    "OBFUSCATOR_TOOL_RUNTIME",
    "OBFUSCATOR_TOOL_ENTRYPOINT",
    "OBFUSCATOR_INSTALL_ROOT",
    "OBFUSCATOR_TOOL_TIMEOUT",
];

/// Clears every override on creation and restores the previous values on drop.
struct EnvGuard(Vec<(&'static str, Option<OsString>)>);

impl EnvGuard {
    fn clean() -> Self {
        let saved = OVERRIDE_VARS
            .iter()
            .map(|name| {
                let previous = env::var_os(name);
                env::remove_var(name);
                (*name, previous)
            })
            .collect();
        EnvGuard(saved)
    }

    fn set(&self, name: &str, value: &str) {
        env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, previous) in self.0.drain(..) {
            match previous {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{}", contents).expect("write config");
    file
}

#[test]
#[serial]
fn test_load_explicit_file() {
    let _env = EnvGuard::clean();
    let file = write_config(
        r#"
[server]
bind = "127.0.0.1:4000"

[tool]
timeout = "15s"

[workspace]
scratch_dir = "/tmp/obfuscator-scratch"
retention = "2m"
"#,
    );

    let config = ConfigLoader::load(Some(file.path())).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:4000");
    assert_eq!(config.tool.timeout, Duration::from_secs(15));
    assert_eq!(
        config.workspace.scratch_dir,
        PathBuf::from("/tmp/obfuscator-scratch")
    );
    assert_eq!(config.workspace.retention, Duration::from_secs(120));
    assert_eq!(config.workspace.sweep_interval, Duration::from_secs(60));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    let _env = EnvGuard::clean();
    let err = ConfigLoader::load(Some(std::path::Path::new("/nonexistent/obfuscator.toml")))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigError);
    assert_eq!(err.code, "CFG-001");
}

#[test]
#[serial]
fn test_invalid_toml_is_error() {
    let _env = EnvGuard::clean();
    let file = write_config("[server\nbind = ");
    let err = ConfigLoader::load(Some(file.path())).unwrap_err();
    assert_eq!(err.code, "CFG-003");
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    let env = EnvGuard::clean();
    let file = write_config(
        r#"
[server]
bind = "127.0.0.1:4000"

[tool]
runtime = "luajit"
"#,
    );
    env.set("PORT", "8081");
    env.set("OBFUSCATOR_TOOL_RUNTIME", "lua5.1");
    env.set("OBFUSCATOR_TOOL_TIMEOUT", "1m");
    env.set("OBFUSCATOR_SCRATCH_DIR", "/var/tmp/jobs");
    env.set("OBFUSCATOR_MAX_BODY_BYTES", "2048");

    let config = ConfigLoader::load(Some(file.path())).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:8081");
    assert_eq!(config.tool.runtime, "lua5.1");
    assert_eq!(config.tool.timeout, Duration::from_secs(60));
    assert_eq!(config.workspace.scratch_dir, PathBuf::from("/var/tmp/jobs"));
    assert_eq!(config.server.max_body_bytes, 2048);
}

#[test]
#[serial]
fn test_invalid_port_is_error() {
    let env = EnvGuard::clean();
    env.set("PORT", "eighty");
    let file = write_config("");
    let err = ConfigLoader::load(Some(file.path())).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigError);
    assert!(err.message.contains("PORT"));
}

#[test]
#[serial]
fn test_validation_runs_after_overrides() {
    let env = EnvGuard::clean();
    env.set("OBFUSCATOR_TOOL_RUNTIME", "");
    let file = write_config("");
    let err = ConfigLoader::load(Some(file.path())).unwrap_err();
    assert!(err.message.contains("tool.runtime"));
}

#[test]
fn test_env_documentation_lists_overrides() {
    let docs = ConfigLoader::env_var_documentation();
    for name in OVERRIDE_VARS {
        assert!(
            docs.iter().any(|line| line.starts_with(name)),
            "{} is undocumented",
            name
        );
    }
}
