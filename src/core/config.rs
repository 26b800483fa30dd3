//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.weave/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inference::Effort;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WeaveConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub lmstudio: LmStudioConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub snapshots: SnapshotConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub reasoning_effort: Option<Effort>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LmStudioConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PreviewConfig {
    pub command: Option<String>,
    pub port: Option<u16>,
    pub startup_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SnapshotConfig {
    pub max_entries: Option<usize>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PORT: u16 = 3939;
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_PREVIEW_COMMAND: &str = "npx vite --port {port} --strictPort";
pub const DEFAULT_PREVIEW_PORT: u16 = 5173;
pub const DEFAULT_PREVIEW_STARTUP_TIMEOUT_MS: u64 = 15_000;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding assistant embedded in the user's editor. \
    You can see the workspace folders, the open files and the active file. \
    Answer questions about the code directly and concisely. \
    Be honest about uncertainty and prefer clarity over hedging.";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: String,
    pub model_name: String,
    pub effort: Effort,
    pub system_prompt: String,
    pub port: u16,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub lmstudio_base_url: String,
    pub preview_command: String,
    pub preview_port: u16,
    pub preview_startup_timeout: Duration,
    pub max_snapshots: Option<usize>,
}

impl ResolvedConfig {
    /// True when the selected provider needs a key and none was supplied.
    pub fn missing_credential(&self) -> bool {
        self.provider != "lmstudio" && self.openrouter_api_key.is_none()
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.weave/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".weave").join("config.toml"))
}

/// Load config from `~/.weave/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `WeaveConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<WeaveConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(WeaveConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<WeaveConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(WeaveConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WeaveConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Weave Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_provider = "openrouter"    # "openrouter" or "lmstudio"
# default_model = "anthropic/claude-sonnet-4"
# reasoning_effort = "auto"          # "high", "medium", "low", "auto", "none"
# system_prompt = "You are a coding assistant."
# system_prompt_file = "system.md"   # Path relative to ~/.weave/

# [server]
# port = 3939                        # Or set WEAVE_PORT

# [openrouter]
# api_key = "sk-or-..."              # Or set OPENROUTER_API_KEY env var
# base_url = "https://openrouter.ai/api/v1"

# [lmstudio]
# base_url = "http://localhost:1234/v1"

# [preview]
# command = "npx vite --port {port} --strictPort"
# port = 5173
# startup_timeout_ms = 15000

# [snapshots]
# max_entries = 1000                 # Unbounded when unset
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// CLI overrides; `None` means the flag was not given.
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub provider: Option<&'a str>,
    pub port: Option<u16>,
}

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &WeaveConfig, cli: &CliOverrides<'_>) -> ResolvedConfig {
    // Provider: CLI → env → config → default
    let provider = cli
        .provider
        .map(|s| s.to_string())
        .or_else(|| std::env::var("WEAVE_PROVIDER").ok())
        .or_else(|| config.general.default_provider.clone())
        .unwrap_or_else(|| "openrouter".to_string());

    // Model: env → config → default
    let model_name = std::env::var("PRIMARY_MODEL_NAME")
        .ok()
        .or_else(|| config.general.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    // Port: CLI → env → config → default
    let port = cli
        .port
        .or_else(|| std::env::var("WEAVE_PORT").ok().and_then(|p| p.parse().ok()))
        .or(config.server.port)
        .unwrap_or(DEFAULT_PORT);

    let openrouter_api_key = std::env::var("OPENROUTER_API_KEY")
        .ok()
        .or_else(|| config.openrouter.api_key.clone())
        .filter(|k| !k.trim().is_empty());

    let openrouter_base_url = std::env::var("OPENROUTER_BASE_URL")
        .ok()
        .or_else(|| config.openrouter.base_url.clone())
        .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string());

    let lmstudio_base_url = std::env::var("LM_STUDIO_BASE_URL")
        .ok()
        .or_else(|| config.lmstudio.base_url.clone())
        .unwrap_or_else(|| DEFAULT_LMSTUDIO_BASE_URL.to_string());

    let preview_command = std::env::var("WEAVE_PREVIEW_COMMAND")
        .ok()
        .or_else(|| config.preview.command.clone())
        .unwrap_or_else(|| DEFAULT_PREVIEW_COMMAND.to_string());

    ResolvedConfig {
        provider,
        model_name,
        effort: config.general.reasoning_effort.unwrap_or_default(),
        system_prompt: resolve_system_prompt(config),
        port,
        openrouter_api_key,
        openrouter_base_url,
        lmstudio_base_url,
        preview_command,
        preview_port: config.preview.port.unwrap_or(DEFAULT_PREVIEW_PORT),
        preview_startup_timeout: Duration::from_millis(
            config
                .preview
                .startup_timeout_ms
                .unwrap_or(DEFAULT_PREVIEW_STARTUP_TIMEOUT_MS),
        ),
        max_snapshots: config.snapshots.max_entries,
    }
}

/// Resolves the system prompt: inline wins over file, both win over default.
fn resolve_system_prompt(config: &WeaveConfig) -> String {
    if let Some(ref prompt) = config.general.system_prompt {
        return prompt.clone();
    }

    // Try loading from system_prompt_file (relative to ~/.weave/)
    if let Some(ref file) = config.general.system_prompt_file
        && let Some(home) = dirs::home_dir()
    {
        let prompt_path = home.join(".weave").join(file);
        match fs::read_to_string(&prompt_path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if !trimmed.is_empty() {
                    info!("Loaded system prompt from {}", prompt_path.display());
                    return trimmed;
                }
                warn!("System prompt file is empty: {}", prompt_path.display());
            }
            Err(e) => {
                warn!(
                    "Failed to read system prompt file {}: {}",
                    prompt_path.display(),
                    e
                );
            }
        }
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = WeaveConfig::default();
        assert!(config.general.default_provider.is_none());
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = WeaveConfig::default();
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.preview_port, DEFAULT_PREVIEW_PORT);
        assert_eq!(
            resolved.preview_startup_timeout,
            Duration::from_millis(DEFAULT_PREVIEW_STARTUP_TIMEOUT_MS)
        );
        assert_eq!(resolved.effort, Effort::default());
        assert!(resolved.max_snapshots.is_none());
        assert!(resolved.system_prompt.starts_with("You are a coding assistant"));
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = WeaveConfig {
            general: GeneralConfig {
                default_provider: Some("lmstudio".to_string()),
                reasoning_effort: Some(Effort::High),
                system_prompt: Some("Custom prompt.".to_string()),
                ..Default::default()
            },
            preview: PreviewConfig {
                command: None,
                port: Some(3000),
                startup_timeout_ms: Some(500),
            },
            snapshots: SnapshotConfig {
                max_entries: Some(50),
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.effort, Effort::High);
        assert_eq!(resolved.system_prompt, "Custom prompt.");
        assert_eq!(resolved.preview_port, 3000);
        assert_eq!(resolved.preview_startup_timeout, Duration::from_millis(500));
        assert_eq!(resolved.max_snapshots, Some(50));
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = WeaveConfig {
            general: GeneralConfig {
                default_provider: Some("lmstudio".to_string()),
                ..Default::default()
            },
            server: ServerConfig { port: Some(1111) },
            ..Default::default()
        };
        let cli = CliOverrides {
            provider: Some("openrouter"),
            port: Some(2222),
        };
        let resolved = resolve(&config, &cli);
        assert_eq!(resolved.provider, "openrouter");
        assert_eq!(resolved.port, 2222);
    }

    #[test]
    fn test_missing_credential_only_for_openrouter() {
        let mut resolved = resolve(&WeaveConfig::default(), &CliOverrides::default());
        resolved.openrouter_api_key = None;
        resolved.provider = "openrouter".into();
        assert!(resolved.missing_credential());

        resolved.provider = "lmstudio".into();
        assert!(!resolved.missing_credential());

        resolved.provider = "openrouter".into();
        resolved.openrouter_api_key = Some("sk-or-test".into());
        assert!(!resolved.missing_credential());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
default_provider = "openrouter"
default_model = "anthropic/claude-sonnet-4"
reasoning_effort = "medium"

[server]
port = 4000

[openrouter]
api_key = "sk-test-123"

[preview]
command = "pnpm dev --port {port}"
port = 5174

[snapshots]
max_entries = 10
"#;
        let config: WeaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_provider.as_deref(), Some("openrouter"));
        assert_eq!(config.general.reasoning_effort, Some(Effort::Medium));
        assert_eq!(config.server.port, Some(4000));
        assert_eq!(config.openrouter.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(config.preview.command.as_deref(), Some("pnpm dev --port {port}"));
        assert_eq!(config.snapshots.max_entries, Some(10));
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[general]
default_model = "my-model"
"#;
        let config: WeaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_model.as_deref(), Some("my-model"));
        assert!(config.general.default_provider.is_none());
        assert!(config.preview.port.is_none());
    }

    #[test]
    fn test_missing_file_generates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.general.default_model.is_none());
        let generated = fs::read_to_string(&path).unwrap();
        assert!(generated.starts_with("# Weave Configuration"));
        // Everything is commented out, so it parses back to defaults.
        assert!(load_config_from(&path).unwrap().server.port.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
