use crate::backend::BackendKind;
use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PERSONA: &str = "You are RAPTOR, an AI assistant specialized in root cause \
analysis and causal relationship identification. You help users understand complex systems \
through ontology-based reasoning to identify root causes of problems.";

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1:1.5b";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub backend: BackendKind,
    /// System instruction injected into every outbound request.
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_anthropic_version")]
    pub version: String,
    #[serde(default = "default_anthropic_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost".to_string(),
        "http://localhost:80".to_string(),
    ]
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "CLAUDE_API_KEY".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u64 {
    1000
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_timeout() -> u64 {
    30
}

fn default_ollama_timeout() -> u64 {
    60
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backend: BackendKind::default(),
            persona: default_persona(),
            cors_origins: default_cors_origins(),
            anthropic: AnthropicConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            api_key_env: default_api_key_env(),
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            version: default_anthropic_version(),
            timeout_secs: default_anthropic_timeout(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            timeout_secs: default_ollama_timeout(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("CHAT_PROXY_BACKEND") {
            self.backend = BackendKind::from_name(&name).ok_or_else(|| {
                ProxyError::config(format!(
                    "Unknown backend '{}' in CHAT_PROXY_BACKEND. Known backends: anthropic, ollama",
                    name
                ))
            })?;
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            self.ollama.base_url = Some(url);
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.ollama.model = Some(model);
        }
        Ok(())
    }

    /// Read the hosted-API credential from its configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.anthropic.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing_api_key(&self.anthropic.api_key_env))
    }
}

impl OllamaConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL)
    }
}

pub(crate) fn missing_api_key(env_name: &str) -> ProxyError {
    ProxyError::config(format!(
        "Claude API key not configured. Please set {} environment variable.",
        env_name
    ))
}

/// Candidate config file locations, in search order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("chat-proxy.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("chat-proxy").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("chat-proxy").join("config.toml"));
        paths.push(home.join(".chat-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 9000
backend = "ollama"
persona = "You are a test assistant."

[ollama]
base_url = "http://gpu-box:11434"
timeout_secs = 120
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.persona, "You are a test assistant.");
        assert_eq!(config.ollama.effective_base_url(), "http://gpu-box:11434");
        assert_eq!(config.ollama.effective_model(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.ollama.timeout_secs, 120);
        assert_eq!(config.anthropic.model, "claude-sonnet-4-20250514");
        assert_eq!(config.anthropic.max_tokens, 1000);
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.backend, BackendKind::Anthropic);
        assert_eq!(config.persona, DEFAULT_PERSONA);
        assert_eq!(config.anthropic.timeout_secs, 30);
        assert_eq!(config.ollama.timeout_secs, 60);
        assert_eq!(config.ollama.effective_base_url(), "http://localhost:11434");
        assert_eq!(config.ollama.effective_model(), "deepseek-r1:1.5b");
        assert_eq!(config.cors_origins.len(), 4);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CHAT_PROXY_BACKEND", "Ollama"),
            ("OLLAMA_BASE_URL", "http://10.0.0.5:11434"),
            ("OLLAMA_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = ProxyConfig::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.ollama.effective_base_url(), "http://10.0.0.5:11434");
        // empty value leaves the default in place
        assert_eq!(config.ollama.effective_model(), DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let mut config = ProxyConfig::default();
        let err = config
            .apply_env_with(|k| (k == "CHAT_PROXY_BACKEND").then(|| "bedrock".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }));
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = ProxyConfig::default();
        config.anthropic.api_key_env = "CHAT_PROXY_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = config.resolve_api_key().unwrap_err();
        assert!(err
            .to_string()
            .contains("Please set CHAT_PROXY_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
