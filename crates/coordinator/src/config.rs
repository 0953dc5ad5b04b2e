//! Assistant configuration and secrets.
//!
//! Tunables live in an optional TOML file where every field has a default.
//! API keys never do: they come from the environment, optionally seeded from
//! a `.env` file.

use std::path::Path;

use aisle_llm::{CompletionConfig, CompletionProvider};
use aisle_memory::{EmbeddingConfig, EmbeddingProvider, MemoryConfig};
use aisle_tools::{FetchConfig, SearchConfig};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const SERPAPI_API_KEY: &str = "SERPAPI_API_KEY";
pub const AI21_API_KEY: &str = "AI21_API_KEY";
pub const COHERE_API_KEY: &str = "COHERE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub assistant: AssistantSettings,
    pub completion: CompletionConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Store the assistant works for; appears in prompts and tool descriptions
    pub retailer: String,

    /// Action-selection steps allowed per query
    pub max_iterations: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            retailer: "Home Depot".to_string(),
            max_iterations: 15,
        }
    }
}

impl AssistantConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        reject_world_writable(path)?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.assistant.max_iterations == 0 {
            bail!("assistant.max_iterations must be at least 1");
        }
        if self.memory.top_k == 0 {
            bail!("memory.top_k must be at least 1");
        }
        if self.assistant.retailer.trim().is_empty() {
            bail!("assistant.retailer must not be empty");
        }
        if self.completion.max_concurrent_requests == 0 {
            bail!("completion.max_concurrent_requests must be at least 1");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn reject_world_writable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    if !metadata.is_file() {
        bail!("Config path '{}' is not a regular file", path.display());
    }

    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o002 != 0 {
        bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            mode,
            path.display()
        );
    }
    Ok(())
}

/// The three service keys the assistant needs.
#[derive(Clone)]
pub struct Credentials {
    pub serpapi_api_key: String,
    pub ai21_api_key: String,
    pub cohere_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Read keys from the process environment after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve keys through `lookup`. Fails on the first missing or blank key,
    /// naming the variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let require = |name: &str| -> anyhow::Result<String> {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("Missing required environment variable {name}"),
            }
        };
        Ok(Self {
            serpapi_api_key: require(SERPAPI_API_KEY)?,
            ai21_api_key: require(AI21_API_KEY)?,
            cohere_api_key: require(COHERE_API_KEY)?,
        })
    }

    /// Key for the configured completion provider.
    pub fn completion_key(&self, provider: CompletionProvider) -> &str {
        match provider {
            CompletionProvider::Ai21 => &self.ai21_api_key,
            CompletionProvider::Cohere => &self.cohere_api_key,
        }
    }

    /// Key for the configured embedding provider; empty for local models.
    pub fn embedding_key(&self, provider: EmbeddingProvider) -> &str {
        match provider {
            EmbeddingProvider::Cohere => &self.cohere_api_key,
            EmbeddingProvider::Local => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: AssistantConfig = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.assistant.retailer, "Home Depot");
        assert_eq!(config.assistant.max_iterations, 15);
        assert_eq!(config.memory.top_k, 4);
        assert_eq!(config.fetch.settle_delay_ms, 20_000);
    }

    #[test]
    fn zero_iterations_rejected() {
        let config: AssistantConfig = toml::from_str("[assistant]\nmax_iterations = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn zero_top_k_rejected() {
        let config: AssistantConfig = toml::from_str("[memory]\ntop_k = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        assert!(toml::from_str::<AssistantConfig>("[completion]\nprovider = \"gpt\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[assistant]\nretailer = \"Lowe's\"\nmax_iterations = 3\n\n[fetch]\nbackend = \"http\""
        )
        .unwrap();

        let config = AssistantConfig::from_file(file.path()).unwrap();
        assert_eq!(config.assistant.retailer, "Lowe's");
        assert_eq!(config.assistant.max_iterations, 3);
        assert_eq!(config.fetch.backend, aisle_tools::FetchBackend::Http);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AssistantConfig::from_file("/nonexistent/aisle.toml").is_err());
    }

    #[test]
    fn credentials_resolve() {
        let vars = env(&[
            (SERPAPI_API_KEY, "serp"),
            (AI21_API_KEY, "ai21"),
            (COHERE_API_KEY, "cohere"),
        ]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.completion_key(CompletionProvider::Ai21), "ai21");
        assert_eq!(creds.completion_key(CompletionProvider::Cohere), "cohere");
        assert_eq!(creds.embedding_key(EmbeddingProvider::Cohere), "cohere");
        assert!(!format!("{creds:?}").contains("serp"));
    }

    #[test]
    fn missing_credential_is_named() {
        let vars = env(&[(SERPAPI_API_KEY, "serp"), (AI21_API_KEY, "  ")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains(AI21_API_KEY));
    }
}
