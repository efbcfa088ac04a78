//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_CHUNKING__CHUNK_SIZE`). The typed
//! [`Settings`] are extracted once at startup and passed by reference into each
//! component; nothing reads configuration from global state.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current working directory, selecting the profile file by `RUST_ENV`.
    pub fn load() -> Result<Self> {
        let base = env::current_dir()
            .map_err(|e| Error::InvalidConfiguration(format!("cannot resolve working directory: {e}")))?;
        Self::load_from(&base)
    }

    /// Load `config.toml` (+ profile file) from `base_dir`. Relative paths in the
    /// settings are resolved against `base_dir`.
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            other => tracing::debug!(env = other, "no profile file for environment"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        tracing::debug!(env = %env_name, base = %base_dir.display(), "configuration sources merged");

        Ok(Self { figment, base_dir: base_dir.to_path_buf() })
    }

    /// Load from an explicit file instead of the profile lookup; env vars still apply.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, base_dir })
    }

    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfiguration(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract, resolve and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        settings.storage.data_path = resolve_with_base(&self.base_dir, settings.storage.data_path.to_string_lossy());
        settings.storage.index_path = resolve_with_base(&self.base_dir, settings.storage.index_path.to_string_lossy());
        if let Some(dir) = settings.embedding.model_dir.take() {
            settings.embedding.model_dir = Some(resolve_with_base(&self.base_dir, dir.to_string_lossy()));
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path { &self.base_dir }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub storage: StorageSettings,
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Model identifier; `"fake"` selects the hashing embedder.
    pub model: String,
    pub model_dir: Option<PathBuf>,
    /// Dimensionality of the hashing embedder. Real models report their own.
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
    pub parallelism: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            dimension: 384,
            max_len: 256,
            batch_size: 32,
            parallelism: 2,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { chunk_size: 1600, chunk_overlap: 200 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 3 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_path: PathBuf,
    pub index_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { data_path: PathBuf::from("data/sample.pdf"), index_path: PathBuf::from("vector_db/index.arrow") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_retries: 0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfiguration(msg)) };
        if self.chunking.chunk_size <= self.chunking.chunk_overlap {
            return invalid(format!(
                "chunking.chunk_size ({}) must be greater than chunking.chunk_overlap ({})",
                self.chunking.chunk_size, self.chunking.chunk_overlap
            ));
        }
        if self.retrieval.top_k == 0 { return invalid("retrieval.top_k must be at least 1".to_string()); }
        if self.embedding.model.trim().is_empty() { return invalid("embedding.model is empty".to_string()); }
        if self.embedding.batch_size == 0 { return invalid("embedding.batch_size must be at least 1".to_string()); }
        if self.embedding.parallelism == 0 { return invalid("embedding.parallelism must be at least 1".to_string()); }
        if self.embedding.dimension == 0 { return invalid("embedding.dimension must be at least 1".to_string()); }
        if self.generation.model.trim().is_empty() { return invalid("generation.model is empty".to_string()); }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return invalid(format!("generation.temperature {} is outside [0, 2]", self.generation.temperature));
        }
        Ok(())
    }

    /// Read the generator API key from the environment variable named in the settings.
    pub fn require_api_key(&self) -> Result<String> {
        let var = &self.generation.api_key_env;
        match env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(Error::InvalidConfiguration(format!("Missing required environment variable: {var}"))),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
