use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::loader::{MarkdownLoader, SUPPORTED_EXTENSIONS};

pub const ENV_PREFIX: &str = "DOCRAG_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub chunking: ChunkingSettings,
    pub index: IndexSettings,
    pub chat: ChatSettings,
    pub responder: ResponderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    pub sources: Vec<String>,
    pub corpus: String,
    pub index: String,
    pub transcript: String,
    /// File extensions picked up from source directories, without the dot.
    pub extensions: Vec<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            sources: vec!["README.md".into(), "docs".into(), "content".into()],
            corpus: "data/docrag/corpus.jsonl".into(),
            index: "data/docrag/index.json".into(),
            transcript: "data/docrag/transcript.json".into(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl PathSettings {
    pub fn sources(&self) -> Vec<PathBuf> { self.sources.iter().map(expand_path).collect() }
    pub fn corpus(&self) -> PathBuf { expand_path(&self.corpus) }
    pub fn index(&self) -> PathBuf { expand_path(&self.index) }
    pub fn transcript(&self) -> PathBuf { expand_path(&self.transcript) }
    pub fn loader(&self) -> MarkdownLoader { MarkdownLoader::with_extensions(&self.extensions) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_words: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        let d = ChunkingConfig::default();
        Self { max_words: d.max_words, overlap: d.overlap }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    pub max_features: Option<usize>,
    pub min_term_length: usize,
}

impl Default for IndexSettings {
    fn default() -> Self { Self { max_features: None, min_term_length: 2 } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatSettings {
    pub system_prompt: Option<String>,
    pub history_limit: usize,
    pub top_k: usize,
    pub min_score: f64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { system_prompt: None, history_limit: 6, top_k: 4, min_score: 0.05 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponderKind {
    #[default]
    Local,
    Http,
}

impl FromStr for ResponderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown responder '{other}' (expected local or http)")),
        }
    }
}

impl fmt::Display for ResponderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Local => "local", Self::Http => "http" })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponderSettings {
    pub kind: ResponderKind,
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: f64,
    pub require_context: bool,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self { kind: ResponderKind::Local, url: None, token: None, timeout_secs: 60.0, require_context: true }
    }
}

impl Settings {
    pub fn chunking(&self) -> Result<ChunkingConfig> {
        ChunkingConfig::new(self.chunking.max_words, self.chunking.overlap)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking()?;
        if self.paths.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(Error::InvalidConfig("paths.extensions must name at least one extension".into()));
        }
        if self.chat.top_k == 0 {
            return Err(Error::InvalidConfig("chat.top_k must be greater than 0".into()));
        }
        if !self.chat.min_score.is_finite() {
            return Err(Error::InvalidConfig("chat.min_score must be a finite number".into()));
        }
        if self.responder.kind == ResponderKind::Http && self.responder.url.as_deref().map_or(true, str::is_empty) {
            return Err(Error::InvalidConfig("responder.url is required for the http responder".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("docrag.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("docrag.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("docrag.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("docrag.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
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
