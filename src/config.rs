//! Service configuration: YAML file, environment overrides, validation.
//!
//! Loaded once at startup. Any problem here is a `ConfigError` and the
//! process exits before accepting requests.

use crate::llm::BackendKind;
use crate::prompt::{PromptTemplate, PromptVariant, SchemaStyle};
use crate::types::{Result, Text2SqlError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when no path is given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "config/local.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Local seq2seq model (disabled when absent)
    pub local: Option<LocalModelConfig>,

    /// Remote chat-completion API (disabled when absent)
    pub remote: Option<RemoteApiConfig>,

    /// Groq chat-completion API, served next to `remote` (disabled when absent)
    #[serde(deserialize_with = "groq_section")]
    pub groq: Option<RemoteApiConfig>,

    /// Route to backend bindings
    pub routes: RoutesConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single inference call, queueing included
    pub inference_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5006,
            inference_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Inference timeout as a `Duration`.
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

/// Compute device for the local model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    /// CUDA device 0 when available, CPU otherwise
    #[default]
    Auto,
    Cpu,
}

/// Local seq2seq model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    /// Directory with `config.json`, `tokenizer.json` and weights
    pub model_dir: Option<PathBuf>,

    /// Hugging Face model id, fetched through the hub cache when `model_dir` is unset
    pub model_id: Option<String>,

    /// Prompt tokens beyond this are truncated
    pub max_input_tokens: usize,

    /// Default generated-token limit
    pub max_output_tokens: usize,

    /// Beam width (1 = greedy)
    pub num_beams: usize,

    /// Blocking worker pool size
    pub max_concurrent_inferences: usize,

    /// Exponent on hypothesis length when ranking beams (0.0 = raw log-prob)
    pub length_penalty: f32,

    pub device: DeviceChoice,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            model_id: None,
            max_input_tokens: 512,
            max_output_tokens: 128,
            num_beams: 4,
            max_concurrent_inferences: 2,
            length_penalty: 1.0,
            device: DeviceChoice::Auto,
        }
    }
}

/// Remote chat-completion API settings (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteApiConfig {
    /// API base URL, or the full `/chat/completions` URL
    pub base_url: String,

    pub api_key: Option<String>,

    pub model: String,

    pub temperature: f32,

    /// Default generated-token limit
    pub max_output_tokens: usize,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_output_tokens: 512,
        }
    }
}

impl RemoteApiConfig {
    /// Defaults for the Groq API.
    pub fn groq() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            ..Self::default()
        }
    }
}

/// Remote section as written in the file; unset fields keep provider defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteApiSection {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<usize>,
}

impl RemoteApiSection {
    fn over(self, defaults: RemoteApiConfig) -> RemoteApiConfig {
        RemoteApiConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            api_key: self.api_key.or(defaults.api_key),
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
        }
    }
}

fn groq_section<'de, D>(deserializer: D) -> std::result::Result<Option<RemoteApiConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RemoteApiSection>::deserialize(deserializer)?
        .map(|section| section.over(RemoteApiConfig::groq())))
}

/// Binding of one route to a backend and prompt format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub backend: BackendKind,

    pub template: PromptTemplate,

    #[serde(default)]
    pub schema_style: SchemaStyle,

    /// Overrides the backend's default output limit
    #[serde(default)]
    pub max_output_tokens: Option<usize>,
}

impl RouteConfig {
    fn new(backend: BackendKind, template: PromptTemplate, schema_style: SchemaStyle) -> Self {
        Self {
            backend,
            template,
            schema_style,
            max_output_tokens: None,
        }
    }

    /// Prompt format for this route.
    pub fn variant(&self) -> PromptVariant {
        PromptVariant::new(self.template, self.schema_style)
    }
}

/// Bindings for every route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub simple: RouteConfig,
    pub complex: RouteConfig,
    pub gpt: RouteConfig,
    pub groq: RouteConfig,
    pub convert: RouteConfig,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            simple: RouteConfig::new(
                BackendKind::Local,
                PromptTemplate::Translate,
                SchemaStyle::Sentences,
            ),
            complex: RouteConfig::new(
                BackendKind::Local,
                PromptTemplate::Translate,
                SchemaStyle::Sentences,
            ),
            gpt: RouteConfig::new(
                BackendKind::Remote,
                PromptTemplate::Instruction,
                SchemaStyle::ColumnList,
            ),
            groq: RouteConfig::new(
                BackendKind::Groq,
                PromptTemplate::Instruction,
                SchemaStyle::ColumnList,
            ),
            convert: RouteConfig::new(
                BackendKind::Local,
                PromptTemplate::QuestionBlock,
                SchemaStyle::Sentences,
            ),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Reads `path` if given (must exist), else `config/local.yaml` if it
    /// exists, else starts from defaults. Environment overrides are applied
    /// on top, `~` is expanded in paths and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` if the file is missing or
    /// invalid, or if validation fails
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file without env overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Text2SqlError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            Text2SqlError::config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply environment overrides.
    ///
    /// `lookup` returns the value of an environment variable. Setting a model
    /// location or API key enables the matching backend if the file did not.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("TEXT2SQL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("TEXT2SQL_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(dir) = get("TEXT2SQL_MODEL_DIR") {
            self.local.get_or_insert_with(Default::default).model_dir = Some(PathBuf::from(dir));
        }
        if let Some(id) = get("TEXT2SQL_MODEL_ID") {
            self.local.get_or_insert_with(Default::default).model_id = Some(id);
        }

        if let Some(key) = get("OPENAI_API_KEY") {
            let remote = self.remote.get_or_insert_with(Default::default);
            if remote.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                remote.api_key = Some(key);
            }
        }
        if let Some(remote) = self.remote.as_mut() {
            if let Some(url) = get("TEXT2SQL_REMOTE_BASE_URL") {
                remote.base_url = url;
            }
            if let Some(model) = get("TEXT2SQL_REMOTE_MODEL") {
                remote.model = model;
            }
        }

        if let Some(key) = get("GROQ_API_KEY") {
            let groq = self.groq.get_or_insert_with(RemoteApiConfig::groq);
            if groq.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                groq.api_key = Some(key);
            }
        }
        if let Some(groq) = self.groq.as_mut() {
            if let Some(model) = get("TEXT2SQL_GROQ_MODEL") {
                groq.model = model;
            }
        }
    }

    /// Expand `~` in the local model directory.
    pub fn expand_paths(&mut self) {
        if let Some(dir) = self.local.as_mut().and_then(|l| l.model_dir.as_mut()) {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            *dir = PathBuf::from(expanded);
        }
    }

    /// Check that every enabled backend has what it needs.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` describing the first problem
    pub fn validate(&self) -> Result<()> {
        if self.local.is_none() && self.remote.is_none() && self.groq.is_none() {
            return Err(Text2SqlError::config(
                "no inference backend configured: set local.model_dir, local.model_id, OPENAI_API_KEY or GROQ_API_KEY",
            ));
        }

        if self.server.inference_timeout_secs == 0 {
            return Err(Text2SqlError::config("server.inference_timeout_secs must be > 0"));
        }

        if let Some(local) = &self.local {
            match (&local.model_dir, &local.model_id) {
                (None, None) => {
                    return Err(Text2SqlError::config(
                        "local backend requires local.model_dir or local.model_id",
                    ));
                }
                (Some(dir), _) if !dir.is_dir() => {
                    return Err(Text2SqlError::config(format!(
                        "local.model_dir {} is not a directory",
                        dir.display()
                    )));
                }
                _ => {}
            }
            for (name, value) in [
                ("local.max_input_tokens", local.max_input_tokens),
                ("local.max_output_tokens", local.max_output_tokens),
                ("local.num_beams", local.num_beams),
                ("local.max_concurrent_inferences", local.max_concurrent_inferences),
            ] {
                if value == 0 {
                    return Err(Text2SqlError::config(format!("{} must be > 0", name)));
                }
            }
            if !local.length_penalty.is_finite() {
                return Err(Text2SqlError::config("local.length_penalty must be a finite number"));
            }
        }

        for (section, key_env, api) in [
            ("remote", "OPENAI_API_KEY", &self.remote),
            ("groq", "GROQ_API_KEY", &self.groq),
        ] {
            let Some(api) = api else { continue };
            if api.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                return Err(Text2SqlError::config(format!(
                    "{} backend requires {}.api_key or {}",
                    section, section, key_env
                )));
            }
            if !(api.base_url.starts_with("http://") || api.base_url.starts_with("https://")) {
                return Err(Text2SqlError::config(format!(
                    "{}.base_url must be an http(s) URL, got '{}'",
                    section, api.base_url
                )));
            }
        }

        Ok(())
    }

    /// `true` if the given backend is configured.
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Local => self.local.is_some(),
            BackendKind::Remote => self.remote.is_some(),
            BackendKind::Groq => self.groq.is_some(),
        }
    }
}
