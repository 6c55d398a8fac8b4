//! Generator configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use knowdebug_core::driver::DriverConfig;
use knowdebug_core::policy::AssessmentPolicy;
use knowdebug_core::traits::QuestionGenerator;

use crate::gemini::GeminiBackend;
use crate::generator::PromptedGenerator;
use crate::mock::MockGenerator;
use crate::openai::OpenAiBackend;

/// Configuration for a single question generator.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeneratorConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Mock,
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorConfig::Gemini {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            GeneratorConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .field("model", model)
                .finish(),
            GeneratorConfig::Mock => f.write_str("Mock"),
        }
    }
}

impl GeneratorConfig {
    /// API key, for generators that need one.
    fn api_key(&self) -> Option<&str> {
        match self {
            GeneratorConfig::Gemini { api_key, .. } | GeneratorConfig::OpenAI { api_key, .. } => {
                Some(api_key)
            }
            GeneratorConfig::Mock => None,
        }
    }
}

/// Top-level knowdebug configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowdebugConfig {
    /// Generator configurations keyed by name.
    #[serde(default)]
    pub generators: HashMap<String, GeneratorConfig>,
    /// Generator to use when none is named.
    #[serde(default = "default_generator")]
    pub default_generator: String,
    /// Max retries on generator errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Stop a domain after this many questions.
    #[serde(default)]
    pub max_questions_per_domain: Option<u32>,
    /// Output directory for sessions and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub policy: AssessmentPolicy,
}

fn default_generator() -> String {
    "gemini".to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./knowdebug-results")
}

impl Default for KnowdebugConfig {
    fn default() -> Self {
        Self {
            generators: HashMap::new(),
            default_generator: default_generator(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            max_questions_per_domain: None,
            output_dir: default_output_dir(),
            policy: AssessmentPolicy::default(),
        }
    }
}

impl KnowdebugConfig {
    /// Driver settings derived from this configuration.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_questions_per_domain: self.max_questions_per_domain,
            policy: self.policy.clone(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().map(resolve_env_vars)
}

/// Resolve env vars in a generator config.
fn resolve_generator_config(config: &GeneratorConfig) -> GeneratorConfig {
    match config {
        GeneratorConfig::Gemini {
            api_key,
            base_url,
            model,
        } => GeneratorConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            model: resolve_opt(model),
        },
        GeneratorConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            model,
        } => GeneratorConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            org_id: resolve_opt(org_id),
            model: resolve_opt(model),
        },
        GeneratorConfig::Mock => GeneratorConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `knowdebug.toml` in the current directory
/// 2. `~/.config/knowdebug/config.toml`
///
/// Environment variable overrides: `KNOWDEBUG_GEMINI_KEY`, `KNOWDEBUG_OPENAI_KEY`.
pub fn load_config() -> Result<KnowdebugConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<KnowdebugConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("knowdebug.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<KnowdebugConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => KnowdebugConfig::default(),
    };

    apply_env_overrides(&mut config);

    // Resolve env vars in all generator configs
    config.generators = config
        .generators
        .iter()
        .map(|(k, v)| (k.clone(), resolve_generator_config(v)))
        .collect();

    config
        .policy
        .validate()
        .context("invalid [policy] section in config")?;

    Ok(config)
}

fn apply_env_overrides(config: &mut KnowdebugConfig) {
    if let Ok(key) = std::env::var("KNOWDEBUG_GEMINI_KEY") {
        let entry = config
            .generators
            .entry("gemini".into())
            .or_insert(GeneratorConfig::Gemini {
                api_key: String::new(),
                base_url: None,
                model: None,
            });
        if let GeneratorConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("KNOWDEBUG_OPENAI_KEY") {
        let entry = config
            .generators
            .entry("openai".into())
            .or_insert(GeneratorConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
                model: None,
            });
        if let GeneratorConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("knowdebug"))
}

/// Create a generator instance from its configuration.
pub fn create_generator(config: &GeneratorConfig) -> Arc<dyn QuestionGenerator> {
    match config {
        GeneratorConfig::Gemini {
            api_key,
            base_url,
            model,
        } => Arc::new(PromptedGenerator::new(GeminiBackend::new(
            api_key,
            base_url.clone(),
            model.clone(),
        ))),
        GeneratorConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            model,
        } => Arc::new(PromptedGenerator::new(OpenAiBackend::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
            model.clone(),
        ))),
        GeneratorConfig::Mock => Arc::new(MockGenerator::new()),
    }
}

/// Pick a generator by name (or the configured default).
///
/// A built-in `gemini`, `openai` or `mock` name works without a config
/// entry. A generator whose API key is empty falls back to the mock
/// generator with a warning.
pub fn resolve_generator(
    config: &KnowdebugConfig,
    name: Option<&str>,
) -> Result<Arc<dyn QuestionGenerator>> {
    let name = name.unwrap_or(&config.default_generator);
    let generator_config = match config.generators.get(name) {
        Some(c) => c.clone(),
        None => builtin_config(name).with_context(|| {
            let mut known: Vec<&str> = config.generators.keys().map(String::as_str).collect();
            known.sort_unstable();
            format!(
                "unknown generator '{name}' (configured: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })?,
    };

    if generator_config.api_key().is_some_and(|k| k.trim().is_empty()) {
        tracing::warn!(generator = name, "no API key configured, using mock data");
        return Ok(Arc::new(MockGenerator::new()));
    }

    tracing::debug!(generator = name, config = ?generator_config, "using generator");
    Ok(create_generator(&generator_config))
}

fn builtin_config(name: &str) -> Option<GeneratorConfig> {
    match name {
        "gemini" => Some(GeneratorConfig::Gemini {
            api_key: String::new(),
            base_url: None,
            model: None,
        }),
        "openai" => Some(GeneratorConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            org_id: None,
            model: None,
        }),
        "mock" => Some(GeneratorConfig::Mock),
        _ => None,
    }
}
