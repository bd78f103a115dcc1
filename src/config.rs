//! Configuration management for the Bedrock client

use crate::conversation::InferenceParams;
use crate::error::{AppError, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default Deepseek-R1 inference profile
pub const DEFAULT_MODEL_ID: &str = "us.deepseek.r1-v1:0";

/// Query `maxTokens` when nothing else sets it
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
/// Query temperature when nothing else sets it
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
/// Query top-p when nothing else sets it
pub const DEFAULT_TOP_P: f32 = 0.9;

const ENV_SERVICE_NAME: &str = "AWS_SERVICE_NAME";
const ENV_REGION: &str = "AWS_REGION_NAME";
const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_MODEL_ID: &str = "BEDROCK_MODEL_ID";
const ENV_MAX_TOKENS: &str = "BEDROCK_MAX_TOKENS";
const ENV_TEMPERATURE: &str = "BEDROCK_TEMPERATURE";
const ENV_TOP_P: &str = "BEDROCK_TOP_P";

/// Application configuration
///
/// Credentials are never written to the config file; they come from the
/// environment or a `.env` file only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AWS service exposing the Converse API
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// AWS region, e.g. `us-west-2`
    #[serde(default)]
    pub region: String,

    /// AWS access key id
    #[serde(skip)]
    pub access_key_id: String,

    /// AWS secret access key
    #[serde(skip)]
    pub secret_access_key: String,

    /// Bedrock model or inference profile id
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// System prompt for one-shot queries
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum tokens for response; unset means the per-command default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature; unset means the per-command default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold; unset means the per-command default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            region: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            model_id: default_model_id(),
            system_prompt: default_system_prompt(),
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the environment and the config file.
    ///
    /// Credentials are not required here; see [`Config::require_credentials`].
    pub async fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let base = match Self::config_path() {
            Ok(path) => Self::load_from_path(&path).await.unwrap_or_else(|e| {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply variables from `lookup` on top of `self`; blank values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(service_name) = var(ENV_SERVICE_NAME) {
            self.service_name = service_name;
        }
        if let Some(region) = var(ENV_REGION) {
            self.region = region;
        }
        if let Some(access_key_id) = var(ENV_ACCESS_KEY_ID) {
            self.access_key_id = access_key_id;
        }
        if let Some(secret_access_key) = var(ENV_SECRET_ACCESS_KEY) {
            self.secret_access_key = secret_access_key;
        }
        if let Some(model_id) = var(ENV_MODEL_ID) {
            self.model_id = model_id;
        }
        if let Some(max_tokens) = var(ENV_MAX_TOKENS) {
            self.max_tokens = Some(parse_var(ENV_MAX_TOKENS, &max_tokens)?);
        }
        if let Some(temperature) = var(ENV_TEMPERATURE) {
            self.temperature = Some(parse_var(ENV_TEMPERATURE, &temperature)?);
        }
        if let Some(top_p) = var(ENV_TOP_P) {
            self.top_p = Some(parse_var(ENV_TOP_P, &top_p)?);
        }

        Ok(self)
    }

    /// Check that the service name, region and both credentials are set
    pub fn require_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            (ENV_SERVICE_NAME, &self.service_name),
            (ENV_REGION, &self.region),
            (ENV_ACCESS_KEY_ID, &self.access_key_id),
            (ENV_SECRET_ACCESS_KEY, &self.secret_access_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::ConfigurationMissing(missing.join(", ")));
        }

        Ok(())
    }

    /// Read a config file; a missing file yields the defaults
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        toml::from_str(&content).map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Save configuration to the default config file
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Save configuration to `path`
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::ConfigError(e.to_string()))?;

        tokio::fs::write(path, content).await?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let mut path = config_dir()
            .ok_or_else(|| AppError::ConfigError("Could not find config directory".to_string()))?;
        path.push("deepseek-bedrock");
        path.push("config.toml");
        Ok(path)
    }

    /// Inference parameters for one-shot queries
    pub fn params(&self) -> InferenceParams {
        InferenceParams {
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.unwrap_or(DEFAULT_TOP_P),
        }
    }

    /// Human-readable summary with the secret masked
    pub fn redacted(&self) -> String {
        let params = self.params();
        format!(
            "service_name      = {}\n\
             region            = {}\n\
             access_key_id     = {}\n\
             secret_access_key = {}\n\
             model_id          = {}\n\
             system_prompt     = {}\n\
             max_tokens        = {}\n\
             temperature       = {}\n\
             top_p             = {}",
            self.service_name,
            self.region,
            mask(&self.access_key_id),
            mask(&self.secret_access_key),
            self.model_id,
            self.system_prompt,
            params.max_tokens,
            params.temperature,
            params.top_p,
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::ConfigError(format!("Invalid {name} value: {value}")))
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

fn default_service_name() -> String {
    "bedrock-runtime".to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_system_prompt() -> String {
    "You're a helpful assistant that specializes in physics.".to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask("AKIAEXAMPLE"), "AKIA****");
        assert_eq!(mask("abc"), "****");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = Config::default()
            .with_overrides(lookup(&[
                ("AWS_REGION_NAME", "  "),
                ("AWS_ACCESS_KEY_ID", "id"),
                ("AWS_SECRET_ACCESS_KEY", "secret"),
            ]))
            .unwrap();
        match config.require_credentials() {
            Err(AppError::ConfigurationMissing(names)) => assert_eq!(names, "AWS_REGION_NAME"),
            other => panic!("Expected ConfigurationMissing, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let result = Config::default().with_overrides(lookup(&[
            ("AWS_REGION_NAME", "us-west-2"),
            ("AWS_ACCESS_KEY_ID", "id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("BEDROCK_MAX_TOKENS", "lots"),
        ]));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn unset_sampling_values_fall_back_to_query_defaults() {
        let config = Config {
            temperature: Some(0.1),
            ..Config::default()
        };
        let params = config.params();
        assert_eq!(params.max_tokens, DEFAULT_MAX_TOKENS);
        assert!((params.temperature - 0.1).abs() < f32::EPSILON);
        assert!((params.top_p - DEFAULT_TOP_P).abs() < f32::EPSILON);
    }
}
