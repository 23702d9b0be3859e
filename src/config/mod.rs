// Configuration module

use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

use crate::chain::ChainDefaults;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level settings for a processing pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub defaults: ChainDefaults,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How batch jobs are spread over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Sequential,
    Fixed,
    Elastic,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Worker count, required by the `fixed` strategy.
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default = "default_preserve_order")]
    pub preserve_order: bool,
}

fn default_preserve_order() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            threads: None,
            preserve_order: default_preserve_order(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl PipelineConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env(yaml)?;
        let config: PipelineConfig = serde_yaml::from_str(&substituted)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.batch.strategy, self.batch.threads) {
            (StrategyKind::Fixed, None) => {
                return Err(ConfigError::invalid(
                    "batch.threads",
                    "required when strategy is 'fixed'",
                ));
            }
            (_, Some(0)) => {
                return Err(ConfigError::invalid("batch.threads", "must be at least 1"));
            }
            _ => {}
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!(
                    "'{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

static ENV_VAR_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn env_var_pattern() -> Result<&'static Regex, ConfigError> {
    ENV_VAR_PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").ok())
        .as_ref()
        .ok_or_else(|| {
            ConfigError::invalid("pattern", "environment variable pattern failed to compile")
        })
}

/// Replace every `${VAR_NAME}` with the variable's value.
fn substitute_env(yaml: &str) -> Result<String, ConfigError> {
    let re = env_var_pattern()?;

    let mut out = String::with_capacity(yaml.len());
    let mut last = 0;
    for caps in re.captures_iter(yaml) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = std::env::var(name.as_str())
            .map_err(|_| ConfigError::MissingEnvVar(name.as_str().to_string()))?;
        out.push_str(&yaml[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&yaml[last..]);
    Ok(out)
}
