use crate::core::combination::DEFAULT_CHAIN_JOINER;
use crate::core::schedule::{ScheduleRules, DEFAULT_MAX_DAYS, DEFAULT_PLACEHOLDER_TITLE};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_currency_code, validate_range, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub content: ContentConfig,
    pub schedule: ScheduleConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Placed between the pieces of a chain resolution.
    pub chain_joiner: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            chain_joiner: DEFAULT_CHAIN_JOINER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// `{n}` is replaced with the day number.
    pub placeholder_title: String,
    pub max_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub default_currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| EngineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn schedule_rules(&self) -> ScheduleRules {
        ScheduleRules {
            placeholder_title: self.schedule.placeholder_title.clone(),
            max_days: self.schedule.max_days,
        }
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables are left
/// as written.
pub(crate) fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EngineError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });
    Ok(result.into_owned())
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        if !self.schedule.placeholder_title.contains("{n}") {
            return Err(EngineError::validation(
                "schedule.placeholder_title",
                "placeholder title must contain {n}",
            ));
        }
        validate_range("schedule.max_days", self.schedule.max_days, 1, 366)?;
        validate_currency_code("pricing.default_currency", &self.pricing.default_currency)?;

        let levels = ["trace", "debug", "info", "warn", "error"];
        if !levels.contains(&self.logging.level.as_str()) {
            return Err(EngineError::validation(
                "logging.level",
                format!(
                    "unsupported level '{}', expected one of {}",
                    self.logging.level,
                    levels.join(", ")
                ),
            ));
        }
        Ok(())
    }
}
