#![allow(clippy::result_large_err)]

use super::SentryConfig;
use crate::core::error::AppError;
use crate::core::manifest::AllowList;
use crate::core::types::ErrorCategory;
use std::collections::HashSet;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules before any stage runs
    pub fn validate(config: &SentryConfig) -> Result<(), AppError> {
        if config.render.binary.trim().is_empty() {
            return Err(config_error("MS-CFG-002", "render.binary cannot be empty"));
        }

        if config.schema.enabled && config.schema.binary.trim().is_empty() {
            return Err(config_error(
                "MS-CFG-002",
                "schema.binary cannot be empty when schema validation is enabled",
            ));
        }

        if config
            .required_binaries()
            .iter()
            .any(|binary| binary.trim().is_empty())
        {
            return Err(config_error(
                "MS-CFG-002",
                "required_binaries cannot contain empty entries",
            ));
        }

        AllowList::new(&config.secrets.allowed)
            .map_err(|e| config_error("MS-CFG-003", format!("secrets.allowed: {}", e)))?;

        let mut names = HashSet::new();
        for rule in &config.custom_rules {
            rule.compile()
                .map_err(|e| config_error("MS-CFG-004", e.to_string()))?;
            if !names.insert(rule.name.as_str()) {
                return Err(config_error(
                    "MS-CFG-004",
                    format!("custom rule '{}' is defined more than once", rule.name),
                ));
            }
        }

        Ok(())
    }
}

fn config_error(code: &str, message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ConfigError, message).with_code(code)
}
