use crate::core::config::LoggingSection;
use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::anyhow;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";

/// Resolved logging configuration after applying the `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: Option<ConsoleOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: false,
            console_output: None,
        }
    }
}

impl LoggingConfig {
    /// Defaults overlaid with the configured section, then validated.
    pub fn from_section(section: &LoggingSection) -> Result<Self> {
        let mut config = LoggingConfig::default();
        config.apply(section);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, section: &LoggingSection) {
        if let Some(log_dir) = &section.log_dir {
            self.log_dir = Some(log_dir.clone());
        }
        if let Some(default_level) = &section.default_level {
            self.default_level = default_level.clone();
        }
        if let Some(enable_file) = section.enable_file {
            self.enable_file = enable_file;
        }
        if let Some(console_output) = section.console_output {
            self.console_output = Some(console_output);
        }
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        Ok(())
    }
}
