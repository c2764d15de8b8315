//! Configuration management for remote-shell.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::driver::DEFAULT_PROMPT;
use crate::remote::ProviderOptions;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell behavior.
    pub shell: ShellSection,
    /// Remote provider settings.
    pub provider: ProviderSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Shell configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// Interactive prompt.
    pub prompt: String,
    /// Seed shell variables from the process environment.
    pub import_env: bool,
    /// Print a greeting when the interactive prompt starts.
    pub banner: bool,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            import_env: true,
            banner: true,
        }
    }
}

/// Provider configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Activity lifetime in seconds.
    pub timeout_secs: u64,
    /// Limit for a single `run`, in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Directory standing in for the remote filesystem.
    pub workdir: Option<PathBuf>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            timeout_secs: 3600,
            command_timeout_secs: None,
            workdir: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter
    /// directive such as `remote_shell=debug,tokio=warn`.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(prompt) = var("REMOTE_SHELL_PROMPT") {
            self.shell.prompt = prompt;
        }

        if let Some(timeout) = var("REMOTE_SHELL_TIMEOUT") {
            self.provider.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(timeout))?;
        }

        if let Some(dir) = var("REMOTE_SHELL_WORKDIR") {
            if !dir.is_empty() {
                self.provider.workdir = Some(PathBuf::from(dir));
            }
        }

        if let Some(level) = var("REMOTE_SHELL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if args.no_env {
            self.shell.import_env = false;
        }

        if let Some(secs) = args.timeout_secs {
            self.provider.timeout_secs = secs;
        }

        if let Some(ref dir) = args.workdir {
            self.provider.workdir = Some(dir.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env()?;
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("0".to_string()));
        }
        Ok(())
    }

    /// Settings for the remote provider.
    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            workdir: self.provider.workdir.clone(),
            activity_timeout: Duration::from_secs(self.provider.timeout_secs),
            command_timeout: self.provider.command_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Get the log filter directive.
    ///
    /// A bare level applies to this crate only; anything else is passed
    /// through as a full directive.
    pub fn log_filter(&self) -> String {
        let level = self.logging.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("remote_shell={}", level)
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Activity timeout that is not a positive number of seconds.
    InvalidTimeout(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidTimeout(value) => write!(f, "invalid activity timeout: '{}'", value),
        }
    }
}

impl std::error::Error for ConfigError {}
