use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::format::{DEFAULT_API_BASE, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL};
use crate::service::DEFAULT_LANGUAGE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcript extraction settings
    pub extraction: ExtractionConfig,

    /// Reformatting collaborator settings
    pub formatting: FormattingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Language requested when the command line does not name one
    pub default_language: String,

    /// Optional network timeout in seconds; the upstream contract has none,
    /// so this stays unset unless the user opts in
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattingConfig {
    /// Base URL of the OpenAI-compatible completion API
    pub api_base: String,

    /// Model used when the request does not name one
    pub model: String,

    /// Instructions used when the request does not carry any
    pub instructions: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig {
                default_language: DEFAULT_LANGUAGE.to_string(),
                request_timeout_secs: None,
            },
            formatting: FormattingConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                model: DEFAULT_MODEL.to_string(),
                instructions: DEFAULT_INSTRUCTIONS.to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubescribe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        Url::parse(&self.formatting.api_base)
            .with_context(|| format!("Invalid formatting API base: {}", self.formatting.api_base))?;

        if self.extraction.request_timeout_secs == Some(0) {
            anyhow::bail!("Request timeout must be greater than zero when set");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Default Language: {}", self.extraction.default_language);
        match self.extraction.request_timeout_secs {
            Some(secs) => println!("  Request Timeout: {}s", secs),
            None => println!("  Request Timeout: none"),
        }
        println!("  Formatting API: {}", self.formatting.api_base);
        println!("  Formatting Model: {}", self.formatting.model);
    }

    /// HTTP client shared by the extraction and formatting paths
    pub fn http_client(&self) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(secs) = self.extraction.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("Failed to build HTTP client")
    }
}
