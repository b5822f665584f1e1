use crate::cli::{Cli, OutputFormat};
use crate::datestamp::Granularity;
use crate::error::OaiError;
use crate::verbs::{DeletedRecord, Identify};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for OaiError {
    fn from(err: ConfigError) -> Self {
        OaiError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub schema: SchemaConfig,
    pub output: OutputConfig,
}

/// Repository identity, the source of the Identify response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    pub base_url: String,
    pub repository_name: String,
    pub admin_emails: Vec<String>,
    /// Datestamp of the oldest record, in either legal syntax
    pub earliest_datestamp: Option<String>,
    pub deleted_record: DeletedRecord,
    pub granularity: Granularity,
    pub compression: Vec<String>,
}

/// Schema validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Local XSD used instead of the embedded OAI-PMH schema
    pub path: Option<PathBuf>,
    /// Check produced responses before handing them out
    pub validate_responses: bool,
    /// Maximum number of parsed schemas kept in memory
    pub cache_capacity: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/oai".to_string(),
            repository_name: "OAI-PMH Repository".to_string(),
            admin_emails: vec![],
            earliest_datestamp: None,
            deleted_record: DeletedRecord::default(),
            granularity: Granularity::default(),
            compression: vec![],
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: None,
            validate_responses: false,
            cache_capacity: 16,
        }
    }
}

impl RepositoryConfig {
    /// Builds the Identify response this configuration describes
    pub fn identify(&self) -> crate::error::Result<Identify> {
        let mut identify = Identify::with_settings(
            self.base_url.as_str(),
            self.repository_name.as_str(),
            self.deleted_record,
            self.granularity,
        )?;
        for email in &self.admin_emails {
            identify.append_admin_email(email.as_str());
        }
        if let Some(earliest) = &self.earliest_datestamp {
            identify.set_earliest_datestamp(earliest.as_str());
        }
        for compression in &self.compression {
            identify.append_compression(compression.as_str());
        }
        Ok(identify)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "oai-pmh.toml",
            "oai-pmh.json",
            ".oai-pmh.toml",
            ".oai-pmh.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("oai-pmh");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Repository identity
        if let Some(base_url) = env.get("OAI_PMH_BASE_URL") {
            config.repository.base_url = base_url;
        }

        if let Some(name) = env.get("OAI_PMH_REPOSITORY_NAME") {
            config.repository.repository_name = name;
        }

        if let Some(emails) = env.get("OAI_PMH_ADMIN_EMAILS") {
            config.repository.admin_emails = split_list(&emails);
        }

        if let Some(earliest) = env.get("OAI_PMH_EARLIEST_DATESTAMP") {
            config.repository.earliest_datestamp = Some(earliest);
        }

        if let Some(deleted) = env.get("OAI_PMH_DELETED_RECORD") {
            config.repository.deleted_record = parse_env("OAI_PMH_DELETED_RECORD", &deleted)?;
        }

        if let Some(granularity) = env.get("OAI_PMH_GRANULARITY") {
            config.repository.granularity = parse_env("OAI_PMH_GRANULARITY", &granularity)?;
        }

        // Schema settings
        if let Some(path) = env.get("OAI_PMH_SCHEMA_PATH") {
            config.schema.path = Some(PathBuf::from(path));
        }

        if let Some(validate) = env.get("OAI_PMH_VALIDATE_RESPONSES") {
            config.schema.validate_responses = parse_env("OAI_PMH_VALIDATE_RESPONSES", &validate)?;
        }

        if let Some(capacity) = env.get("OAI_PMH_SCHEMA_CACHE_CAPACITY") {
            config.schema.cache_capacity = parse_env("OAI_PMH_SCHEMA_CACHE_CAPACITY", &capacity)?;
        }

        // Output settings
        if let Some(format) = env.get("OAI_PMH_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid OAI_PMH_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(base_url) = &cli.base_url {
            config.repository.base_url = base_url.clone();
        }
        if let Some(format) = cli.format {
            config.output.format = format;
        }
        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let repository = &config.repository;

        if !(repository.base_url.starts_with("http://")
            || repository.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "Base URL must be an http(s) URL: {}",
                repository.base_url
            )));
        }

        if repository.repository_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Repository name cannot be empty".to_string(),
            ));
        }

        for email in &repository.admin_emails {
            if !email.contains('@') {
                return Err(ConfigError::Validation(format!(
                    "Invalid admin email: {}",
                    email
                )));
            }
        }

        if let Some(earliest) = &repository.earliest_datestamp {
            match Granularity::detect(earliest) {
                None => {
                    return Err(ConfigError::Validation(format!(
                        "Invalid earliest datestamp: {}",
                        earliest
                    )));
                }
                Some(Granularity::Seconds) if repository.granularity == Granularity::Day => {
                    return Err(ConfigError::Validation(format!(
                        "Earliest datestamp {} is finer than the repository granularity",
                        earliest
                    )));
                }
                Some(_) => {}
            }
        }

        if config.schema.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "Schema cache capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}
