use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub use common::config::{
    ConsumerConfig, CredentialsConfig, DatabaseConfig, DatabaseKind, LoggingConfig, MediaConfig,
    MediaMethod, StreamConfig,
};

use crate::error::IngestError;

/// Ingestion process configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The four keys a credentials file may carry.
#[derive(Debug, Deserialize, Default)]
struct CredentialsFile {
    #[serde(default)]
    consumer_key: String,
    #[serde(default)]
    consumer_secret: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    access_token_secret: String,
}

fn fill_blank(slot: &mut String, value: String) {
    if slot.trim().is_empty() {
        *slot = value;
    }
}

impl AppConfig {
    /// Load from `TWEETDB_CONFIG` (default `config/config`) and `TWEETDB__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("TWEETDB_CONFIG").unwrap_or_else(|_| "config/config".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("stream.url", "https://stream.twitter.com/1.1/statuses/sample.json")?
            .set_default("stream.languages", vec!["en"])?
            .set_default("stream.producers", 2_i64)?
            .set_default("stream.queue_capacity", 100_i64)?
            .set_default("stream.idle_timeout_secs", 60_i64)?
            .set_default("stream.connect_timeout_secs", 30_i64)?
            .set_default("consumer.workers", 4_i64)?
            .set_default("consumer.log_interval_secs", 60_i64)?
            .set_default("media.enabled", false)?
            .set_default("media.method", "blob")?
            .set_default("media.path", "./media")?
            .set_default("database.kind", "sqlite")?
            .set_default("database.host", "tweetdb.sqlite")?
            .set_default("database.name", "tweetdb")?
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("TWEETDB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("stream.languages")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        if let Some(path) = config.credentials.file.clone() {
            config.merge_credentials_file(&path)?;
        }
        Ok(config)
    }

    /// Fill credential keys left blank with the values from `path`.
    fn merge_credentials_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let file: CredentialsFile = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        let creds = &mut self.credentials;
        fill_blank(&mut creds.consumer_key, file.consumer_key);
        fill_blank(&mut creds.consumer_secret, file.consumer_secret);
        fill_blank(&mut creds.access_token, file.access_token);
        fill_blank(&mut creds.access_token_secret, file.access_token_secret);
        Ok(())
    }

    /// Settings that are well-formed but unusable.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.stream.queue_capacity == 0 {
            return Err(IngestError::InvalidConfig(
                "stream.queue_capacity must be at least 1".into(),
            ));
        }
        if self.stream.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(IngestError::InvalidConfig(
                "stream.languages must name at least one language or ALL".into(),
            ));
        }
        if self.database.kind == DatabaseKind::Postgres
            && self
                .database
                .username
                .as_deref()
                .is_none_or(|u| u.trim().is_empty())
        {
            return Err(IngestError::InvalidConfig(
                "database.username is required for postgres".into(),
            ));
        }
        Ok(())
    }

    /// Credentials are only needed when talking to the upstream API.
    pub fn validate_credentials(&self) -> Result<(), IngestError> {
        let missing = self.credentials.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::MissingCredentials(missing.join(", ")))
        }
    }
}
