use std::path::PathBuf;

use serde::Deserialize;

/// Upstream concurrent streaming sessions allowed per credential.
pub const MAX_PRODUCERS: usize = 2;

/// Wildcard entry in `stream.languages` that accepts every language.
pub const LANGUAGE_WILDCARD: &str = "ALL";

/// Upstream stream settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Streaming endpoint. Default: the public sample stream.
    #[serde(default = "default_stream_url")]
    pub url: String,
    /// Accepted language codes, or `["ALL"]`. Default: `["en"]`.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Concurrent producer connections, clamped to [`MAX_PRODUCERS`]. Default: 2.
    #[serde(default = "default_producers")]
    pub producers: usize,
    /// Bounded queue capacity between producers and consumers. Default: 100.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds without any bytes before the connection is considered stalled. Default: 60.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Default: 30.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_stream_url() -> String {
    "https://stream.twitter.com/1.1/statuses/sample.json".into()
}
fn default_languages() -> Vec<String> {
    vec!["en".into()]
}
fn default_producers() -> usize {
    MAX_PRODUCERS
}
fn default_queue_capacity() -> usize {
    100
}
fn default_idle_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            languages: default_languages(),
            producers: default_producers(),
            queue_capacity: default_queue_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl StreamConfig {
    /// Producer count after clamping to the upstream session cap.
    pub fn effective_producers(&self) -> usize {
        self.producers.clamp(1, MAX_PRODUCERS)
    }
}

/// Consumer pool settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsumerConfig {
    /// Requested worker count before clamping. Default: 4.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds between throughput log lines. Default: 60.
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: u64,
}

fn default_workers() -> usize {
    4
}
fn default_log_interval_secs() -> u64 {
    60
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            log_interval_secs: default_log_interval_secs(),
        }
    }
}

/// Where fetched media bytes end up.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaMethod {
    /// zlib-compressed inside the `Media.blob` column.
    Blob,
    /// Content-addressed file under `media.path`.
    File,
}

/// Media capture settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Default: false.
    #[serde(default)]
    pub enabled: bool,
    /// Default: blob.
    #[serde(default = "default_media_method")]
    pub method: MediaMethod,
    /// Root of the sharded media tree. Default: "./media".
    #[serde(default = "default_media_path")]
    pub path: PathBuf,
    /// Default: 30.
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
    /// Default: 16 MiB.
    #[serde(default = "default_media_max_size")]
    pub max_size_bytes: u64,
}

fn default_media_method() -> MediaMethod {
    MediaMethod::Blob
}
fn default_media_path() -> PathBuf {
    PathBuf::from("./media")
}
fn default_media_timeout_secs() -> u64 {
    30
}
fn default_media_max_size() -> u64 {
    16 * 1024 * 1024
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            method: default_media_method(),
            path: default_media_path(),
            timeout_secs: default_media_timeout_secs(),
            max_size_bytes: default_media_max_size(),
        }
    }
}

/// Supported relational backends.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// Embedded single-file engine. One writer at a time.
    Sqlite,
    /// Networked multi-writer engine.
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Default: sqlite.
    #[serde(default = "default_db_kind")]
    pub kind: DatabaseKind,
    /// File path for sqlite, `host[:port]` for postgres. Default: "tweetdb.sqlite".
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Postgres database name. Default: "tweetdb".
    #[serde(default = "default_db_name")]
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_db_kind() -> DatabaseKind {
    DatabaseKind::Sqlite
}
fn default_db_host() -> String {
    "tweetdb.sqlite".into()
}
fn default_db_name() -> String {
    "tweetdb".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: default_db_kind(),
            host: default_db_host(),
            name: default_db_name(),
            username: None,
            password: None,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL understood by sea-orm.
    pub fn url(&self) -> String {
        match self.kind {
            DatabaseKind::Sqlite => format!("sqlite://{}?mode=rwc", self.host),
            DatabaseKind::Postgres => {
                let user = urlencoding::encode(self.username.as_deref().unwrap_or_default());
                let name = urlencoding::encode(&self.name);
                match self.password.as_deref() {
                    Some(password) => format!(
                        "postgres://{user}:{}@{}/{name}",
                        urlencoding::encode(password),
                        self.host
                    ),
                    None => format!("postgres://{user}@{}/{name}", self.host),
                }
            }
        }
    }
}

/// OAuth1 user-context credentials for the upstream API.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    /// Optional TOML file whose keys are merged under `credentials`.
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
}

impl CredentialsConfig {
    /// Names of required keys that are empty.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Append logs to this file instead of stdout.
    pub file: Option<PathBuf>,
}
