use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContentStoreConfig {
    pub project_id: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Serve reads from the CDN-backed endpoint (writes always go to the API host)
    #[serde(default = "default_true")]
    pub use_cdn: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TmdbConfig {
    pub enabled: bool,
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_tmdb_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Stale windows per cache key kind, in seconds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_list_stale_seconds")]
    pub movie_list_stale_seconds: u64,
    #[serde(default = "default_list_stale_seconds")]
    pub movie_detail_stale_seconds: u64,
    #[serde(default = "default_comments_stale_seconds")]
    pub comments_stale_seconds: u64,
    #[serde(default = "default_person_stale_seconds")]
    pub person_stale_seconds: u64,
    /// After a local write, reads skip the CDN for this long so they see the write
    #[serde(default = "default_fresh_read_window_seconds")]
    pub fresh_read_window_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Identity provider session used by `sign-in`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityConfig {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: Option<bool>,
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_dataset() -> String {
    "production".to_string()
}

fn default_api_version() -> String {
    "2021-10-21".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_list_stale_seconds() -> u64 {
    300 // 5 minutes
}

fn default_comments_stale_seconds() -> u64 {
    60
}

fn default_person_stale_seconds() -> u64 {
    600
}

fn default_fresh_read_window_seconds() -> u64 {
    60
}

fn default_read_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            movie_list_stale_seconds: default_list_stale_seconds(),
            movie_detail_stale_seconds: default_list_stale_seconds(),
            comments_stale_seconds: default_comments_stale_seconds(),
            person_stale_seconds: default_person_stale_seconds(),
            fresh_read_window_seconds: default_fresh_read_window_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn movie_list_stale(&self) -> Duration {
        Duration::from_secs(self.movie_list_stale_seconds)
    }

    pub fn movie_detail_stale(&self) -> Duration {
        Duration::from_secs(self.movie_detail_stale_seconds)
    }

    pub fn comments_stale(&self) -> Duration {
        Duration::from_secs(self.comments_stale_seconds)
    }

    pub fn person_stale(&self) -> Duration {
        Duration::from_secs(self.person_stale_seconds)
    }

    pub fn fresh_read_window(&self) -> Duration {
        Duration::from_secs(self.fresh_read_window_seconds)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_attempts: default_read_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_tmdb_base_url(),
            image_base_url: default_tmdb_image_base_url(),
            language: default_language(),
        }
    }
}

impl Config {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            content_store: ContentStoreConfig {
                project_id: project_id.into(),
                dataset: default_dataset(),
                api_version: default_api_version(),
                use_cdn: default_true(),
            },
            tmdb: Some(TmdbConfig::default()),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            identity: None,
            logging: None,
        }
    }

    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let store = &self.content_store;
        if store.project_id.is_empty() || store.project_id == "YOUR_PROJECT_ID" {
            return Err(anyhow::anyhow!("content_store.project_id is not configured"));
        }
        if !store
            .project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(anyhow::anyhow!("Invalid content_store.project_id: {}", store.project_id));
        }
        if store.dataset.is_empty() {
            return Err(anyhow::anyhow!("content_store.dataset cannot be empty"));
        }
        if self.retry.read_attempts == 0 {
            return Err(anyhow::anyhow!("retry.read_attempts must be at least 1"));
        }
        if let Some(identity) = &self.identity {
            if identity.name.trim().is_empty() {
                return Err(anyhow::anyhow!("identity.name cannot be empty"));
            }
        }
        Ok(())
    }

    pub fn is_tmdb_enabled(&self) -> bool {
        self.tmdb.as_ref().map(|t| t.enabled).unwrap_or(false)
    }
}
