pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{CacheConfig, Config, ContentStoreConfig, IdentityConfig, LoggingConfig, RetryConfig, TmdbConfig};
pub use credentials::CredentialStore;
pub use paths::{PathManager, HOME_ENV};
