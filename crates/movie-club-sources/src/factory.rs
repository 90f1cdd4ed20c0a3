//! Builds the external collaborators from configuration and stored credentials.

use anyhow::Result;
use movie_club_config::{Config, CredentialStore};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::image::HttpImageFetcher;
use crate::sanity::SanityClient;
use crate::tmdb::TmdbClient;
use crate::traits::{ContentStore, ImageFetcher, MetadataSource};

pub struct Sources {
    pub store: Arc<dyn ContentStore>,
    pub metadata: Option<Arc<dyn MetadataSource>>,
    pub images: Arc<dyn ImageFetcher>,
}

/// Content store client. A missing write token is not an error here:
/// reads still work, writes fail with `NotConfigured`.
pub fn create_content_store(config: &Config, credentials: &CredentialStore) -> Arc<dyn ContentStore> {
    let token = credentials.content_store_token();
    if token.is_none() {
        warn!("No content store token configured; the collection is read-only");
    }
    Arc::new(SanityClient::new(&config.content_store, token))
}

/// Metadata source if enabled and an API key is available
pub fn create_metadata_source(
    config: &Config,
    credentials: &CredentialStore,
) -> Result<Option<Arc<dyn MetadataSource>>> {
    let tmdb = match &config.tmdb {
        Some(tmdb) if tmdb.enabled => tmdb,
        _ => {
            debug!("TMDB disabled in configuration");
            return Ok(None);
        }
    };

    let api_key = credentials
        .tmdb_api_key()
        .ok_or_else(|| anyhow::anyhow!("TMDB is enabled but no API key is configured"))?;
    Ok(Some(Arc::new(TmdbClient::new(tmdb, api_key))))
}

pub fn create_sources(config: &Config, credentials: &CredentialStore) -> Result<Sources> {
    Ok(Sources {
        store: create_content_store(config, credentials),
        metadata: create_metadata_source(config, credentials)?,
        images: Arc::new(HttpImageFetcher::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_metadata_source_requires_key_when_enabled() {
        let config = Config::new("abc123");
        let mut credentials = CredentialStore::new(PathBuf::from("/nonexistent/credentials.toml"));
        if credentials.tmdb_api_key().is_none() {
            assert!(create_metadata_source(&config, &credentials).is_err());
        }

        credentials.set_tmdb_api_key("key".to_string());
        let source = create_metadata_source(&config, &credentials).unwrap();
        assert_eq!(source.map(|s| s.source_name().to_string()), Some("tmdb".to_string()));
    }

    #[test]
    fn test_metadata_source_disabled() {
        let mut config = Config::new("abc123");
        config.tmdb = None;
        let credentials = CredentialStore::new(PathBuf::from("/nonexistent/credentials.toml"));
        assert!(create_metadata_source(&config, &credentials).unwrap().is_none());
    }
}
