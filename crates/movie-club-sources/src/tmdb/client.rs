use async_trait::async_trait;
use movie_club_config::TmdbConfig;
use movie_club_models::{ExternalMovieDetails, SearchPage};
use reqwest::Client;
use std::sync::Arc;
use crate::error::SourceError;
use crate::tmdb::api;
use crate::traits::MetadataSource;

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    image_base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig, api_key: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    fn source_name(&self) -> &str {
        "tmdb"
    }

    async fn search(&self, title: &str, page: u32) -> Result<SearchPage, SourceError> {
        api::search_movies(&self.client, &self.base_url, &self.api_key, &self.language, title, page).await
    }

    async fn details(&self, external_id: u64) -> Result<ExternalMovieDetails, SourceError> {
        api::movie_details(&self.client, &self.base_url, &self.api_key, &self.language, external_id).await
    }

    fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.image_base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url() {
        let client = TmdbClient::new(&TmdbConfig::default(), "key".to_string());
        assert_eq!(client.image_url("/abc.jpg"), "https://image.tmdb.org/t/p/original/abc.jpg");
        assert_eq!(client.image_url("https://cdn.example.com/x.png"), "https://cdn.example.com/x.png");
    }
}
