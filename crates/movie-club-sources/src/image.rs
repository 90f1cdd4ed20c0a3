use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;
use crate::error::SourceError;
use crate::traits::{ImageFetcher, ImageUpload};

const SERVICE: &str = "image";

#[derive(Clone, Default)]
pub struct HttpImageFetcher {
    client: Arc<Client>,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self { client: Arc::new(Client::new()) }
    }
}

/// Last path segment of a URL, without query string
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && name.contains('.'))
        .map(|name| name.to_string())
}

/// Guess from the extension when the server does not say
pub fn content_type_from_filename(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<ImageUpload, SourceError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http { service: SERVICE, status, body });
        }

        let filename = filename_from_url(url);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map(|v| v.to_string())
            .unwrap_or_else(|| {
                content_type_from_filename(filename.as_deref().unwrap_or_default()).to_string()
            });

        let bytes = response.bytes().await?.to_vec();
        debug!("Downloaded {} ({} bytes, {})", url, bytes.len(), content_type);

        Ok(ImageUpload { bytes, content_type, filename })
    }
}
