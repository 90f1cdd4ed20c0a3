use async_trait::async_trait;
use movie_club_config::ContentStoreConfig;
use movie_club_models::{Movie, NewMovie, NewPerson, Person};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use crate::error::SourceError;
use crate::patch::Patch;
use crate::sanity::{api, queries};
use crate::traits::{ContentStore, ImageUpload, MovieFilter, ReadConsistency};

/// HTTP client for the hosted document store.
///
/// Cached reads go to the CDN host, everything else to the API host.
#[derive(Clone)]
pub struct SanityClient {
    client: Arc<Client>,
    cdn_base: String,
    api_base: String,
    dataset: String,
    use_cdn: bool,
    token: Option<String>,
}

pub fn create_sanity_client() -> Client {
    Client::builder()
        .user_agent(concat!("movieclub/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

impl SanityClient {
    pub fn new(config: &ContentStoreConfig, token: Option<String>) -> Self {
        Self {
            client: Arc::new(create_sanity_client()),
            cdn_base: format!(
                "https://{}.apicdn.sanity.io/v{}",
                config.project_id, config.api_version
            ),
            api_base: format!(
                "https://{}.api.sanity.io/v{}",
                config.project_id, config.api_version
            ),
            dataset: config.dataset.clone(),
            use_cdn: config.use_cdn,
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, SourceError> {
        self.token
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("content store write token".to_string()))
    }

    fn read_base(&self, consistency: ReadConsistency) -> &str {
        match consistency {
            ReadConsistency::Cached if self.use_cdn => &self.cdn_base,
            _ => &self.api_base,
        }
    }

    // The CDN serves public data only; authenticated reads go to the API host
    fn read_token(&self, consistency: ReadConsistency) -> Option<&str> {
        match consistency {
            ReadConsistency::Cached if self.use_cdn => None,
            _ => self.token.as_deref(),
        }
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, Value)],
        consistency: ReadConsistency,
    ) -> Result<T, SourceError> {
        api::query(
            &self.client,
            self.read_base(consistency),
            &self.dataset,
            self.read_token(consistency),
            groq,
            params,
        )
        .await
    }

    /// Submit mutations and return the first returned document
    async fn mutate_one(
        &self,
        mutations: Vec<Value>,
        document_id: Option<&str>,
        revision: Option<&str>,
    ) -> Result<Value, SourceError> {
        let response = api::mutate(
            &self.client,
            &self.api_base,
            &self.dataset,
            self.token()?,
            mutations,
            document_id,
            revision,
        )
        .await?;

        response
            .results
            .into_iter()
            .rev()
            .find_map(|r| r.document)
            .ok_or_else(|| SourceError::new("Mutation returned no document".to_string()))
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    fn store_name(&self) -> &str {
        "sanity"
    }

    async fn fetch_movies(&self, filter: &MovieFilter, consistency: ReadConsistency) -> Result<Vec<Movie>, SourceError> {
        let movies: Option<Vec<Movie>> = match &filter.genre {
            Some(genre) => {
                self.query(&queries::movies(true), &[("genre", json!(genre))], consistency)
                    .await?
            }
            None => self.query(&queries::movies(false), &[], consistency).await?,
        };
        let movies = movies.unwrap_or_default();
        debug!("Fetched {} movies ({:?})", movies.len(), consistency);
        Ok(movies)
    }

    async fn fetch_movie(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError> {
        self.query(&queries::movie_by_id(), &[("id", json!(id))], consistency)
            .await
    }

    async fn fetch_movie_by_slug(&self, slug: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError> {
        self.query(&queries::movie_by_slug(), &[("slug", json!(slug))], consistency)
            .await
    }

    async fn fetch_person(&self, id: &str) -> Result<Option<Person>, SourceError> {
        self.query(queries::PERSON_BY_ID, &[("id", json!(id))], ReadConsistency::Cached)
            .await
    }

    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, SourceError> {
        // Sign-in must not create a duplicate person because the CDN lagged
        self.query(queries::PERSON_BY_NAME, &[("name", json!(name))], ReadConsistency::Fresh)
            .await
    }

    async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, SourceError> {
        let mut document = serde_json::to_value(movie)?;
        document["_type"] = json!("movie");

        let created = self.mutate_one(vec![json!({ "create": document })], None, None).await?;
        let movie: Movie = serde_json::from_value(created)?;
        info!("Created movie {} ({})", movie.title, movie.id);
        Ok(movie)
    }

    async fn create_person(&self, person: &NewPerson) -> Result<Person, SourceError> {
        let mut document = serde_json::to_value(person)?;
        document["_type"] = json!("person");

        let created = self.mutate_one(vec![json!({ "create": document })], None, None).await?;
        let person: Person = serde_json::from_value(created)?;
        info!("Created person {} ({})", person.name, person.id);
        Ok(person)
    }

    async fn patch_movie(&self, patch: &Patch) -> Result<Movie, SourceError> {
        let patched = self
            .mutate_one(
                patch.to_mutations(),
                Some(&patch.id),
                patch.if_revision.as_deref(),
            )
            .await?;
        Ok(serde_json::from_value(patched)?)
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String, SourceError> {
        api::upload_image(&self.client, &self.api_base, &self.dataset, self.token()?, image).await
    }
}
