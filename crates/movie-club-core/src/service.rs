//! Read side of the movie club: cached queries over the content store, plus
//! the shared plumbing (mutation bookkeeping, notifications) the write
//! handlers in the submodules build on.

mod comments;
mod movies;
mod people;
mod ratings;


use futures::future::join_all;
use movie_club_config::Config;
use movie_club_models::{Comment, Movie, Person, PersonRef, SearchPage};
use movie_club_sources::{
    ContentStore, ImageFetcher, MetadataSource, MovieFilter, Notification, Notifier, ReadConsistency,
    SourceError, Sources,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use crate::cache::{CacheKey, Cacheable, CachedValue, QueryCache, StaleTimes};
use crate::error::MovieError;
use crate::mutation::{MutationGuard, MutationKind, MutationState, MutationTracker};
use crate::retry::{retry_read, RetryPolicy};
use crate::sort::sort_by_release_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub stale: StaleTimes,
    pub fresh_read_window: Duration,
    pub retry: RetryPolicy,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            stale: StaleTimes::default(),
            fresh_read_window: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale: StaleTimes::from_config(&config.cache),
            fresh_read_window: config.cache.fresh_read_window(),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }
}

pub struct MovieService {
    store: Arc<dyn ContentStore>,
    metadata: Option<Arc<dyn MetadataSource>>,
    images: Arc<dyn ImageFetcher>,
    notifier: Arc<dyn Notifier>,
    cache: QueryCache,
    retry: RetryPolicy,
    mutations: MutationTracker,
    signed_in: Mutex<Option<String>>,
}

/// Random document key that none of `taken` already uses
pub(crate) fn new_key(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let key = Uuid::new_v4().simple().to_string();
        if !taken(&key) {
            return key;
        }
    }
}

impl MovieService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        images: Arc<dyn ImageFetcher>,
        notifier: Arc<dyn Notifier>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            metadata: None,
            images,
            notifier,
            cache: QueryCache::new(options.stale, options.fresh_read_window),
            retry: options.retry,
            mutations: MutationTracker::new(),
            signed_in: Mutex::new(None),
        }
    }

    pub fn from_sources(sources: Sources, notifier: Arc<dyn Notifier>, options: ServiceOptions) -> Self {
        Self::new(sources.store, sources.images, notifier, options).with_metadata(sources.metadata)
    }

    pub fn with_metadata(mut self, metadata: Option<Arc<dyn MetadataSource>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutation_state(&self, kind: MutationKind) -> MutationState {
        self.mutations.state(kind)
    }

    fn metadata(&self) -> Result<&Arc<dyn MetadataSource>, MovieError> {
        self.metadata
            .as_ref()
            .ok_or_else(|| SourceError::NotConfigured("movie metadata source".to_string()).into())
    }

    /// Full URL of an image path from search results, if a metadata source is configured
    pub fn external_image_url(&self, path: &str) -> Option<String> {
        self.metadata.as_ref().map(|m| m.image_url(path))
    }

    /// Serve `key` from cache or run `fetch` once, however many callers are waiting on it
    async fn load<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, MovieError>
    where
        T: Cacheable,
        F: FnOnce(ReadConsistency) -> Fut,
        Fut: Future<Output = Result<T, MovieError>>,
    {
        if let Some(value) = self.cache.get(&key).and_then(T::from_cached) {
            return Ok(value);
        }

        let lock = self.cache.fetch_lock(&key);
        let _in_flight = lock.lock().await;
        // Filled by whoever held the lock before us
        if let Some(value) = self.cache.get(&key).and_then(T::from_cached) {
            return Ok(value);
        }

        let generation = self.cache.write_generation();
        let value = fetch(self.cache.read_consistency()).await?;
        self.cache.set_fetched(key, value.clone().into_cached(), generation);
        Ok(value)
    }

    /// Resolve a mutation: record its state, and on failure log and notify
    fn finish<T>(&self, guard: MutationGuard<'_>, failure_title: &str, result: Result<T, MovieError>) -> Result<T, MovieError> {
        match result {
            Ok(value) => {
                guard.succeed();
                Ok(value)
            }
            Err(e) => {
                match &e {
                    MovieError::Upstream(_) => error!(mutation = %guard.kind(), "{}: {}", failure_title, e),
                    _ => warn!(mutation = %guard.kind(), "{}: {}", failure_title, e),
                }
                self.notifier.notify(Notification::error(failure_title, e.to_string()));
                guard.fail(&e);
                Err(e)
            }
        }
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Movies matching `filter`, newest release first
    #[instrument(skip(self))]
    pub async fn get_movies(&self, filter: &MovieFilter) -> Result<Vec<Movie>, MovieError> {
        self.load(CacheKey::movies(filter), |consistency| async move {
            let mut movies = retry_read(&self.retry, "fetch movies", || {
                self.store.fetch_movies(filter, consistency)
            })
            .await?;
            sort_by_release_date(&mut movies);
            info!(
                "Fetched {} movies ({})",
                movies.len(),
                filter.genre.as_deref().unwrap_or("all genres")
            );
            Ok(movies)
        })
        .await
    }

    /// One movie by id, falling back to slug
    #[instrument(skip(self))]
    pub async fn get_movie(&self, id_or_slug: &str) -> Result<Movie, MovieError> {
        self.load(CacheKey::movie(id_or_slug), |consistency| async move {
            let generation = self.cache.write_generation();
            let by_id = retry_read(&self.retry, "fetch movie", || {
                self.store.fetch_movie(id_or_slug, consistency)
            })
            .await?;
            let movie = match by_id {
                Some(movie) => movie,
                None => retry_read(&self.retry, "fetch movie by slug", || {
                    self.store.fetch_movie_by_slug(id_or_slug, consistency)
                })
                .await?
                .ok_or_else(|| MovieError::not_found("movie", id_or_slug))?,
            };
            let movie = self.resolve_people(movie).await;

            // Reachable under its other identifier without another fetch
            for alias in [Some(movie.id.as_str()), movie.slug_str()].into_iter().flatten() {
                if alias != id_or_slug {
                    self.cache.set_fetched(CacheKey::movie(alias), CachedValue::Movie(movie.clone()), generation);
                }
            }
            Ok(movie)
        })
        .await
    }

    /// Comments on a movie with every author expanded where the person still exists
    #[instrument(skip(self))]
    pub async fn get_comments(&self, movie_id: &str) -> Result<Vec<Comment>, MovieError> {
        self.load(CacheKey::comments(movie_id), |_| async move {
            let movie = match self.cache.find_movie(movie_id) {
                Some(movie) => {
                    debug!("Using cached movie {} for its comments", movie_id);
                    self.resolve_people(movie).await
                }
                None => self.get_movie(movie_id).await?,
            };
            Ok(movie.comments)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_person(&self, id: &str) -> Result<Person, MovieError> {
        self.load(CacheKey::person(id), |_| async move {
            retry_read(&self.retry, "fetch person", || self.store.fetch_person(id))
                .await?
                .ok_or_else(|| MovieError::not_found("person", id))
        })
        .await
    }

    /// Person record of whoever signed in last on this service
    pub fn current_person(&self) -> Option<Person> {
        let name = self.signed_in.lock().ok()?.clone()?;
        self.cache
            .peek(&CacheKey::current_person(name))
            .and_then(Person::from_cached)
    }

    /// Search the external catalog for movies to add
    #[instrument(skip(self))]
    pub async fn search_external(&self, title: &str, page: u32) -> Result<SearchPage, MovieError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MovieError::Validation("search title is empty".to_string()));
        }
        let metadata = self.metadata()?;
        let results = retry_read(&self.retry, "search metadata", || metadata.search(title, page)).await?;
        debug!("Search for '{}' returned {} of {} results", title, results.results.len(), results.total_results);
        Ok(results)
    }

    /// Expand every bare person reference on ratings and comments
    async fn resolve_people(&self, mut movie: Movie) -> Movie {
        let mut ids: Vec<String> = movie
            .ratings
            .iter()
            .map(|r| &r.person)
            .chain(movie.comments.iter().map(|c| &c.person))
            .filter(|p| !p.is_expanded())
            .map(|p| p.id().to_string())
            .collect();
        if ids.is_empty() {
            return movie;
        }
        ids.sort();
        ids.dedup();

        let people = self.lookup_people(&ids).await;
        for rating in movie.ratings.iter_mut() {
            expand(&mut rating.person, &people);
        }
        for comment in movie.comments.iter_mut() {
            expand(&mut comment.person, &people);
        }
        movie
    }

    /// Missing or unreachable people are left as references
    async fn lookup_people(&self, ids: &[String]) -> HashMap<String, Person> {
        let results = join_all(ids.iter().map(|id| self.get_person(id))).await;
        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(person) => Some((id.clone(), person)),
                Err(e) => {
                    warn!("Could not resolve person {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    /// Expanded form when the person is already cached, otherwise a reference
    fn person_ref(&self, person_id: &str) -> PersonRef {
        match self.cache.known_person(person_id) {
            Some(person) => PersonRef::Expanded(person),
            None => PersonRef::reference(person_id),
        }
    }

    /// Latest stored copy of a movie, bypassing the CDN, for deciding a write
    async fn read_for_write(&self, movie_id: &str) -> Result<Movie, MovieError> {
        retry_read(&self.retry, "fetch movie for update", || {
            self.store.fetch_movie(movie_id, ReadConsistency::Fresh)
        })
        .await?
        .ok_or_else(|| MovieError::not_found("movie", movie_id))
    }

    /// Download an image and store it as an asset; returns the asset id
    async fn upload_from_url(&self, url: &str) -> Result<String, MovieError> {
        let image = retry_read(&self.retry, "download image", || self.images.fetch(url)).await?;
        let size = image.bytes.len();
        let asset = self.store.upload_image(image).await?;
        debug!("Uploaded {} ({} bytes) as {}", url, size, asset);
        Ok(asset)
    }
}

fn expand(person: &mut PersonRef, people: &HashMap<String, Person>) {
    if person.is_expanded() {
        return;
    }
    if let Some(found) = people.get(person.id()) {
        *person = PersonRef::Expanded(found.clone());
    }
}
