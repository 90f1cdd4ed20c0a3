use async_trait::async_trait;
use movie_club_models::{ExternalMovieDetails, Movie, NewMovie, NewPerson, Person, SearchPage};
use crate::error::SourceError;
use crate::patch::Patch;

/// Which read endpoint to use.
///
/// `Cached` goes through the CDN and may lag behind recent writes by a short
/// propagation delay; `Fresh` hits the API host directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    Cached,
    Fresh,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MovieFilter {
    pub genre: Option<String>,
}

impl MovieFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn genre(genre: impl Into<String>) -> Self {
        Self { genre: Some(genre.into()) }
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        match &self.genre {
            Some(genre) => movie.has_genre(genre),
            None => true,
        }
    }
}

/// Binary image payload on its way to the asset endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    fn store_name(&self) -> &str;

    // Reads. Movies come back with person references expanded where the store can do it.
    async fn fetch_movies(&self, filter: &MovieFilter, consistency: ReadConsistency) -> Result<Vec<Movie>, SourceError>;
    async fn fetch_movie(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError>;
    async fn fetch_movie_by_slug(&self, slug: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError>;
    async fn fetch_person(&self, id: &str) -> Result<Option<Person>, SourceError>;
    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, SourceError>;

    // Writes. Always immediately consistent and token-authenticated.
    async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, SourceError>;
    async fn create_person(&self, person: &NewPerson) -> Result<Person, SourceError>;
    /// Apply a patch to a movie document and return the patched document (references unexpanded)
    async fn patch_movie(&self, patch: &Patch) -> Result<Movie, SourceError>;
    /// Upload an image asset and return the asset document id
    async fn upload_image(&self, image: ImageUpload) -> Result<String, SourceError>;
}

/// External movie catalog used to find titles to add
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn search(&self, title: &str, page: u32) -> Result<SearchPage, SourceError>;
    async fn details(&self, external_id: u64) -> Result<ExternalMovieDetails, SourceError>;

    /// Full URL for an image path returned by search results
    fn image_url(&self, path: &str) -> String;
}

/// Downloads images from arbitrary URLs (posters, avatars)
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ImageUpload, SourceError>;
}
