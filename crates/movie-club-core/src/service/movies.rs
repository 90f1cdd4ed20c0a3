use chrono::NaiveDate;
use futures::future::try_join;
use movie_club_models::{ExternalMovie, ExternalMovieDetails, ImageRef, Movie, NewMovie, Slug};
use movie_club_sources::{MovieFilter, Notification};
use tracing::{info, instrument};
use super::MovieService;
use crate::cache::{CacheKey, CachePatch, CachedValue};
use crate::error::MovieError;
use crate::mutation::MutationKind;
use crate::retry::retry_read;

/// Release dates come as "YYYY-MM-DD" or an empty string
fn parse_release_date(value: Option<&str>) -> Option<NaiveDate> {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}

fn new_movie(
    external: &ExternalMovie,
    details: &ExternalMovieDetails,
    poster_asset: String,
    backdrop_asset: String,
) -> NewMovie {
    let title = external.title.trim().to_string();
    let overview = details
        .overview
        .clone()
        .filter(|o| !o.trim().is_empty())
        .or_else(|| external.overview.clone());

    NewMovie {
        slug: Slug::from_title(&title),
        title,
        release_date: parse_release_date(external.release_date.as_deref()),
        genres: details.genres.iter().map(|g| g.name.clone()).collect(),
        length: details.runtime.filter(|minutes| *minutes > 0),
        overview,
        poster: ImageRef::from_asset_id(poster_asset),
        poster_backdrop: ImageRef::from_asset_id(backdrop_asset),
        external_id: external.id,
        popularity: external.popularity,
        comments: Vec::new(),
        ratings: Vec::new(),
    }
}

impl MovieService {
    /// Add a movie from the external catalog to the club collection
    #[instrument(skip(self, external), fields(title = %external.title, external_id = external.id))]
    pub async fn add_movie(&self, external: &ExternalMovie) -> Result<Movie, MovieError> {
        let guard = self.mutations.start(MutationKind::AddMovie);
        let result = self.create_from_external(external).await;
        let movie = self.finish(guard, "Could not add movie", result)?;

        let poster = external
            .poster_path
            .as_deref()
            .and_then(|path| self.external_image_url(path));
        self.notify(
            Notification::success("Movie added", format!("{} was added to the collection", movie.title))
                .with_image(poster),
        );
        Ok(movie)
    }

    async fn create_from_external(&self, external: &ExternalMovie) -> Result<Movie, MovieError> {
        let metadata = self.metadata()?;
        let title = external.title.trim();
        if title.is_empty() {
            return Err(MovieError::Validation("movie title is empty".to_string()));
        }

        // Refuse before touching any asset or document
        let collection = self.get_movies(&MovieFilter::all()).await?;
        if let Some(existing) = collection.iter().find(|m| m.has_title(title)) {
            return Err(MovieError::DuplicateEntity(existing.title.clone()));
        }

        let (poster_path, backdrop_path) = match (external.poster_path.as_deref(), external.backdrop_path.as_deref()) {
            (Some(poster), Some(backdrop)) => (poster, backdrop),
            _ => {
                return Err(MovieError::Validation(format!(
                    "{} has no poster or backdrop image",
                    title
                )))
            }
        };

        let details = retry_read(&self.retry, "fetch movie details", || metadata.details(external.id)).await?;

        let poster_url = metadata.image_url(poster_path);
        let backdrop_url = metadata.image_url(backdrop_path);
        let (poster_asset, backdrop_asset) =
            try_join(self.upload_from_url(&poster_url), self.upload_from_url(&backdrop_url)).await?;

        let movie = self
            .store
            .create_movie(&new_movie(external, &details, poster_asset, backdrop_asset))
            .await?;
        self.cache.record_write();

        self.cache.apply(&CachePatch::PrependMovie(movie.clone()));
        self.cache.set(CacheKey::movie(&movie.id), CachedValue::Movie(movie.clone()));
        if let Some(slug) = movie.slug_str() {
            self.cache.set(CacheKey::movie(slug), CachedValue::Movie(movie.clone()));
        }
        self.cache.invalidate_movie_lists();

        info!("Added movie {} ({})", movie.title, movie.id);
        Ok(movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_club_models::ExternalGenre;

    fn external() -> ExternalMovie {
        ExternalMovie {
            id: 949,
            title: " Heat ".to_string(),
            release_date: Some("1995-12-15".to_string()),
            overview: Some("Search overview".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: Some("/backdrop.jpg".to_string()),
            popularity: Some(41.2),
        }
    }

    #[test]
    fn test_new_movie_from_external() {
        let details = ExternalMovieDetails {
            id: 949,
            genres: vec![
                ExternalGenre { id: 80, name: "Crime".to_string() },
                ExternalGenre { id: 18, name: "Drama".to_string() },
            ],
            runtime: Some(170),
            overview: Some(" ".to_string()),
        };
        let movie = new_movie(&external(), &details, "image-1-jpg".to_string(), "image-2-jpg".to_string());

        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.slug.current, "heat");
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(1995, 12, 15));
        assert_eq!(movie.genres, vec!["Crime", "Drama"]);
        assert_eq!(movie.length, Some(170));
        assert_eq!(movie.overview.as_deref(), Some("Search overview"));
        assert_eq!(movie.poster.asset_id(), "image-1-jpg");
        assert_eq!(movie.poster_backdrop.asset_id(), "image-2-jpg");
        assert!(movie.ratings.is_empty() && movie.comments.is_empty());
    }

    #[test]
    fn test_parse_release_date() {
        assert_eq!(parse_release_date(Some("")), None);
        assert_eq!(parse_release_date(Some("soon")), None);
        assert_eq!(parse_release_date(None), None);
        assert_eq!(parse_release_date(Some("1979-05-25")), NaiveDate::from_ymd_opt(1979, 5, 25));
    }
}
