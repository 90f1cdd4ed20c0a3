use movie_club_models::{Movie, PersonRef, Rating, MAX_RATING, MIN_RATING};
use movie_club_sources::{Notification, Patch, SourceError};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use super::MovieService;
use crate::cache::CachePatch;
use crate::error::MovieError;
use crate::mutation::MutationKind;
use crate::sort::format_rating;

/// Reads and re-decisions after a lost revision race before giving up
const MAX_RATING_ATTEMPTS: u32 = 3;

fn rating_document(rating: &Rating) -> Value {
    json!({
        "_key": rating.key,
        "_type": "rating",
        "person": rating.person.to_reference(),
        "rating": rating.rating,
    })
}

/// Decide the write for `person_id` against the movie as last read.
///
/// An existing rating is overwritten in place by key; any extra entries the
/// same person left behind are removed in the same transaction. A first
/// rating is appended conditionally on the revision that was read, so a
/// concurrent first rating from the same person makes this write fail
/// instead of adding a second entry.
fn rating_patch(movie: &Movie, person_id: &str, value: f64) -> (Patch, Rating) {
    let mine: Vec<&Rating> = movie.ratings.iter().filter(|r| r.person_id() == person_id).collect();
    match mine.split_first() {
        Some((existing, duplicates)) => {
            let patch = duplicates.iter().fold(
                Patch::new(&movie.id).set_keyed("ratings", &existing.key, "rating", json!(value)),
                |patch, duplicate| patch.unset_keyed("ratings", &duplicate.key),
            );
            let rating = Rating {
                key: existing.key.clone(),
                person: PersonRef::reference(person_id),
                rating: value,
            };
            (patch, rating)
        }
        None => {
            let key = super::new_key(|k| movie.ratings.iter().any(|r| r.key == k));
            let rating = Rating { key, person: PersonRef::reference(person_id), rating: value };
            let mut patch = Patch::new(&movie.id)
                .set_if_missing("ratings", json!([]))
                .append("ratings", vec![rating_document(&rating)]);
            if let Some(revision) = &movie.revision {
                patch = patch.if_revision(revision);
            }
            (patch, rating)
        }
    }
}

impl MovieService {
    /// Set `person_id`'s rating on a movie, replacing any earlier one
    #[instrument(skip(self))]
    pub async fn rate_movie(&self, movie_id: &str, person_id: &str, value: f64) -> Result<Rating, MovieError> {
        let guard = self.mutations.start(MutationKind::RateMovie);
        let result = self.write_rating(movie_id, person_id, value).await;
        let (movie, rating) = self.finish(guard, "Could not save rating", result)?;

        self.notify(Notification::success(
            "Rating saved",
            format!("You rated {} {}/{}", movie.title, format_rating(rating.rating), MAX_RATING),
        ));
        Ok(rating)
    }

    /// Remove `person_id`'s rating from a movie
    #[instrument(skip(self))]
    pub async fn delete_rating(&self, movie_id: &str, person_id: &str) -> Result<(), MovieError> {
        let guard = self.mutations.start(MutationKind::DeleteRating);
        let result = self.remove_rating(movie_id, person_id).await;
        let movie = self.finish(guard, "Could not remove rating", result)?;

        self.notify(Notification::success(
            "Rating removed",
            format!("Your rating for {} was removed", movie.title),
        ));
        Ok(())
    }

    async fn write_rating(&self, movie_id: &str, person_id: &str, value: f64) -> Result<(Movie, Rating), MovieError> {
        let value = Rating::normalize_value(value)
            .filter(|_| Rating::is_valid_value(value))
            .ok_or_else(|| {
                MovieError::Validation(format!(
                    "rating must be between {} and {}, got {}",
                    MIN_RATING, MAX_RATING, value
                ))
            })?;

        let mut attempt = 1;
        loop {
            let movie = self.read_for_write(movie_id).await?;
            let (patch, rating) = rating_patch(&movie, person_id, value);

            match self.store.patch_movie(&patch).await {
                Ok(updated) => {
                    self.cache.record_write();
                    let rating = Rating { person: self.person_ref(person_id), ..rating };
                    self.cache.apply(&CachePatch::UpsertRating {
                        movie_id: updated.id.clone(),
                        rating: rating.clone(),
                    });
                    info!("Saved rating {} on {} for {}", rating.rating, updated.title, person_id);
                    return Ok((updated, rating));
                }
                Err(SourceError::RevisionMismatch { .. }) if attempt < MAX_RATING_ATTEMPTS => {
                    debug!("Movie {} changed while rating (attempt {}), deciding again", movie_id, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(MovieError::from_source("movie", movie_id, e)),
            }
        }
    }

    async fn remove_rating(&self, movie_id: &str, person_id: &str) -> Result<Movie, MovieError> {
        let movie = self.read_for_write(movie_id).await?;
        let keys: Vec<&str> = movie
            .ratings
            .iter()
            .filter(|r| r.person_id() == person_id)
            .map(|r| r.key.as_str())
            .collect();
        if keys.is_empty() {
            return Err(MovieError::not_found("rating", format!("{} on {}", person_id, movie.title)));
        }

        let patch = keys
            .iter()
            .fold(Patch::new(&movie.id), |patch, key| patch.unset_keyed("ratings", *key));
        let updated = self
            .store
            .patch_movie(&patch)
            .await
            .map_err(|e| MovieError::from_source("movie", movie_id, e))?;

        self.cache.record_write();
        self.cache.apply(&CachePatch::RemoveRating {
            movie_id: updated.id.clone(),
            person_id: person_id.to_string(),
        });
        info!("Removed rating on {} for {}", updated.title, person_id);
        Ok(updated)
    }
}
