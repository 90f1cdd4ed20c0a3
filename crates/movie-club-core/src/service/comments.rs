use chrono::Utc;
use movie_club_models::{Comment, Movie, PersonRef};
use movie_club_sources::{Notification, Patch};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use super::MovieService;
use crate::cache::{CacheKey, CachePatch, Cacheable};
use crate::error::MovieError;
use crate::mutation::MutationKind;

const PREVIEW_CHARS: usize = 60;

fn comment_document(comment: &Comment) -> Value {
    json!({
        "_key": comment.key,
        "_type": "comment",
        "person": comment.person.to_reference(),
        "comment": comment.comment,
        "createdAt": comment.created_at.map(|t| t.to_rfc3339()),
    })
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}

impl MovieService {
    #[instrument(skip(self, text))]
    pub async fn add_comment(&self, movie_id: &str, person_id: &str, text: &str) -> Result<Comment, MovieError> {
        let guard = self.mutations.start(MutationKind::AddComment);
        let result = self.write_comment(movie_id, person_id, text).await;
        let comment = self.finish(guard, "Could not post comment", result)?;

        self.notify(Notification::success("Comment posted", preview(&comment.comment)));
        Ok(comment)
    }

    /// Remove a comment by key. Whether the caller may delete it is checked
    /// by the caller against [`Comment::is_authored_by`].
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, movie_id: &str, comment_key: &str) -> Result<(), MovieError> {
        let guard = self.mutations.start(MutationKind::DeleteComment);
        let result = self.remove_comment(movie_id, comment_key).await;
        let movie = self.finish(guard, "Could not delete comment", result)?;

        self.notify(Notification::success(
            "Comment deleted",
            format!("Your comment on {} was deleted", movie.title),
        ));
        Ok(())
    }

    /// Comment keys this session has seen for a movie
    fn known_comment_keys(&self, movie_id: &str) -> HashSet<String> {
        let cached_movie = self.cache.find_movie(movie_id).map(|m| m.comments).unwrap_or_default();
        let cached_list = self
            .cache
            .peek(&CacheKey::comments(movie_id))
            .and_then(Vec::<Comment>::from_cached)
            .unwrap_or_default();
        cached_movie.into_iter().chain(cached_list).map(|c| c.key).collect()
    }

    async fn write_comment(&self, movie_id: &str, person_id: &str, text: &str) -> Result<Comment, MovieError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MovieError::Validation("comment text is empty".to_string()));
        }

        let known = self.known_comment_keys(movie_id);
        let draft = Comment {
            key: super::new_key(|k| known.contains(k)),
            person: PersonRef::reference(person_id),
            comment: text.to_string(),
            created_at: Some(Utc::now()),
        };
        let patch = Patch::new(movie_id)
            .set_if_missing("comments", json!([]))
            .append("comments", vec![comment_document(&draft)]);

        let updated = self
            .store
            .patch_movie(&patch)
            .await
            .map_err(|e| MovieError::from_source("movie", movie_id, e))?;
        self.cache.record_write();

        // What the store kept, timestamp included
        let mut comment = updated.comment(&draft.key).cloned().unwrap_or(draft);
        if comment.created_at.is_none() {
            comment.created_at = updated.updated_at;
        }

        match self.cache.known_person(person_id) {
            Some(person) => {
                comment.person = PersonRef::Expanded(person);
                self.cache.apply(&CachePatch::AppendComment {
                    movie_id: updated.id.clone(),
                    comment: comment.clone(),
                });
            }
            None => {
                debug!("Author {} not cached; invalidating movie {}", person_id, updated.id);
                self.cache.invalidate_movie(&updated.id);
                self.cache.invalidate_movie_lists();
            }
        }

        info!("Added comment {} on {}", comment.key, updated.title);
        Ok(comment)
    }

    async fn remove_comment(&self, movie_id: &str, comment_key: &str) -> Result<Movie, MovieError> {
        let movie = self.read_for_write(movie_id).await?;
        if movie.comment(comment_key).is_none() {
            return Err(MovieError::not_found("comment", comment_key));
        }

        let patch = Patch::new(&movie.id).unset_keyed("comments", comment_key);
        let updated = self
            .store
            .patch_movie(&patch)
            .await
            .map_err(|e| MovieError::from_source("movie", movie_id, e))?;

        self.cache.record_write();
        self.cache.apply(&CachePatch::RemoveComment {
            movie_id: updated.id.clone(),
            comment_key: comment_key.to_string(),
        });
        info!("Deleted comment {} on {}", comment_key, updated.title);
        Ok(updated)
    }
}
